use super::*;
use PageSlot::{Gap, Page};

fn info(current_page: u32, total_pages: u32) -> PaginationInfo {
    PaginationInfo { current_page, total_pages, has_next: current_page < total_pages, has_prev: current_page > 1 }
}

#[test]
fn few_pages_are_all_shown() {
    assert_eq!(info(1, 3).visible_pages(), vec![Page(1), Page(2), Page(3)]);
    assert_eq!(info(4, 7).visible_pages().len(), 7);
}

#[test]
fn start_of_long_range() {
    assert_eq!(info(1, 42).visible_pages(), vec![Page(1), Page(2), Page(3), Gap, Page(42)]);
}

#[test]
fn middle_of_long_range() {
    assert_eq!(
        info(20, 42).visible_pages(),
        vec![Page(1), Gap, Page(18), Page(19), Page(20), Page(21), Page(22), Gap, Page(42)]
    );
}

#[test]
fn end_of_long_range() {
    assert_eq!(info(42, 42).visible_pages(), vec![Page(1), Gap, Page(40), Page(41), Page(42)]);
}

#[test]
fn no_gap_when_window_touches_edges() {
    assert_eq!(info(4, 10).visible_pages(), vec![Page(1), Page(2), Page(3), Page(4), Page(5), Page(6), Gap, Page(10)]);
}

#[test]
fn single_page_hides_bar() {
    assert!(!info(1, 1).is_visible());
    assert!(info(1, 2).is_visible());
}

#[test]
fn navigation_respects_edges() {
    let first = info(1, 5);
    assert!(first.prev().is_none());
    assert!(first.first().is_none());
    assert_eq!(first.next(), Some(UrlPatch::goto_page(2)));
    assert_eq!(first.last(), Some(UrlPatch::goto_page(5)));

    let last = info(5, 5);
    assert!(last.next().is_none());
    assert_eq!(last.prev(), Some(UrlPatch::goto_page(4)));
    assert_eq!(last.first(), Some(UrlPatch::goto_page(1)));
}

#[test]
fn built_from_character_page() {
    let page = CharacterPage { items: Vec::new(), total_count: 0, total_pages: 0, has_next: false, has_prev: false };
    let info = PaginationInfo::new(0, &page);
    assert_eq!(info.current_page, 1);
    assert_eq!(info.total_pages, 1);
    assert!(!info.is_visible());
}

#[test]
fn huge_page_number_does_not_overflow() {
    let info = PaginationInfo { current_page: u32::MAX, total_pages: 42, has_next: true, has_prev: true };
    assert_eq!(info.visible_pages(), vec![Page(1), Gap, Page(40), Page(41), Page(42)]);
    assert_eq!(info.next(), Some(UrlPatch::goto_page(u32::MAX)));
}

#[test]
fn max_page_from_url_renders_window() {
    let page = CharacterPage { items: Vec::new(), total_count: 826, total_pages: 42, has_next: false, has_prev: true };
    let current = crate::state::url::UrlState::from_query("page=4294967295").page;
    let info = PaginationInfo::new(current, &page);
    assert_eq!(info.visible_pages().last(), Some(&Page(42)));
    assert_eq!(info.prev(), Some(UrlPatch::goto_page(u32::MAX - 1)));
}
