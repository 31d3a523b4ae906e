use super::*;
use crate::storage::{MemoryStorage, StorageBackend};
use std::sync::Arc;

#[test]
fn default_theme_is_light() {
    assert_eq!(Theme::default(), Theme::Light);
}

#[test]
fn resolve_uses_system_preference_when_nothing_saved() {
    let themes = ThemeStore::new(KvStore::in_memory());
    assert_eq!(themes.resolve(false), Theme::Light);
    assert_eq!(themes.resolve(true), Theme::Dark);
}

#[test]
fn saved_preference_beats_system() {
    let themes = ThemeStore::new(KvStore::in_memory());
    themes.set(Theme::Light);
    assert_eq!(themes.resolve(true), Theme::Light);
}

#[test]
fn toggle_persists_new_theme() {
    let themes = ThemeStore::new(KvStore::in_memory());
    let next = themes.toggle(Theme::Light);
    assert_eq!(next, Theme::Dark);
    assert_eq!(themes.saved(), Some(Theme::Dark));
}

#[test]
fn theme_is_stored_as_plain_string() {
    let backend = Arc::new(MemoryStorage::new());
    let themes = ThemeStore::new(KvStore::new(backend.clone()));
    themes.set(Theme::Dark);
    assert_eq!(backend.get_item(THEME_KEY).unwrap().as_deref(), Some("\"dark\""));
}

#[test]
fn unknown_saved_value_is_ignored() {
    let backend = Arc::new(MemoryStorage::new());
    backend.insert_raw(THEME_KEY, "\"sepia\"");
    let themes = ThemeStore::new(KvStore::new(backend));
    assert_eq!(themes.saved(), None);
    assert_eq!(themes.resolve(true), Theme::Dark);
}

#[test]
fn parse_theme_names() {
    assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
    assert!("sepia".parse::<Theme>().is_err());
}
