//! URL-driven filter, sort, and pagination state.
//!
//! DESIGN
//! ======
//! The query string is the single source of truth. `UrlState::from_query`
//! and `UrlState::to_query` are pure and independent of any router.
//! `UrlRouter` owns the current location, applies `UrlPatch`es to the raw
//! parameter list (so parameter order and unknown parameters survive),
//! and keeps a back/forward history.
//!
//! Two rules shape every update:
//! - a patch that touches any field other than `page` without setting
//!   `page` resets `page` to 1;
//! - a field equal to its default is removed from the query string.

use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

pub const PARAM_PAGE: &str = "page";
pub const PARAM_NAME: &str = "name";
pub const PARAM_STATUS: &str = "status";
pub const PARAM_SPECIES: &str = "species";
pub const PARAM_GENDER: &str = "gender";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_ORDER: &str = "order";
pub const PARAM_FAVORITES: &str = "favorites";

const KNOWN_PARAMS: [&str; 8] = [
    PARAM_PAGE,
    PARAM_NAME,
    PARAM_STATUS,
    PARAM_SPECIES,
    PARAM_GENDER,
    PARAM_SORT,
    PARAM_ORDER,
    PARAM_FAVORITES,
];

pub const DEFAULT_PAGE: u32 = 1;
pub const ROOT_PATH: &str = "/";

// =============================================================================
// ENUMERATED PARAMETERS
// =============================================================================

/// Raised when a CLI or caller supplies a value outside an enumerated set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {param} value '{value}'")]
pub struct InvalidParam {
    pub param: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Any,
    Alive,
    Dead,
    Unknown,
}

impl StatusFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Alive => "alive",
            Self::Dead => "dead",
            Self::Unknown => "unknown",
        }
    }

    fn from_param(raw: &str) -> Option<Self> {
        [Self::Any, Self::Alive, Self::Dead, Self::Unknown]
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenderFilter {
    #[default]
    Any,
    Female,
    Male,
    Genderless,
    Unknown,
}

impl GenderFilter {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Female => "female",
            Self::Male => "male",
            Self::Genderless => "genderless",
            Self::Unknown => "unknown",
        }
    }

    fn from_param(raw: &str) -> Option<Self> {
        [Self::Any, Self::Female, Self::Male, Self::Genderless, Self::Unknown]
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Created,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Created => "created",
        }
    }

    fn from_param(raw: &str) -> Option<Self> {
        [Self::Id, Self::Name, Self::Created]
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    fn from_param(raw: &str) -> Option<Self> {
        [Self::Asc, Self::Desc]
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(raw))
    }
}

macro_rules! param_enum_traits {
    ($ty:ident, $param:expr) => {
        impl FromStr for $ty {
            type Err = InvalidParam;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_param(s).ok_or_else(|| InvalidParam { param: $param, value: s.to_owned() })
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

param_enum_traits!(StatusFilter, PARAM_STATUS);
param_enum_traits!(GenderFilter, PARAM_GENDER);
param_enum_traits!(SortKey, PARAM_SORT);
param_enum_traits!(SortOrder, PARAM_ORDER);

// =============================================================================
// URL STATE
// =============================================================================

/// Filter, sort, and page state derived from the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlState {
    pub page: u32,
    pub name: String,
    pub status: StatusFilter,
    pub species: String,
    pub gender: GenderFilter,
    pub sort: SortKey,
    pub order: SortOrder,
    pub favorites: bool,
}

impl Default for UrlState {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            name: String::new(),
            status: StatusFilter::Any,
            species: String::new(),
            gender: GenderFilter::Any,
            sort: SortKey::Id,
            order: SortOrder::Asc,
            favorites: false,
        }
    }
}

impl UrlState {
    /// Parse a query string (with or without the leading `?`). Missing or
    /// unrecognised values fall back to their defaults; `page` falls back to
    /// 1 unless it is a positive integer.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let params = QueryParams::parse(query);
        let text = |key: &str| params.get(key).unwrap_or_default().to_owned();

        Self {
            page: params.get(PARAM_PAGE).map_or(DEFAULT_PAGE, parse_page),
            name: text(PARAM_NAME),
            status: params.get(PARAM_STATUS).and_then(StatusFilter::from_param).unwrap_or_default(),
            species: text(PARAM_SPECIES),
            gender: params.get(PARAM_GENDER).and_then(GenderFilter::from_param).unwrap_or_default(),
            sort: params.get(PARAM_SORT).and_then(SortKey::from_param).unwrap_or_default(),
            order: params.get(PARAM_ORDER).and_then(SortOrder::from_param).unwrap_or_default(),
            favorites: params.get(PARAM_FAVORITES) == Some("true"),
        }
    }

    /// Canonical query string (no leading `?`): defaults omitted, fields in
    /// a fixed order.
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut params = QueryParams::default();
        for (key, value) in self.entries() {
            if !is_default_value(key, &value) {
                params.set(key, &value);
            }
        }
        params.to_string()
    }

    /// The state that results from applying `patch`, including the page
    /// reset rule.
    #[must_use]
    pub fn with_patch(&self, patch: &UrlPatch) -> Self {
        let patch = patch.normalized();
        Self {
            page: patch.page.unwrap_or(self.page),
            name: patch.name.unwrap_or_else(|| self.name.clone()),
            status: patch.status.unwrap_or(self.status),
            species: patch.species.unwrap_or_else(|| self.species.clone()),
            gender: patch.gender.unwrap_or(self.gender),
            sort: patch.sort.unwrap_or(self.sort),
            order: patch.order.unwrap_or(self.order),
            favorites: patch.favorites.unwrap_or(self.favorites),
        }
    }

    /// True when any text or select filter is set. Sort, order, page and
    /// the favorites toggle do not count.
    #[must_use]
    pub fn has_active_filters(&self) -> bool {
        !self.name.is_empty()
            || self.status != StatusFilter::Any
            || !self.species.is_empty()
            || self.gender != GenderFilter::Any
    }

    fn entries(&self) -> [(&'static str, String); 8] {
        [
            (PARAM_PAGE, self.page.to_string()),
            (PARAM_NAME, self.name.clone()),
            (PARAM_STATUS, self.status.as_str().to_owned()),
            (PARAM_SPECIES, self.species.clone()),
            (PARAM_GENDER, self.gender.as_str().to_owned()),
            (PARAM_SORT, self.sort.as_str().to_owned()),
            (PARAM_ORDER, self.order.as_str().to_owned()),
            (PARAM_FAVORITES, self.favorites.to_string()),
        ]
    }
}

fn parse_page(raw: &str) -> u32 {
    raw.trim().parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE)
}

/// Whether a serialized value is the default for its parameter and so must
/// not appear in the URL.
/// Enumerated values compare by their parsed form, so `sort=ID` counts as
/// the default just as `sort=id` does. Empty text is always a default.
fn is_default_value(key: &str, value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    match key {
        PARAM_PAGE => value.trim().parse::<u32>().is_ok_and(|p| p == DEFAULT_PAGE),
        PARAM_STATUS => StatusFilter::from_param(value) == Some(StatusFilter::Any),
        PARAM_GENDER => GenderFilter::from_param(value) == Some(GenderFilter::Any),
        PARAM_SORT => SortKey::from_param(value) == Some(SortKey::default()),
        PARAM_ORDER => SortOrder::from_param(value) == Some(SortOrder::default()),
        PARAM_FAVORITES => value.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

// =============================================================================
// PATCH
// =============================================================================

/// A partial update. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlPatch {
    pub page: Option<u32>,
    pub name: Option<String>,
    pub status: Option<StatusFilter>,
    pub species: Option<String>,
    pub gender: Option<GenderFilter>,
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub favorites: Option<bool>,
}

impl UrlPatch {
    #[must_use]
    pub fn goto_page(page: u32) -> Self {
        Self { page: Some(page), ..Self::default() }
    }

    /// Flip the favorites-only filter, back to page 1.
    #[must_use]
    pub fn toggle_favorites(current: &UrlState) -> Self {
        Self { page: Some(DEFAULT_PAGE), favorites: Some(!current.favorites), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when the patch sets anything other than `page`.
    #[must_use]
    pub fn touches_filters(&self) -> bool {
        self.name.is_some()
            || self.status.is_some()
            || self.species.is_some()
            || self.gender.is_some()
            || self.sort.is_some()
            || self.order.is_some()
            || self.favorites.is_some()
    }

    /// Apply the page reset rule and clamp `page` to at least 1.
    fn normalized(&self) -> Self {
        let mut patch = self.clone();
        if patch.touches_filters() && patch.page.is_none() {
            patch.page = Some(DEFAULT_PAGE);
        }
        patch.page = patch.page.map(|p| p.max(DEFAULT_PAGE));
        patch
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(page) = self.page {
            out.push((PARAM_PAGE, page.to_string()));
        }
        if let Some(name) = &self.name {
            out.push((PARAM_NAME, name.clone()));
        }
        if let Some(status) = self.status {
            out.push((PARAM_STATUS, status.as_str().to_owned()));
        }
        if let Some(species) = &self.species {
            out.push((PARAM_SPECIES, species.clone()));
        }
        if let Some(gender) = self.gender {
            out.push((PARAM_GENDER, gender.as_str().to_owned()));
        }
        if let Some(sort) = self.sort {
            out.push((PARAM_SORT, sort.as_str().to_owned()));
        }
        if let Some(order) = self.order {
            out.push((PARAM_ORDER, order.as_str().to_owned()));
        }
        if let Some(favorites) = self.favorites {
            out.push((PARAM_FAVORITES, favorites.to_string()));
        }
        out
    }
}

// =============================================================================
// QUERY PARAMS
// =============================================================================

/// Ordered query parameter list with `URLSearchParams`-style semantics:
/// `get` returns the first value, `set` replaces in place (dropping
/// duplicates) or appends, `delete` removes every occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let mut seen = false;
        self.pairs.retain_mut(|(k, v)| {
            if k.as_str() != key {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            value.clone_into(v);
            true
        });
        if !seen {
            self.pairs.push((key.to_owned(), value.to_owned()));
        }
    }

    pub fn delete(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Merge a patch: empty values delete, others set; then strip defaults.
    fn apply(&mut self, patch: &UrlPatch) {
        for (key, value) in patch.normalized().entries() {
            if value.is_empty() {
                self.delete(key);
            } else {
                self.set(key, &value);
            }
        }
        for key in KNOWN_PARAMS {
            if self.get(key).is_some_and(|v| is_default_value(key, v)) {
                self.delete(key);
            }
        }
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        f.write_str(&serializer.finish())
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Result of a URL mutation. Filter navigation never scrolls to the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub url: String,
    pub scroll_to_top: bool,
}

/// Owns the current location and its history.
#[derive(Debug, Clone)]
pub struct UrlRouter {
    path: String,
    params: QueryParams,
    history: Vec<String>,
    cursor: usize,
}

impl Default for UrlRouter {
    fn default() -> Self {
        Self::new(ROOT_PATH)
    }
}

impl UrlRouter {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self::from_url(path)
    }

    /// Start at `url` (`/path?query`, `?query`, or a bare query).
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let (path, query) = split_url(url);
        let mut router = Self { path, params: QueryParams::parse(query), history: Vec::new(), cursor: 0 };
        router.history.push(router.url());
        router
    }

    #[must_use]
    pub fn state(&self) -> UrlState {
        UrlState::from_query(&self.query())
    }

    #[must_use]
    pub fn query(&self) -> String {
        self.params.to_string()
    }

    #[must_use]
    pub fn url(&self) -> String {
        if self.params.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.params)
        }
    }

    /// Merge `patch` into the current location and navigate there.
    pub fn update(&mut self, patch: &UrlPatch) -> Navigation {
        let mut params = self.params.clone();
        params.apply(patch);
        self.navigate(params)
    }

    /// Drop every query parameter.
    pub fn reset(&mut self) -> Navigation {
        self.navigate(QueryParams::default())
    }

    pub fn back(&mut self) -> Option<Navigation> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.restore())
    }

    pub fn forward(&mut self) -> Option<Navigation> {
        if self.cursor + 1 >= self.history.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.restore())
    }

    fn navigate(&mut self, params: QueryParams) -> Navigation {
        self.params = params;
        let url = self.url();
        if self.history.get(self.cursor) != Some(&url) {
            self.history.truncate(self.cursor + 1);
            self.history.push(url.clone());
            self.cursor = self.history.len() - 1;
        }
        Navigation { url, scroll_to_top: false }
    }

    fn restore(&mut self) -> Navigation {
        let url = self.history[self.cursor].clone();
        let (path, query) = split_url(&url);
        self.path = path;
        self.params = QueryParams::parse(query);
        Navigation { url, scroll_to_top: false }
    }
}

fn split_url(url: &str) -> (String, &str) {
    let (path, query) = match url.split_once('?') {
        Some(parts) => parts,
        None if url.starts_with('/') => (url, ""),
        None => ("", url),
    };
    let path = if path.is_empty() { ROOT_PATH.to_owned() } else { path.to_owned() };
    (path, query)
}

#[cfg(test)]
#[path = "url_test.rs"]
mod tests;
