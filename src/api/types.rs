//! Character API types, errors, and the fetcher trait.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorCode, ErrorKind};
use crate::state::url::{GenderFilter, SortKey, SortOrder, StatusFilter, UrlState};

/// Positive integer id of a character.
pub type CharacterId = u32;

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Transport failure or a non-2xx status outside 404/5xx.
    #[error("network error: {message}")]
    Network { message: String, status: Option<u16> },

    /// The requested resource does not exist (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Upstream 5xx, or a body that could not be parsed.
    #[error("server error (status {status}): {message}")]
    Server { status: u16, message: String },

    /// The request was superseded or abandoned.
    #[error("request was cancelled")]
    Cancelled,

    /// The HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Network { .. } => "E_NETWORK",
            Self::NotFound => "E_NOT_FOUND",
            Self::Server { .. } => "E_SERVER",
            Self::Cancelled => "E_CANCELLED",
            Self::ClientBuild(_) => "E_CLIENT_BUILD",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Cancelled | Self::ClientBuild(_) => ErrorKind::Network,
            Self::NotFound => ErrorKind::NotFound,
            Self::Server { .. } => ErrorKind::Server,
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Server { .. })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    /// `Alive`, `Dead`, or `unknown` as sent upstream.
    pub status: String,
    pub species: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub gender: String,
    pub origin: LocationRef,
    pub location: LocationRef,
    pub image: String,
    /// Episode resource URLs, e.g. `.../episode/28`.
    pub episode: Vec<String>,
    pub url: String,
    /// RFC 3339 creation time.
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: u32,
    pub name: String,
    pub air_date: String,
    /// Season/episode code such as `S01E01`.
    pub episode: String,
    pub characters: Vec<String>,
    pub url: String,
    pub created: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiInfo {
    pub count: u32,
    pub pages: u32,
    pub next: Option<String>,
    pub prev: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiPage<T> {
    pub info: ApiInfo,
    pub results: Vec<T>,
}

/// Batch endpoints return a bare object when asked for a single id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

// =============================================================================
// QUERY / RESULT
// =============================================================================

/// Parameters for one list fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub name: String,
    pub status: StatusFilter,
    pub species: String,
    pub gender: GenderFilter,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl ListQuery {
    /// Upstream query parameters. Empty filters are omitted; sort and order
    /// are applied locally and never sent.
    #[must_use]
    pub fn upstream_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.max(1).to_string())];
        let filters = [
            ("name", self.name.as_str()),
            ("status", self.status.as_str()),
            ("species", self.species.as_str()),
            ("gender", self.gender.as_str()),
        ];
        params.extend(filters.into_iter().filter(|(_, v)| !v.is_empty()).map(|(k, v)| (k, v.to_owned())));
        params
    }
}

impl From<&UrlState> for ListQuery {
    fn from(state: &UrlState) -> Self {
        Self {
            page: state.page,
            name: state.name.clone(),
            status: state.status,
            species: state.species.clone(),
            gender: state.gender,
            sort: state.sort,
            order: state.order,
        }
    }
}

/// One page of characters plus pagination facts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterPage {
    pub items: Vec<Character>,
    pub total_count: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<ApiPage<Character>> for CharacterPage {
    fn from(page: ApiPage<Character>) -> Self {
        Self {
            items: page.results,
            total_count: page.info.count,
            total_pages: page.info.pages,
            has_next: page.info.next.is_some(),
            has_prev: page.info.prev.is_some(),
        }
    }
}

// =============================================================================
// FETCHER TRAIT
// =============================================================================

/// Provider-neutral character fetcher. Enables mocking in tests.
#[async_trait::async_trait]
pub trait CharacterSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ApiError::Cancelled`] if `cancel` fires first, otherwise
    /// the classified transport or HTTP failure.
    async fn list_characters(&self, query: &ListQuery, cancel: &CancellationToken) -> Result<CharacterPage, ApiError>;

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    async fn character(&self, id: CharacterId, cancel: &CancellationToken) -> Result<Character, ApiError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
