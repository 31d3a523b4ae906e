//! HTTP client for the Rick and Morty character API.
//!
//! Thin `reqwest` wrapper. Every call races a `CancellationToken`; a fired
//! token yields `ApiError::Cancelled`, never a network error. Response
//! classification and sorting are pure functions for testability.

use std::cmp::Ordering;
use std::time::Duration;

use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::types::{
    ApiError, ApiPage, Character, CharacterId, CharacterPage, CharacterSource, Episode, ListQuery, OneOrMany,
};
use crate::config::Config;
use crate::state::url::{SortKey, SortOrder};

pub const DEFAULT_API_BASE_URL: &str = "https://rickandmortyapi.com/api";
const CHARACTER_PATH: &str = "character";
const EPISODE_PATH: &str = "episode";

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.timeouts.request_secs),
            Duration::from_secs(config.timeouts.connect_secs),
        )
    }

    /// Fetch several characters in one request. An empty `ids` makes no call.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn characters_by_ids(
        &self,
        ids: &[CharacterId],
        cancel: &CancellationToken,
    ) -> Result<Vec<Character>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!("{CHARACTER_PATH}/{}", join_ids(ids));
        let batch: OneOrMany<Character> = self.get_json(&path, &[], cancel).await?;
        Ok(batch.into_vec())
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown id.
    pub async fn episode(&self, id: u32, cancel: &CancellationToken) -> Result<Episode, ApiError> {
        self.get_json(&format!("{EPISODE_PATH}/{id}"), &[], cancel).await
    }

    /// Fetch several episodes in one request. An empty `ids` makes no call.
    ///
    /// # Errors
    ///
    /// Returns the classified [`ApiError`].
    pub async fn episodes_by_ids(&self, ids: &[u32], cancel: &CancellationToken) -> Result<Vec<Episode>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let path = format!("{EPISODE_PATH}/{}", join_ids(ids));
        let batch: OneOrMany<Episode> = self.get_json(&path, &[], cancel).await?;
        Ok(batch.into_vec())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }

        let url = format!("{}/{path}", self.base_url);
        debug!(%url, ?params, "api request");
        let request = self.http.get(&url).query(params).send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
            res = request => res.map_err(|e| network_error(&e))?,
        };

        let status = response.status().as_u16();
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
            res = response.text() => res.map_err(|e| network_error(&e))?,
        };

        debug!(%url, status, bytes = body.len(), "api response");
        parse_response(status, &body)
    }
}

#[async_trait::async_trait]
impl CharacterSource for ApiClient {
    async fn list_characters(&self, query: &ListQuery, cancel: &CancellationToken) -> Result<CharacterPage, ApiError> {
        let page: ApiPage<Character> = self.get_json(CHARACTER_PATH, &query.upstream_params(), cancel).await?;
        let mut page = CharacterPage::from(page);
        sort_characters(&mut page.items, query.sort, query.order);
        Ok(page)
    }

    async fn character(&self, id: CharacterId, cancel: &CancellationToken) -> Result<Character, ApiError> {
        self.get_json(&format!("{CHARACTER_PATH}/{id}"), &[], cancel).await
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

fn network_error(e: &reqwest::Error) -> ApiError {
    ApiError::Network { message: e.to_string(), status: e.status().map(|s| s.as_u16()) }
}

/// Classify a status code and decode the body.
pub(crate) fn parse_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ApiError> {
    match status {
        200..=299 => serde_json::from_str(body).map_err(|e| ApiError::Server {
            status,
            message: format!("Failed to parse response: {e}"),
        }),
        404 => Err(ApiError::NotFound),
        500..=599 => Err(ApiError::Server { status, message: "Server error. Please try again later.".into() }),
        _ => Err(ApiError::Network { message: format!("Request failed with status {status}"), status: Some(status) }),
    }
}

// =============================================================================
// SORTING
// =============================================================================

/// Order a fetched page locally. Upstream already returns ascending id
/// order, so only `id asc` leaves the page untouched.
pub fn sort_characters(items: &mut [Character], sort: SortKey, order: SortOrder) {
    if sort == SortKey::Id && order == SortOrder::Asc {
        return;
    }
    items.sort_by(|a, b| {
        let ord = compare(a, b, sort);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

fn compare(a: &Character, b: &Character, sort: SortKey) -> Ordering {
    match sort {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Created => created_at(a).cmp(&created_at(b)),
    }
}

/// Unparseable timestamps sort first.
fn created_at(c: &Character) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(&c.created, &Rfc3339).ok()
}

// =============================================================================
// RESOURCE URLS
// =============================================================================

fn join_ids(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

/// Trailing numeric id of a `.../{segment}/{id}` URL.
fn trailing_id(url: &str, segment: &str) -> Option<u32> {
    let (_, tail) = url.rsplit_once(&format!("/{segment}/"))?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// Episode ids referenced by a character's `episode` URLs. URLs that do
/// not end in `/episode/{id}` are skipped.
#[must_use]
pub fn extract_episode_ids(urls: &[String]) -> Vec<u32> {
    urls.iter().filter_map(|u| trailing_id(u, EPISODE_PATH)).collect()
}

#[must_use]
pub fn extract_character_id(url: &str) -> Option<CharacterId> {
    trailing_id(url, CHARACTER_PATH)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
