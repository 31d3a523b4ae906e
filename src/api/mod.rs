//! Remote data fetcher for the public character API.

pub mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{ApiError, Character, CharacterId, CharacterPage, CharacterSource, Episode, ListQuery};
