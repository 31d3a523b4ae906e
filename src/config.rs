//! Configuration parsed from environment variables.
//!
//! `main` loads `.env` via `dotenvy` before calling [`Config::from_env`];
//! command-line flags override individual fields afterwards.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::client::DEFAULT_API_BASE_URL;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;
pub const DEFAULT_LIST_RETRIES: u32 = 3;
pub const DEFAULT_DETAIL_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BASE_MS: u64 = 1000;
const DATA_DIR_NAME: &str = ".explorer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub timeouts: HttpTimeouts,
    pub search_debounce_ms: u64,
    pub list_retries: u32,
    pub detail_retries: u32,
    pub retry_base_ms: u64,
    pub prefers_dark: bool,
}

impl Config {
    /// Build config from environment variables. Every variable is optional:
    /// - `EXPLORER_API_BASE_URL`: default `https://rickandmortyapi.com/api`
    /// - `EXPLORER_DATA_DIR`: default `$HOME/.explorer`, else `./.explorer`
    /// - `EXPLORER_REQUEST_TIMEOUT_SECS`: default 30
    /// - `EXPLORER_CONNECT_TIMEOUT_SECS`: default 10
    /// - `EXPLORER_SEARCH_DEBOUNCE_MS`: default 400
    /// - `EXPLORER_LIST_RETRIES`: default 3
    /// - `EXPLORER_DETAIL_RETRIES`: default 2
    /// - `EXPLORER_RETRY_BASE_MS`: default 1000
    /// - `EXPLORER_PREFERS_DARK`: system dark preference, default false
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("EXPLORER_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let data_dir = std::env::var_os("EXPLORER_DATA_DIR").map_or_else(default_data_dir, PathBuf::from);

        Self {
            api_base_url,
            data_dir,
            timeouts: HttpTimeouts {
                request_secs: env_parse("EXPLORER_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("EXPLORER_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            search_debounce_ms: env_parse("EXPLORER_SEARCH_DEBOUNCE_MS", DEFAULT_SEARCH_DEBOUNCE_MS),
            list_retries: env_parse("EXPLORER_LIST_RETRIES", DEFAULT_LIST_RETRIES),
            detail_retries: env_parse("EXPLORER_DETAIL_RETRIES", DEFAULT_DETAIL_RETRIES),
            retry_base_ms: env_parse("EXPLORER_RETRY_BASE_MS", DEFAULT_RETRY_BASE_MS),
            prefers_dark: env_parse("EXPLORER_PREFERS_DARK", false),
        }
    }

    #[must_use]
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    #[must_use]
    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from(DATA_DIR_NAME), |home| PathBuf::from(home).join(DATA_DIR_NAME))
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
