//! Light/dark theme preference.
//!
//! The saved preference wins; with nothing saved the system preference
//! decides. Toggling persists the new choice under the theme key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::storage::KvStore;

pub const THEME_KEY: &str = "rick-morty-theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}' (expected 'light' or 'dark')")),
        }
    }
}

#[derive(Clone)]
pub struct ThemeStore {
    kv: KvStore,
}

impl ThemeStore {
    #[must_use]
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    #[must_use]
    pub fn saved(&self) -> Option<Theme> {
        self.kv.read::<Theme>(THEME_KEY)
    }

    /// Effective theme: saved preference, else the system preference.
    #[must_use]
    pub fn resolve(&self, system_prefers_dark: bool) -> Theme {
        self.saved().unwrap_or(if system_prefers_dark { Theme::Dark } else { Theme::Light })
    }

    pub fn set(&self, theme: Theme) {
        // Best effort: a failed write is logged and the theme still applies.
        let _ = self.kv.write(THEME_KEY, &theme);
        info!(%theme, "theme set");
    }

    /// Flip `current`, persist, and return the new theme.
    pub fn toggle(&self, current: Theme) -> Theme {
        let next = current.toggled();
        self.set(next);
        next
    }
}

#[cfg(test)]
#[path = "theme_test.rs"]
mod tests;
