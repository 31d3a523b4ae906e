//! Optimistic favorite toggle for a single heart button.
//!
//! The displayed flag flips before persistence runs. Either way the
//! tentative marker is cleared once the store answers: on success the store
//! holds the new value, on failure it has already restored the old one, so
//! the button shows the previous value and keeps following later changes.

use tracing::warn;

use crate::api::types::CharacterId;
use crate::state::favorites::FavoritesStore;
use crate::storage::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Committed { favorite: bool },
    RolledBack { favorite: bool, error: StorageError },
}

#[derive(Debug, Clone)]
pub struct OptimisticFavorite {
    id: CharacterId,
    tentative: Option<bool>,
}

impl OptimisticFavorite {
    #[must_use]
    pub fn new(id: CharacterId) -> Self {
        Self { id, tentative: None }
    }

    #[must_use]
    pub fn id(&self) -> CharacterId {
        self.id
    }

    /// What the button shows: the tentative value while one is set,
    /// otherwise the store's value.
    #[must_use]
    pub fn displayed(&self, store: &FavoritesStore) -> bool {
        self.tentative.unwrap_or_else(|| store.is_favorite(self.id))
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.tentative.is_some()
    }

    pub fn toggle(&mut self, store: &FavoritesStore) -> ToggleOutcome {
        let previous = self.displayed(store);
        let target = !previous;
        self.tentative = Some(target);

        match store.toggle_favorite(self.id) {
            Ok(favorite) => {
                self.tentative = None;
                ToggleOutcome::Committed { favorite }
            }
            Err(error) => {
                warn!(id = self.id, error = %error, "favorite toggle rolled back");
                self.tentative = None;
                ToggleOutcome::RolledBack { favorite: previous, error }
            }
        }
    }
}

#[cfg(test)]
#[path = "optimistic_test.rs"]
mod tests;
