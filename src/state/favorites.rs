//! Favorites store: which characters the user has hearted.
//!
//! DESIGN
//! ======
//! One `FavoritesStore` is created at composition time and cloned into
//! every consumer; clones share the same cache. The cache is hydrated once
//! from the KV store and only after that does any toggle get persisted, so
//! an empty pre-hydration cache can never overwrite saved favorites.
//!
//! The persisted mapping only ever holds `true` entries: un-favoriting
//! deletes the key.
//!
//! TRADE-OFFS
//! ==========
//! Two processes toggling at once race on the whole mapping and the last
//! write wins. There is no merge; a favorite added elsewhere can be lost.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::types::CharacterId;
use crate::storage::{ChangeOrigin, KvStore, StorageChange, StorageError};

pub const FAVORITES_KEY: &str = "rick-morty-favorites";

/// Persisted favorites mapping. Serialized as `{"<id>": true, ...}`.
pub type FavoritesState = BTreeMap<CharacterId, bool>;

#[derive(Clone)]
pub struct FavoritesStore {
    kv: KvStore,
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    favorites: FavoritesState,
    loaded: bool,
}

impl FavoritesStore {
    /// Create an unhydrated store. Call [`hydrate`](Self::hydrate) before
    /// expecting toggles to persist.
    #[must_use]
    pub fn new(kv: KvStore) -> Self {
        Self { kv, inner: Arc::new(Mutex::new(Inner::default())) }
    }

    /// Create and hydrate in one step.
    #[must_use]
    pub fn load(kv: KvStore) -> Self {
        let store = Self::new(kv);
        store.hydrate();
        store
    }

    /// Replace the cache with the persisted mapping and mark the store loaded.
    pub fn hydrate(&self) {
        let stored = self.kv.read::<FavoritesState>(FAVORITES_KEY).map(only_true).unwrap_or_default();
        let mut inner = self.lock();
        info!(count = stored.len(), "favorites hydrated");
        inner.favorites = stored;
        inner.loaded = true;
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.lock().loaded
    }

    /// Flip membership for `id` and persist. Returns the new membership.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] if the write fails; the cache is
    /// restored to its previous value first.
    pub fn toggle_favorite(&self, id: CharacterId) -> Result<bool, StorageError> {
        let mut inner = self.lock();
        let previous = inner.favorites.clone();

        let now_favorite = inner.favorites.remove(&id).is_none();
        if now_favorite {
            inner.favorites.insert(id, true);
        }
        debug!(id, favorite = now_favorite, "favorite toggled");

        self.persist(&mut inner, previous)?;
        Ok(now_favorite)
    }

    #[must_use]
    pub fn is_favorite(&self, id: CharacterId) -> bool {
        self.lock().favorites.get(&id).copied().unwrap_or(false)
    }

    /// Favorited ids in ascending order.
    #[must_use]
    pub fn favorite_ids(&self) -> Vec<CharacterId> {
        self.lock().favorites.iter().filter(|(_, fav)| **fav).map(|(id, _)| *id).collect()
    }

    #[must_use]
    pub fn favorite_count(&self) -> usize {
        self.lock().favorites.len()
    }

    #[must_use]
    pub fn favorites(&self) -> FavoritesState {
        self.lock().favorites.clone()
    }

    /// Remove every favorite and persist.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] if the write fails; the cache is restored.
    pub fn clear_favorites(&self) -> Result<(), StorageError> {
        let mut inner = self.lock();
        let previous = std::mem::take(&mut inner.favorites);
        self.persist(&mut inner, previous)
    }

    /// Fold a storage change into the cache. Returns `true` if it concerned
    /// favorites.
    pub fn apply_change(&self, change: &StorageChange) -> bool {
        if change.key != FAVORITES_KEY {
            return false;
        }
        let next = change.decode::<FavoritesState>().map(only_true).unwrap_or_default();
        self.lock().favorites = next;
        true
    }

    /// Stream of favorites snapshots, from this process and elsewhere.
    #[must_use]
    pub fn subscribe(&self) -> FavoritesSubscription {
        FavoritesSubscription { rx: self.kv.subscribe() }
    }

    /// Keep the cache in step with changes reported by other processes.
    /// Local writes are already in the cache and are skipped, so a late
    /// notification can never roll back a newer toggle.
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut rx = self.kv.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) if change.origin == ChangeOrigin::External => {
                        if store.apply_change(&change) {
                            info!(count = store.favorite_count(), "favorites synced from external change");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "favorites sync lagged, re-reading storage");
                        store.hydrate();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn persist(&self, inner: &mut Inner, previous: FavoritesState) -> Result<(), StorageError> {
        if !inner.loaded {
            debug!("favorites not hydrated yet, skipping persist");
            return Ok(());
        }
        if let Err(e) = self.kv.write(FAVORITES_KEY, &inner.favorites) {
            inner.favorites = previous;
            return Err(e);
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn only_true(mut state: FavoritesState) -> FavoritesState {
    state.retain(|_, fav| *fav);
    state
}

/// Receiver half of [`FavoritesStore::subscribe`].
pub struct FavoritesSubscription {
    rx: broadcast::Receiver<StorageChange>,
}

impl FavoritesSubscription {
    /// Wait for the next favorites change. `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<FavoritesState> {
        loop {
            match self.rx.recv().await {
                Ok(change) if change.key == FAVORITES_KEY => {
                    return Some(change.decode::<FavoritesState>().map(only_true).unwrap_or_default());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "favorites subscriber lagged"),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
#[path = "favorites_test.rs"]
mod tests;
