//! Load state for the list and detail views.
//!
//! DESIGN
//! ======
//! A `Loader` owns one request slot. Starting a load cancels whatever was
//! in flight and bumps a generation counter; when a fetch finishes, its
//! result is applied only if its generation is still current. A superseded
//! or cancelled fetch never touches the published state, so the view keeps
//! showing "loading" (or the previous result) instead of flashing an error.
//!
//! Retries are bounded per view. `NotFound` and `Cancelled` are never
//! retried; network and server failures are, with exponential back-off
//! that itself aborts on cancellation.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::types::{ApiError, Character, CharacterId, CharacterPage, CharacterSource, ListQuery};
use crate::error::{
    ErrorCode, MSG_CHARACTER_NOT_FOUND, MSG_INVALID_CHARACTER_ID, MSG_NO_RESULTS, user_message,
};
use crate::state::favorites::FavoritesStore;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

// =============================================================================
// RETRY POLICY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles per retry up to 30s.
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// `failures` counts failed attempts so far, including this one.
    #[must_use]
    pub fn should_retry(&self, failures: u32, err: &ApiError) -> bool {
        err.retryable() && failures <= self.max_retries
    }

    #[must_use]
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}

/// Run `fetch` until it succeeds, fails terminally, or retries run out.
///
/// # Errors
///
/// Returns the last [`ApiError`], or [`ApiError::Cancelled`] if `cancel`
/// fires during back-off.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, cancel: &CancellationToken, mut fetch: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut failures = 0;
    loop {
        let err = match fetch().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        failures += 1;
        if !policy.should_retry(failures, &err) {
            return Err(err);
        }

        let delay = policy.delay(failures);
        warn!(error = %err, failures, delay_ms = delay.as_millis(), "fetch failed, retrying");
        tokio::select! {
            () = cancel.cancelled() => return Err(ApiError::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
    }
}

// =============================================================================
// LOAD STATE
// =============================================================================

/// Which view a loader feeds. Decides how `NotFound` is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    List,
    Detail,
}

/// What a view shows instead of data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// List query matched nothing. No retry action.
    NoResults,
    /// Detail id does not exist. No retry action.
    EntityNotFound,
    /// Detail id is not a positive integer.
    InvalidId,
    /// Anything else. Offers a retry action.
    Failed { message: &'static str, code: &'static str },
}

impl ViewError {
    #[must_use]
    pub fn from_api(view: ViewKind, err: &ApiError) -> Self {
        match (view, err) {
            (ViewKind::List, ApiError::NotFound) => Self::NoResults,
            (ViewKind::Detail, ApiError::NotFound) => Self::EntityNotFound,
            _ => Self::Failed { message: user_message(err), code: err.error_code() },
        }
    }

    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoResults => MSG_NO_RESULTS,
            Self::EntityNotFound => MSG_CHARACTER_NOT_FOUND,
            Self::InvalidId => MSG_INVALID_CHARACTER_ID,
            Self::Failed { message, .. } => *message,
        }
    }

    #[must_use]
    pub fn offers_retry(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(ViewError),
}

impl<T> LoadState<T> {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// How a single `run` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The result was published.
    Applied,
    /// A newer load started first; the result was dropped.
    Superseded,
    /// The request was cancelled; state stays as it was.
    Cancelled,
}

// =============================================================================
// LOADER
// =============================================================================

#[derive(Default)]
struct RequestSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl RequestSlot {
    fn begin(&mut self) -> (u64, CancellationToken) {
        self.cancel();
        self.generation += 1;
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        (self.generation, token)
    }

    fn finish(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.token = None;
        true
    }

    fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

struct LoaderInner<T> {
    view: ViewKind,
    policy: RetryPolicy,
    slot: Mutex<RequestSlot>,
    state: watch::Sender<LoadState<T>>,
}

impl<T> Drop for LoaderInner<T> {
    fn drop(&mut self) {
        self.slot.get_mut().unwrap_or_else(PoisonError::into_inner).cancel();
    }
}

/// Publishes the load state of one view. Clones share the slot and state.
pub struct Loader<T> {
    inner: Arc<LoaderInner<T>>,
}

impl<T> Clone for Loader<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Clone + Send + Sync + 'static> Loader<T> {
    #[must_use]
    pub fn new(view: ViewKind, policy: RetryPolicy) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        Self { inner: Arc::new(LoaderInner { view, policy, slot: Mutex::new(RequestSlot::default()), state }) }
    }

    #[must_use]
    pub fn state(&self) -> LoadState<T> {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadState<T>> {
        self.inner.state.subscribe()
    }

    /// Cancel the in-flight request, if any. State is left untouched.
    pub fn cancel(&self) {
        self.slot().cancel();
    }

    /// Supersede any in-flight request and publish `err` immediately.
    pub fn fail(&self, err: ViewError) {
        let mut slot = self.slot();
        let (generation, _) = slot.begin();
        slot.finish(generation);
        self.inner.state.send_replace(LoadState::Failed(err));
    }

    /// Start a load, superseding any in-flight one, and publish its result
    /// if it is still current when it finishes.
    pub async fn run<F, Fut>(&self, fetch: F) -> Completion
    where
        F: Fn(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let (generation, token) = self.slot().begin();
        self.inner.state.send_replace(LoadState::Loading);

        let outcome = fetch_with_retry(&self.inner.policy, &token, || fetch(token.clone())).await;

        let mut slot = self.slot();
        if !slot.finish(generation) {
            debug!(generation, "load superseded, dropping result");
            return Completion::Superseded;
        }
        let next = match outcome {
            Ok(value) => LoadState::Ready(value),
            Err(ApiError::Cancelled) => {
                debug!(generation, "load cancelled, keeping loading state");
                return Completion::Cancelled;
            }
            Err(err) => {
                warn!(error = %err, code = err.error_code(), "load failed");
                LoadState::Failed(ViewError::from_api(self.inner.view, &err))
            }
        };
        self.inner.state.send_replace(next);
        Completion::Applied
    }

    fn slot(&self) -> MutexGuard<'_, RequestSlot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// LIST / DETAIL LOADERS
// =============================================================================

/// Loader for the character list.
pub struct ListLoader<S: ?Sized> {
    source: Arc<S>,
    loader: Loader<CharacterPage>,
}

impl<S: CharacterSource + ?Sized + 'static> ListLoader<S> {
    #[must_use]
    pub fn new(source: Arc<S>, policy: RetryPolicy) -> Self {
        Self { source, loader: Loader::new(ViewKind::List, policy) }
    }

    #[must_use]
    pub fn loader(&self) -> &Loader<CharacterPage> {
        &self.loader
    }

    #[must_use]
    pub fn state(&self) -> LoadState<CharacterPage> {
        self.loader.state()
    }

    pub async fn load(&self, query: ListQuery) -> Completion {
        debug!(?query, "loading character list");
        let source = &self.source;
        let query = &query;
        self.loader.run(move |token| async move { source.list_characters(query, &token).await }).await
    }
}

impl<S: ?Sized> Clone for ListLoader<S> {
    fn clone(&self) -> Self {
        Self { source: Arc::clone(&self.source), loader: self.loader.clone() }
    }
}

/// Loader for a single character.
pub struct DetailLoader<S: ?Sized> {
    source: Arc<S>,
    loader: Loader<Character>,
}

impl<S: CharacterSource + ?Sized + 'static> DetailLoader<S> {
    #[must_use]
    pub fn new(source: Arc<S>, policy: RetryPolicy) -> Self {
        Self { source, loader: Loader::new(ViewKind::Detail, policy) }
    }

    #[must_use]
    pub fn state(&self) -> LoadState<Character> {
        self.loader.state()
    }

    /// Load `id`. A zero id fails immediately without a request.
    pub async fn load(&self, id: CharacterId) -> Completion {
        if id == 0 {
            self.loader.fail(ViewError::InvalidId);
            return Completion::Applied;
        }
        let source = &self.source;
        self.loader.run(move |token| async move { source.character(id, &token).await }).await
    }
}

impl<S: ?Sized> Clone for DetailLoader<S> {
    fn clone(&self) -> Self {
        Self { source: Arc::clone(&self.source), loader: self.loader.clone() }
    }
}

// =============================================================================
// LIST PRESENTATION
// =============================================================================

/// Characters to render: the whole page, or only favorites when the
/// favorites filter is on.
#[must_use]
pub fn visible_characters<'a>(page: &'a CharacterPage, favorites_only: bool, favorites: &FavoritesStore) -> Vec<&'a Character> {
    page.items
        .iter()
        .filter(|c| !favorites_only || favorites.is_favorite(c.id))
        .collect()
}

/// Result-count line shown above the grid.
#[must_use]
pub fn summary_line(page: &CharacterPage, shown: usize, current_page: u32, favorites_only: bool) -> String {
    if favorites_only {
        let plural = if shown == 1 { "" } else { "s" };
        return format!("Showing {shown} favorite character{plural}");
    }
    let mut line = format!("Showing {} of {} characters", page.items.len(), page.total_count);
    if current_page > 1 {
        line.push_str(&format!(" (Page {current_page} of {})", page.total_pages.max(1)));
    }
    line
}

#[cfg(test)]
#[path = "load_test.rs"]
mod tests;
