//! Debounced name search.
//!
//! Keystrokes go in through [`SearchDebouncer::input`]; once the text has
//! been quiet for the configured interval and differs from the last
//! committed name, a `name` patch comes out of
//! [`SearchDebouncer::next_patch`]. Applying that patch through the router
//! resets the page to 1 like any other filter change.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::state::url::UrlPatch;

const PATCH_BUFFER: usize = 8;

pub struct SearchDebouncer {
    input: watch::Sender<String>,
    committed: Arc<Mutex<String>>,
    patches: mpsc::Receiver<UrlPatch>,
    task: JoinHandle<()>,
}

impl SearchDebouncer {
    /// Start the debounce task. `initial` is the name currently in the URL.
    #[must_use]
    pub fn spawn(initial: &str, quiet: Duration) -> Self {
        let (input, input_rx) = watch::channel(initial.to_owned());
        let (patch_tx, patches) = mpsc::channel(PATCH_BUFFER);
        let committed = Arc::new(Mutex::new(initial.to_owned()));
        let task = tokio::spawn(debounce_loop(input_rx, patch_tx, Arc::clone(&committed), quiet));
        Self { input, committed, patches, task }
    }

    /// Record the current contents of the search box.
    pub fn input(&self, text: &str) {
        self.input.send_replace(text.to_owned());
    }

    /// Wait for the next settled change. `None` once the task has stopped.
    pub async fn next_patch(&mut self) -> Option<UrlPatch> {
        self.patches.recv().await
    }

    /// The URL changed underneath us (back/forward, reset). Adopt its name
    /// without emitting a patch.
    pub fn sync_from_url(&self, name: &str) {
        *self.committed.lock().unwrap_or_else(PoisonError::into_inner) = name.to_owned();
        self.input.send_replace(name.to_owned());
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce_loop(
    mut input: watch::Receiver<String>,
    patches: mpsc::Sender<UrlPatch>,
    committed: Arc<Mutex<String>>,
    quiet: Duration,
) {
    while input.changed().await.is_ok() {
        // Restart the quiet period on every keystroke.
        loop {
            tokio::select! {
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                () = tokio::time::sleep(quiet) => break,
            }
        }

        let value = input.borrow_and_update().clone();
        {
            let mut last = committed.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == value {
                continue;
            }
            last.clone_from(&value);
        }

        debug!(name = %value, "search settled");
        let patch = UrlPatch { name: Some(value), ..UrlPatch::default() };
        if patches.send(patch).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;
