use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::catalog::CatalogSync;

pub const DEFAULT_QUIET: Duration = Duration::from_millis(600);

#[derive(Default)]
struct Pending {
    term: String,
    timer: Option<JoinHandle<()>>,
}

/// Coalesces keystrokes into one search per settled input.
///
/// Each keystroke cancels the scheduled callback and schedules a new one after
/// the quiet interval. Once a callback fires, the search it starts is detached:
/// later keystrokes do not abort it, and the catalog's search generation
/// discards its results if a newer search has begun.
pub struct SearchDebouncer {
    catalog: Arc<CatalogSync>,
    quiet: Duration,
    pending: Mutex<Pending>,
}

impl SearchDebouncer {
    pub fn new(catalog: Arc<CatalogSync>, quiet: Duration) -> Self {
        Self {
            catalog,
            quiet,
            pending: Mutex::new(Pending::default()),
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    pub fn pending_term(&self) -> String {
        self.lock().term.clone()
    }

    /// Must be called from within a tokio runtime.
    pub fn keystroke(&self, term: impl Into<String>) {
        let term = term.into();
        let mut pending = self.lock();
        pending.term = term.clone();
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }

        let catalog = self.catalog.clone();
        let quiet = self.quiet;
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            debug!(term = %term, "Search input settled");
            tokio::spawn(async move {
                // Failures are already published on the error channel.
                let _ = catalog.search(&term).await;
            });
        }));
    }

    /// Cancels a scheduled search that has not fired and clears the results.
    pub fn close(&self) {
        let mut pending = self.lock();
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        pending.term.clear();
        self.catalog.clear_search();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        self.catalog.clear_search();
    }
}
