//! Error-event channel consumed by the presentation layer.
//!
//! Synchronizers publish every failure here in addition to returning it, so a
//! toast/banner consumer can react without wrapping each call site.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::error;

use crate::error::SyncError;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorEvent {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    /// Operation that failed, e.g. `catalog.load_genres`.
    pub operation: &'static str,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ErrorBus {
    sender: broadcast::Sender<ErrorEvent>,
    next_id: Arc<AtomicU64>,
}

impl ErrorBus {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "error bus capacity must be positive");
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn publish(&self, operation: &'static str, err: &SyncError) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        error!(operation, kind = err.kind(), "{}", err);
        let event = ErrorEvent {
            id,
            timestamp: Utc::now(),
            operation,
            kind: err.kind(),
            message: err.to_string(),
        };
        // No subscribers is fine; the caller still gets the error back.
        let _ = self.sender.send(event);
        id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ErrorEvent> {
        self.sender.subscribe()
    }
}

impl Default for ErrorBus {
    fn default() -> Self {
        Self::new()
    }
}
