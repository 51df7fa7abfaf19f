use crate::pagespeed::PageSpeedResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Pushed to session subscribers once per page whose metrics resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpeedEvent {
    pub url: String,
    #[serde(rename = "pageSpeedData")]
    pub page_speed_data: PageSpeedResult,
}

/// Per-audit context: the result emitter plus a cancellation flag for the
/// audit's background work.
///
/// Each audit gets its own session; nothing is shared across audits, so
/// there is no cross-request locking to worry about. Subscribers may attach
/// or detach at any time; events emitted while nobody listens are dropped,
/// not buffered. Cancellation is cooperative - in-flight tasks check the
/// flag before each provider call and backoff sleep, so tasks past their
/// last network call simply finish and their emit becomes a no-op.
#[derive(Debug, Clone)]
pub struct AuditSession {
    event_tx: broadcast::Sender<PageSpeedEvent>,
    cancelled: Arc<AtomicBool>,
}

impl AuditSession {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self {
            event_tx,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageSpeedEvent> {
        self.event_tx.subscribe()
    }

    /// Emit a result to whoever is listening. Send failures mean there are
    /// no subscribers right now; that is fine.
    pub fn emit(&self, event: PageSpeedEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Signal that the subscriber is gone and background work should wind
    /// down at the next cancellation check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }
}

impl Default for AuditSession {
    fn default() -> Self {
        Self::new()
    }
}
