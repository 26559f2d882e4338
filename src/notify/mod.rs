//! Notification seam: outbox enqueueing and realtime change events.
//!
//! The auction core never delivers anything itself. Accepted mutations hand
//! a `Notification` to this seam after commit; delivery workers and frontend
//! subscriptions live on the other side of it.

use crate::domain::{ChangeEvent, Notification};
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod outbox;

pub use mock::MockNotifier;
pub use outbox::OutboxNotifier;

/// Sink for notifications and realtime change events.
///
/// Implementations must be cheap to call from request handlers; failures are
/// the caller's to log, never to propagate into the owning operation.
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Persist a notification for later delivery.
    async fn enqueue(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Announce a row change to realtime subscribers. Fire-and-forget;
    /// having no subscribers is not an error.
    fn publish_change(&self, event: ChangeEvent);
}

/// Error type for notification operations.
#[derive(Debug, Clone)]
pub enum NotifyError {
    /// The outbox write failed.
    Storage(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Storage(msg) => write!(f, "outbox storage error: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}
