//! Outbox-backed notifier with a broadcast channel for realtime events.

use crate::db::Repository;
use crate::domain::{ChangeEvent, Notification, TimeMs};
use crate::notify::{Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Buffered realtime events per subscriber before lagging kicks in.
const CHANGE_CHANNEL_CAPACITY: usize = 128;

/// Production notifier: notifications land in the `outbox_notifications`
/// table inside the same database, change events go out on a broadcast
/// channel that realtime subscribers (and tests) can tap.
#[derive(Debug)]
pub struct OutboxNotifier {
    repo: Arc<Repository>,
    changes: broadcast::Sender<ChangeEvent>,
}

impl OutboxNotifier {
    pub fn new(repo: Arc<Repository>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { repo, changes }
    }

    /// New receiver for the realtime change feed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn enqueue(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.repo
            .enqueue_notification(notification, TimeMs::now())
            .await
            .map(|_| ())
            .map_err(|e| NotifyError::Storage(e.to_string()))
    }

    fn publish_change(&self, event: ChangeEvent) {
        // send only fails when nobody is subscribed, which is fine
        let _ = self.changes.send(event);
    }
}
