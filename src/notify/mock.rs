//! In-memory notifier for tests.

use crate::domain::{ChangeEvent, Notification};
use crate::notify::{Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Records everything it is handed so tests can assert on it.
#[derive(Debug, Default)]
pub struct MockNotifier {
    enqueued: Mutex<Vec<Notification>>,
    published: Mutex<Vec<ChangeEvent>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `enqueue` fail, for exercising the rule that
    /// notification failures never fail the owning operation.
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn enqueued(&self) -> Vec<Notification> {
        self.enqueued.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<ChangeEvent> {
        self.published.lock().unwrap().clone()
    }

    /// Kinds of enqueued notifications, in arrival order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.enqueued.lock().unwrap().iter().map(|n| n.kind()).collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn enqueue(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Storage("mock failure".to_string()));
        }
        self.enqueued.lock().unwrap().push(notification.clone());
        Ok(())
    }

    fn publish_change(&self, event: ChangeEvent) {
        self.published.lock().unwrap().push(event);
    }
}
