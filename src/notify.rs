//! Fire-and-forget user feedback.
//!
//! Notifications are ephemeral: nothing waits for them and a missing
//! listener is not an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
    fn notify_success(&self, message: &str);
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::warn!(target: "notify", "{}", message);
    }

    fn notify_success(&self, message: &str) {
        tracing::info!(target: "notify", "{}", message);
    }
}

/// Broadcasts notifications to any number of listeners
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: broadcast::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    fn send(&self, level: NotificationLevel, message: &str) {
        let notification = Notification {
            level,
            message: message.to_string(),
            at: Utc::now(),
        };
        // No receivers is fine
        let _ = self.tx.send(notification);
    }
}

impl Notifier for ChannelNotifier {
    fn notify_error(&self, message: &str) {
        tracing::warn!(target: "notify", "{}", message);
        self.send(NotificationLevel::Error, message);
    }

    fn notify_success(&self, message: &str) {
        tracing::info!(target: "notify", "{}", message);
        self.send(NotificationLevel::Success, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_notifier_delivers_to_subscribers() {
        let notifier = ChannelNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.notify_success("Hospital created successfully");
        notifier.notify_error("Error: network error");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.level, NotificationLevel::Success);
        assert_eq!(first.message, "Hospital created successfully");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.level, NotificationLevel::Error);
        assert_eq!(second.message, "Error: network error");
    }

    #[test]
    fn sending_without_listeners_does_not_panic() {
        let notifier = ChannelNotifier::new(1);
        notifier.notify_error("nobody listening");
    }
}
