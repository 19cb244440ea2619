//! User-facing notifications.
//!
//! Notifications are fire-and-forget: nothing in the crate waits on or
//! inspects the result of emitting one.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Success,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Success => "success",
            Level::Warning => "warning",
            Level::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: Level::Success, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { level: Level::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }
}

/// Surfaces notifications to a user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn success(&self, message: &str) {
        self.notify(Notification::success(message));
    }

    fn warning(&self, message: &str) {
        self.notify(Notification::warning(message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::error(message));
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => tracing::info!(target: "printfleet::notify", "{}", notification.message),
            Level::Warning => tracing::warn!(target: "printfleet::notify", "{}", notification.message),
            Level::Error => tracing::error!(target: "printfleet::notify", "{}", notification.message),
        }
    }
}

/// Forwards notifications to a receiver, e.g. a UI task.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new(sender: UnboundedSender<Notification>) -> Self {
        Self { sender }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            tracing::debug!("Notification receiver dropped");
        }
    }
}

/// Keeps every notification in memory until drained.
#[derive(Debug, Default, Clone)]
pub struct MemoryNotifier {
    inner: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn count(&self, level: Level) -> usize {
        self.snapshot().iter().filter(|n| n.level == level).count()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_notifier_records_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.success("queued");
        notifier.error("boom");
        assert_eq!(notifier.count(Level::Error), 1);
        let drained = notifier.drain();
        assert_eq!(drained[0], Notification::success("queued"));
        assert_eq!(drained[1].level, Level::Error);
        assert!(notifier.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_channel_notifier_forwards() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        notifier.warning("paused");
        assert_eq!(rx.recv().await, Some(Notification::warning("paused")));
        drop(rx);
        // Receiver gone: must not panic.
        notifier.warning("ignored");
    }
}
