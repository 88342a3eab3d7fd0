//! Notification sink for user-facing state-transition messages.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Severity of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyLevel {
    Info,
    Error,
}

/// A message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotifyLevel,
    /// How long to show it (None = sink default).
    pub duration: Option<Duration>,
}

/// Fire-and-forget receiver of notifications.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, message: &str, level: NotifyLevel, duration: Option<Duration>);
}

/// Writes notifications to the `tracing` log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, message: &str, level: NotifyLevel, _duration: Option<Duration>) {
        match level {
            NotifyLevel::Info => tracing::info!(target: "entity_sync::notify", "{}", message),
            NotifyLevel::Error => tracing::error!(target: "entity_sync::notify", "{}", message),
        }
    }
}

/// Discards notifications.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _message: &str, _level: NotifyLevel, _duration: Option<Duration>) {}
}

/// Forwards notifications over a channel, e.g. to a UI thread.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: Sender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    pub fn new() -> (Self, Receiver<Notification>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, message: &str, level: NotifyLevel, duration: Option<Duration>) {
        // Receiver gone means nobody is listening.
        let _ = self.sender.send(Notification {
            message: message.to_string(),
            level,
            duration,
        });
    }
}

/// Human-readable label for an entity type: `"sales_order"` -> `"Sales order"`.
pub fn entity_label(entity_type: &str) -> String {
    let spaced: String = entity_type
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_label() {
        assert_eq!(entity_label("role"), "Role");
        assert_eq!(entity_label("sales_order"), "Sales order");
        assert_eq!(entity_label("hr-commission"), "Hr commission");
        assert_eq!(entity_label(""), "");
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, receiver) = ChannelSink::new();
        sink.notify("Role created", NotifyLevel::Info, Some(Duration::from_secs(3)));

        let note = receiver.try_recv().unwrap();
        assert_eq!(note.message, "Role created");
        assert_eq!(note.level, NotifyLevel::Info);
        assert_eq!(note.duration, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_channel_sink_without_receiver() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.notify("ignored", NotifyLevel::Error, None);
    }
}
