use std::fmt::Debug;

use keepup_core::{LogEntry, NetworkTask, NotificationPolicy, NotificationSettings};
use tracing::warn;

/// Receives the log entries a user should hear about.
pub trait NotificationSink: Debug + Send + Sync {
    fn notify(&self, task: &NetworkTask, entry: &LogEntry);
}

/// Emits notifications as `warn` events on the `keepup::notify` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, task: &NetworkTask, entry: &LogEntry) {
        warn!(
            target: "keepup::notify",
            task_id = %task.id,
            address = %task.address,
            success = entry.success,
            "{}",
            entry.message
        );
    }
}

/// Decides whether a freshly persisted entry warrants a notification.
///
/// `previous` is the latest entry before this attempt, `failure_count`
/// the consecutive failure count after it.
pub fn should_notify(
    settings: &NotificationSettings,
    entry: &LogEntry,
    previous: Option<&LogEntry>,
    failure_count: u32,
) -> bool {
    match settings.policy {
        NotificationPolicy::Failure => !entry.success && failure_count >= settings.after_failures,
        NotificationPolicy::Change => match previous {
            Some(previous) => previous.success != entry.success,
            None => !entry.success,
        },
    }
}
