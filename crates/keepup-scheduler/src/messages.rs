use std::time::Duration;

use chrono::{DateTime, Utc};
use keepup_core::{SchedulerId, TaskId};

/// Identity of an armed timer. Arming an identity again replaces its timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmId {
    Task(TaskId),
    Suspension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmTrigger {
    After(Duration),
    At(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspensionAlarm {
    /// Armed right after this component restarted the tasks.
    pub restarted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    Task {
        task_id: TaskId,
        scheduler_id: SchedulerId,
    },
    Suspension(SuspensionAlarm),
}

impl AlarmEvent {
    pub fn id(&self) -> AlarmId {
        match self {
            AlarmEvent::Task { task_id, .. } => AlarmId::Task(*task_id),
            AlarmEvent::Suspension(_) => AlarmId::Suspension,
        }
    }
}

#[derive(Debug)]
pub(crate) enum AlarmCommand {
    Set { event: AlarmEvent, delay: Duration },
    Cancel(AlarmId),
    Shutdown,
}
