use serde::{Deserialize, Serialize};

/// Persisted quiet-hours state, updated only by the suspension scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub suspended: bool,
    /// Epoch millis of the last transition.
    pub timestamp: i64,
}

impl SchedulerState {
    pub fn suspended_at(timestamp: i64) -> Self {
        Self {
            suspended: true,
            timestamp,
        }
    }

    pub fn running_at(timestamp: i64) -> Self {
        Self {
            suspended: false,
            timestamp,
        }
    }
}
