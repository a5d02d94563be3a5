use serde::{Deserialize, Serialize};

use crate::{LogId, TaskId};

/// One appended record describing the outcome of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Option<LogId>,
    pub network_task_id: TaskId,
    /// Epoch millis of the attempt start.
    pub timestamp: i64,
    pub success: bool,
    pub message: String,
}

impl LogEntry {
    pub fn success(network_task_id: TaskId, timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            id: None,
            network_task_id,
            timestamp,
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(network_task_id: TaskId, timestamp: i64, message: impl Into<String>) -> Self {
        Self {
            id: None,
            network_task_id,
            timestamp,
            success: false,
            message: message.into(),
        }
    }
}

/// Counters shared by the repeating probes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeStats {
    pub attempts: u32,
    pub successes: u32,
    pub timeouts: u32,
    pub other_errors: u32,
    /// Sum of the durations of successful attempts.
    pub total_duration_ms: f64,
    /// `"<Kind>: <message>"` of the last failed attempt.
    pub last_error: Option<String>,
}

impl ProbeStats {
    pub fn average_duration_ms(&self) -> Option<f64> {
        if self.successes == 0 {
            None
        } else {
            Some(self.total_duration_ms / f64::from(self.successes))
        }
    }

    pub fn failures(&self) -> u32 {
        self.attempts.saturating_sub(self.successes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub log_entry: LogEntry,
    pub stats: Option<ProbeStats>,
}

impl ExecutionResult {
    pub fn new(log_entry: LogEntry) -> Self {
        Self {
            log_entry,
            stats: None,
        }
    }

    pub fn with_stats(mut self, stats: ProbeStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn is_success(&self) -> bool {
        self.log_entry.success
    }
}
