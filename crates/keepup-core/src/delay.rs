use std::time::Duration;

use crate::NetworkTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayStrategy {
    Immediate,
    /// The task's full interval, counted from now.
    Interval,
    /// What remains of the interval since the last attempt started.
    LastScheduled,
}

pub fn compute_delay(strategy: DelayStrategy, task: &NetworkTask, now_ms: i64) -> Duration {
    match strategy {
        DelayStrategy::Immediate => Duration::ZERO,

        DelayStrategy::Interval => millis(task.interval_millis()),

        DelayStrategy::LastScheduled => {
            if task.last_scheduled <= 0 {
                return Duration::ZERO;
            }
            let elapsed = now_ms.saturating_sub(task.last_scheduled);
            millis(task.interval_millis().saturating_sub(elapsed))
        }
    }
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}
