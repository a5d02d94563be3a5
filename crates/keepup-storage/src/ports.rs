//! Row-level access used by the schedulers and the worker.
//!
//! Every call is synchronous and atomic for the row it touches.

use std::fmt::Debug;

use keepup_core::{Interval, LogEntry, NetworkTask, SchedulerId, SchedulerState, TaskId};

use crate::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { instances: u32 },
    Rejected { active: u32 },
}

pub trait TaskStore: Debug + Send + Sync {
    /// Inserts a task, assigning its id and first generation.
    fn insert_task(&self, task: NetworkTask) -> StoreResult<NetworkTask>;

    fn read_task(&self, id: TaskId) -> StoreResult<Option<NetworkTask>>;

    fn read_tasks(&self) -> StoreResult<Vec<NetworkTask>>;

    /// Replaces the user editable fields of a task.
    fn update_task(&self, task: &NetworkTask) -> StoreResult<()>;

    fn delete_task(&self, id: TaskId) -> StoreResult<()>;

    fn update_running(&self, id: TaskId, running: bool) -> StoreResult<()>;

    /// Stamps a fresh, strictly increasing generation on the task.
    fn stamp_scheduler_id(&self, id: TaskId) -> StoreResult<SchedulerId>;

    /// Increments `instances` unless it already reached `max`.
    fn admit_instance(&self, id: TaskId, max: u32) -> StoreResult<Admission>;

    /// Decrements `instances`, never below zero. Returns the new count.
    fn decrease_instances(&self, id: TaskId) -> StoreResult<u32>;

    fn reset_instances(&self, id: TaskId) -> StoreResult<()>;

    fn update_last_scheduled(&self, id: TaskId, last_scheduled: i64) -> StoreResult<()>;

    fn increase_failure_count(&self, id: TaskId) -> StoreResult<u32>;

    fn reset_failure_count(&self, id: TaskId) -> StoreResult<()>;
}

pub trait LogStore: Debug + Send + Sync {
    fn insert_log(&self, entry: LogEntry) -> StoreResult<LogEntry>;

    /// Entries of one task, oldest first.
    fn read_logs(&self, task_id: TaskId) -> StoreResult<Vec<LogEntry>>;

    fn read_latest_log(&self, task_id: TaskId) -> StoreResult<Option<LogEntry>>;

    fn delete_logs(&self, task_id: TaskId) -> StoreResult<()>;

    /// Drops the oldest entries beyond `keep`. Returns how many were removed.
    fn trim_logs(&self, task_id: TaskId, keep: usize) -> StoreResult<usize>;
}

pub trait IntervalStore: Debug + Send + Sync {
    fn read_intervals(&self) -> StoreResult<Vec<Interval>>;

    fn insert_interval(&self, interval: Interval) -> StoreResult<Interval>;

    fn delete_interval(&self, id: i64) -> StoreResult<()>;

    fn delete_intervals(&self) -> StoreResult<()>;
}

pub trait SchedulerStateStore: Debug + Send + Sync {
    /// The persisted state, or the default state if none was written yet.
    fn read_scheduler_state(&self) -> StoreResult<SchedulerState>;

    fn update_scheduler_state(&self, state: SchedulerState) -> StoreResult<()>;
}
