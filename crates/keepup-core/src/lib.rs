//! Domain model shared by the keepup crates: network tasks, suspend
//! intervals, log entries, delay strategies and settings.

pub mod clock;
pub mod delay;
pub mod ids;
pub mod interval;
pub mod log;
pub mod settings;
pub mod state;
pub mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use delay::{DelayStrategy, compute_delay};
pub use ids::{LogId, SchedulerId, TaskId};
pub use interval::{Interval, TimeOfDay, TimeOfDayError, find_current, find_next, next_occurrence};
pub use log::{ExecutionResult, LogEntry, ProbeStats};
pub use settings::{
    ConfigError, DownloadSettings, LogSettings, NetworkSettings, NotificationPolicy,
    NotificationSettings, ProbeSettings, SchedulerSettings, Settings, SettingsHandle,
    StorageSettings, TaskSeed,
};
pub use state::SchedulerState;
pub use task::{AccessType, NOT_SCHEDULED, NetworkTask, NetworkTaskBuilder, UnknownAccessType};
