//! Timer lifecycle of network tasks and the quiet-hours layer above it.

mod alarm;
mod error;
mod messages;
mod pool;
mod suspension;
mod task_scheduler;

pub use alarm::{AlarmService, DelayQueueAlarms, ManualAlarms};
pub use error::{SchedulerError, SchedulerResult};
pub use messages::{AlarmEvent, AlarmId, AlarmTrigger, SuspensionAlarm};
pub use pool::{PooledHandle, ProcessPool, WorkToken};
pub use suspension::SuspensionScheduler;
pub use task_scheduler::{TaskControl, TaskScheduler};
