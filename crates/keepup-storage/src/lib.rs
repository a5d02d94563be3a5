//! Persistence ports for network tasks, log entries, suspend intervals and
//! the scheduler state, with a mutex-guarded implementation.

mod error;
mod memory;
mod ports;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use ports::{Admission, IntervalStore, LogStore, SchedulerStateStore, TaskStore};
