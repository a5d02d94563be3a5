//! Attempt execution: the per-attempt pipeline, the probes it runs and
//! the dispatcher that turns fired alarms into pooled attempts.

mod dispatcher;
mod error;
mod format;
mod notify;
mod pipeline;
pub mod probe;
mod services;

pub use dispatcher::Dispatcher;
pub use error::{WorkerError, WorkerResult};
pub use format::{counted, percent, readable_duration};
pub use notify::{NotificationSink, TracingNotifier, should_notify};
pub use pipeline::TaskWorker;
pub use services::NetworkServices;
