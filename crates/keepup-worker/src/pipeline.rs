use std::any::Any;
use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use keepup_core::{
    AccessType, Clock, DelayStrategy, ExecutionResult, LogEntry, NetworkTask, SchedulerId,
    Settings, SettingsHandle, TaskId,
};
use keepup_network::{DownloadControl, select_address, url_host};
use keepup_scheduler::{TaskScheduler, WorkToken};
use keepup_storage::{Admission, LogStore, TaskStore};
use tracing::{debug, error, info, warn};

use crate::format::{counted, with_last_error};
use crate::notify::{NotificationSink, should_notify};
use crate::probe::{
    NO_ACCESS_TYPE_MESSAGE, ProbeOutcome, Target, run_connect, run_download, run_ping,
};
use crate::{NetworkServices, WorkerResult};

/// Executes single attempts of network tasks.
///
/// An attempt runs validate, admit, resolve, probe, aggregate, persist
/// and reschedule in order. Whatever happens in between, an admitted
/// attempt releases its instance and hands the task back to the
/// [`TaskScheduler`] with [`DelayStrategy::Interval`].
#[derive(Debug)]
pub struct TaskWorker {
    tasks: Arc<dyn TaskStore>,
    logs: Arc<dyn LogStore>,
    scheduler: Arc<TaskScheduler>,
    network: NetworkServices,
    notifier: Arc<dyn NotificationSink>,
    settings: SettingsHandle,
    clock: Arc<dyn Clock>,
}

impl TaskWorker {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        logs: Arc<dyn LogStore>,
        scheduler: Arc<TaskScheduler>,
        network: NetworkServices,
        notifier: Arc<dyn NotificationSink>,
        settings: SettingsHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            logs,
            scheduler,
            network,
            notifier,
            settings,
            clock,
        }
    }

    /// Runs one attempt for the generation the alarm was armed with.
    ///
    /// Returns the persisted result, or `None` when the alarm was stale
    /// or the store failed before anything could be recorded.
    pub async fn run(
        &self,
        task_id: TaskId,
        scheduler_id: SchedulerId,
        token: WorkToken,
    ) -> Option<ExecutionResult> {
        let started_at = self.clock.now_millis();

        let persisted = match self.tasks.read_task(task_id) {
            Ok(Some(task)) => task,
            Ok(None) => {
                debug!(%task_id, "task no longer exists, dropping alarm");
                return None;
            }
            Err(err) => {
                error!(%task_id, error = %err, "failed to read task");
                return None;
            }
        };
        let valid = persisted.running && persisted.scheduler_id == scheduler_id;
        let task = NetworkTask {
            scheduler_id,
            ..persisted
        };
        if !valid {
            debug!(%task_id, %scheduler_id, "stale or stopped generation, skipping attempt");
            self.reschedule(&task);
            return None;
        }

        let settings = self.settings.get();
        let max = settings.max_instances(task.access_type);
        let admission = match self.tasks.admit_instance(task.id, max) {
            Ok(admission) => admission,
            Err(err) => {
                error!(%task_id, error = %err, "failed to admit attempt");
                self.reschedule(&task);
                return None;
            }
        };
        if let Admission::Rejected { active } = admission {
            warn!(%task_id, active, max, "too many attempts active, skipping");
            let message = format!(
                "Skipped execution. Currently {} active, maximum is {max}.",
                counted(active, "attempt", "attempts"),
            );
            let entry = LogEntry::failure(task.id, started_at, message);
            let result = match self.logs.insert_log(entry) {
                Ok(entry) => Some(ExecutionResult::new(entry)),
                Err(err) => {
                    error!(%task_id, error = %err, "failed to record skipped attempt");
                    None
                }
            };
            self.reschedule(&task);
            return result;
        }

        let outcome = match AssertUnwindSafe(self.probe(&task, &settings, &token))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(%task_id, reason, "attempt panicked");
                ProbeOutcome::failure(format!("The attempt failed unexpectedly. {reason}"))
            }
        };
        let result = aggregate(&task, started_at, outcome);

        let result = if token.is_torn_down() {
            debug!(%task_id, "attempt torn down, discarding result");
            Some(result)
        } else {
            match self.persist(&task, &settings, result) {
                Ok(result) => Some(result),
                Err(err) => {
                    error!(%task_id, error = %err, "failed to persist attempt");
                    None
                }
            }
        };

        if let Err(err) = self.scheduler.terminate(&task) {
            error!(%task_id, error = %err, "failed to release attempt instance");
        }
        if !token.is_torn_down() {
            self.reschedule(&task);
        }
        result
    }

    async fn probe(
        &self,
        task: &NetworkTask,
        settings: &Settings,
        token: &WorkToken,
    ) -> ProbeOutcome {
        let connectivity = &self.network.connectivity;
        if !connectivity.is_connected() {
            return ProbeOutcome::failure("Skipped execution. No active network.");
        }
        if task.only_wifi && !connectivity.is_wifi_connected() {
            return ProbeOutcome::failure(
                "Skipped execution. The task requires wifi and no wifi network is active.",
            );
        }

        let Some(access_type) = task.access_type else {
            return ProbeOutcome::failure(NO_ACCESS_TYPE_MESSAGE);
        };
        info!(
            task_id = %task.id,
            address = %task.address,
            access_type = access_type.as_str(),
            "running probe"
        );

        match access_type {
            AccessType::Ping => {
                let target = match self.resolve(&task.address, settings).await {
                    Ok(target) => target,
                    Err(outcome) => return outcome,
                };
                run_ping(self.network.pinger.as_ref(), &target, &settings.ping, token).await
            }
            AccessType::Connect => {
                let target = match self.resolve(&task.address, settings).await {
                    Ok(target) => target,
                    Err(outcome) => return outcome,
                };
                run_connect(
                    self.network.connector.as_ref(),
                    &target,
                    task.port,
                    &settings.connect,
                    token,
                )
                .await
            }
            AccessType::Download => {
                // Unparseable URLs are left for the downloader to report.
                let address = match url_host(&task.address) {
                    Some(host) => match self.resolve(&host, settings).await {
                        Ok(target) => Some(target.ip),
                        Err(outcome) => return outcome,
                    },
                    None => None,
                };
                self.download(task, address, settings, token).await
            }
        }
    }

    async fn download(
        &self,
        task: &NetworkTask,
        address: Option<IpAddr>,
        settings: &Settings,
        token: &WorkToken,
    ) -> ProbeOutcome {
        let tasks = self.tasks.clone();
        let (id, scheduler_id) = (task.id, task.scheduler_id);
        let control = DownloadControl {
            stop: token.token().clone(),
            valid: Arc::new(move || {
                matches!(
                    tasks.read_task(id),
                    Ok(Some(current)) if current.running && current.scheduler_id == scheduler_id
                )
            }),
        };
        run_download(
            self.network.downloader.as_ref(),
            &task.address,
            address,
            &settings.download,
            &control,
        )
        .await
    }

    async fn resolve(&self, host: &str, settings: &Settings) -> Result<Target, ProbeOutcome> {
        let resolved = self.network.resolver.resolve(host).await;
        match resolved {
            Ok(addresses) => match select_address(&addresses, settings.network.prefer_ipv6) {
                Some(ip) => Ok(Target {
                    host: host.to_string(),
                    ip,
                }),
                None => Err(ProbeOutcome::failure(format!(
                    "Failed to resolve {host}. No address found."
                ))),
            },
            Err(err) => {
                debug!(host, error = %err, "resolution failed");
                Err(ProbeOutcome::failure(with_last_error(
                    format!("Failed to resolve {host}."),
                    Some(err.describe().as_str()),
                )))
            }
        }
    }

    fn persist(
        &self,
        task: &NetworkTask,
        settings: &Settings,
        result: ExecutionResult,
    ) -> WorkerResult<ExecutionResult> {
        let previous = self.logs.read_latest_log(task.id)?;
        let entry = self.logs.insert_log(result.log_entry)?;
        let trimmed = self
            .logs
            .trim_logs(task.id, settings.log.max_entries_per_task)?;
        if trimmed > 0 {
            debug!(task_id = %task.id, trimmed, "trimmed old log entries");
        }

        self.tasks.update_last_scheduled(task.id, entry.timestamp)?;
        let failure_count = if entry.success {
            self.tasks.reset_failure_count(task.id)?;
            0
        } else {
            self.tasks.increase_failure_count(task.id)?
        };

        if task.notification
            && should_notify(&settings.notification, &entry, previous.as_ref(), failure_count)
        {
            self.notifier.notify(task, &entry);
        }

        Ok(ExecutionResult {
            log_entry: entry,
            stats: result.stats,
        })
    }

    fn reschedule(&self, task: &NetworkTask) {
        if let Err(err) = self.scheduler.reschedule(task, DelayStrategy::Interval) {
            error!(task_id = %task.id, error = %err, "failed to reschedule task");
        }
    }
}

fn aggregate(task: &NetworkTask, started_at: i64, outcome: ProbeOutcome) -> ExecutionResult {
    let entry = if outcome.success {
        LogEntry::success(task.id, started_at, outcome.message)
    } else {
        LogEntry::failure(task.id, started_at, outcome.message)
    };
    let result = ExecutionResult::new(entry);
    if outcome.stats.attempts > 0 {
        result.with_stats(outcome.stats)
    } else {
        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
