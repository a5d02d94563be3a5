use std::sync::Arc;

use keepup_core::{SchedulerId, TaskId};
use keepup_scheduler::{AlarmEvent, PooledHandle, TaskScheduler, WorkToken};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::TaskWorker;

/// Routes fired alarms: task alarms start a pooled attempt, suspension
/// alarms go to the quiet-hours layer.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    scheduler: Arc<TaskScheduler>,
    worker: Arc<TaskWorker>,
}

impl Dispatcher {
    pub fn new(scheduler: Arc<TaskScheduler>, worker: Arc<TaskWorker>) -> Self {
        Self { scheduler, worker }
    }

    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: AlarmEvent) {
        match event {
            AlarmEvent::Task {
                task_id,
                scheduler_id,
            } => self.spawn_attempt(task_id, scheduler_id),
            AlarmEvent::Suspension(alarm) => {
                if let Err(err) = self.scheduler.on_suspension_alarm(alarm) {
                    error!(error = %err, "failed to handle suspension alarm");
                }
            }
        }
    }

    fn spawn_attempt(&self, task_id: TaskId, scheduler_id: SchedulerId) {
        debug!(%task_id, %scheduler_id, "spawning attempt");
        let token = WorkToken::new();
        let worker = self.worker.clone();
        let attempt_token = token.clone();
        let handle = tokio::spawn(async move {
            worker.run(task_id, scheduler_id, attempt_token).await;
        });
        self.scheduler
            .pool()
            .pool(scheduler_id, PooledHandle::new(token, handle));
    }

    /// Consumes alarm events until the channel closes or `shutdown` fires.
    pub async fn run(
        self,
        mut events: UnboundedReceiver<AlarmEvent>,
        shutdown: CancellationToken,
    ) {
        info!("dispatcher started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("dispatcher shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        debug!("alarm channel closed");
                        break;
                    }
                },
            }
        }
        info!("dispatcher exited");
    }
}
