use std::sync::Arc;

use keepup_core::{Clock, DelayStrategy, NOT_SCHEDULED, NetworkTask, TaskId, compute_delay};
use keepup_storage::{StoreError, TaskStore};
use tracing::{debug, info};

use crate::{
    AlarmEvent, AlarmId, AlarmService, AlarmTrigger, ProcessPool, SchedulerResult,
    SuspensionAlarm, SuspensionScheduler,
};

/// Bulk operations the suspension scheduler applies to all tasks.
pub trait TaskControl {
    /// Disarms every running task, keeping `running` and `last_scheduled`.
    fn suspend_all(&self) -> SchedulerResult<()>;

    /// Re-arms every running task.
    fn schedule_all(&self) -> SchedulerResult<()>;
}

/// Owns the timer of every network task.
///
/// Each call re-reads the persisted task; the `scheduler_id` stamped by
/// [`TaskScheduler::start`] decides whether an alarm or an attempt still
/// belongs to the current generation.
#[derive(Debug)]
pub struct TaskScheduler {
    tasks: Arc<dyn TaskStore>,
    alarms: Arc<dyn AlarmService>,
    pool: Arc<ProcessPool>,
    suspension: SuspensionScheduler,
    clock: Arc<dyn Clock>,
}

impl TaskScheduler {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        alarms: Arc<dyn AlarmService>,
        pool: Arc<ProcessPool>,
        suspension: SuspensionScheduler,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks,
            alarms,
            pool,
            suspension,
            clock,
        }
    }

    pub fn suspension(&self) -> &SuspensionScheduler {
        &self.suspension
    }

    pub fn pool(&self) -> &Arc<ProcessPool> {
        &self.pool
    }

    fn read(&self, id: TaskId) -> SchedulerResult<NetworkTask> {
        Ok(self.tasks.read_task(id)?.ok_or(StoreError::TaskNotFound(id))?)
    }

    fn running_tasks(&self) -> SchedulerResult<Vec<NetworkTask>> {
        Ok(self
            .tasks
            .read_tasks()?
            .into_iter()
            .filter(NetworkTask::is_running)
            .collect())
    }

    fn arm(&self, task: &NetworkTask, strategy: DelayStrategy) {
        let delay = compute_delay(strategy, task, self.clock.now_millis());
        debug!(
            task_id = %task.id,
            scheduler_id = %task.scheduler_id,
            ?strategy,
            delay_ms = delay.as_millis(),
            "arming task alarm"
        );
        self.alarms.set_alarm(
            AlarmTrigger::After(delay),
            AlarmEvent::Task {
                task_id: task.id,
                scheduler_id: task.scheduler_id,
            },
        );
    }

    fn disarm(&self, id: TaskId) {
        self.alarms.cancel_alarm(AlarmId::Task(id));
    }

    /// Marks the task running under a fresh generation and fires it right
    /// away unless quiet hours are active.
    pub fn start(&self, task: &NetworkTask) -> SchedulerResult<NetworkTask> {
        self.tasks.update_running(task.id, true)?;
        let scheduler_id = self.tasks.stamp_scheduler_id(task.id)?;
        info!(task_id = %task.id, %scheduler_id, "starting task");

        if self.suspension.is_suspension_active_and_enabled()? && !self.suspension.is_running() {
            self.suspension.start(self)?;
        }

        let task = self.read(task.id)?;
        if self.suspension.is_suspended()? {
            debug!(task_id = %task.id, "suspended, alarm deferred until restart");
        } else {
            self.arm(&task, DelayStrategy::Immediate);
        }
        Ok(task)
    }

    /// Stops the task, interrupting its in-flight attempt. `failure_count`
    /// is kept.
    pub fn cancel(&self, task: &NetworkTask) -> SchedulerResult<()> {
        info!(task_id = %task.id, "cancelling task");
        self.tasks.update_running(task.id, false)?;
        self.disarm(task.id);

        let current = self.read(task.id)?;
        self.pool.cancel(current.scheduler_id);
        if current.scheduler_id != task.scheduler_id {
            self.pool.cancel(task.scheduler_id);
        }

        self.tasks.update_last_scheduled(task.id, NOT_SCHEDULED)?;
        Ok(())
    }

    /// Arms the task if and only if it is marked running.
    pub fn schedule(&self, task: &NetworkTask) -> SchedulerResult<()> {
        let Some(current) = self.tasks.read_task(task.id)? else {
            return Ok(());
        };
        if !current.running {
            debug!(task_id = %task.id, "not running, nothing to schedule");
            return Ok(());
        }
        if self.suspension.is_suspended()? {
            debug!(task_id = %task.id, "suspended, not scheduling");
            return Ok(());
        }
        self.arm(&current, DelayStrategy::LastScheduled);
        Ok(())
    }

    /// Re-arms the task for the generation it carries. A task that was
    /// restarted, stopped or deleted in the meantime is left alone.
    pub fn reschedule(&self, task: &NetworkTask, strategy: DelayStrategy) -> SchedulerResult<()> {
        let Some(current) = self.tasks.read_task(task.id)? else {
            debug!(task_id = %task.id, "task vanished, not rescheduling");
            return Ok(());
        };
        if current.scheduler_id != task.scheduler_id {
            debug!(
                task_id = %task.id,
                stale = %task.scheduler_id,
                current = %current.scheduler_id,
                "stale generation, not rescheduling"
            );
            return Ok(());
        }
        if !current.running {
            debug!(task_id = %task.id, "not running, not rescheduling");
            return Ok(());
        }
        if self.suspension.is_suspended()? {
            debug!(task_id = %task.id, "suspended, not rescheduling");
            return Ok(());
        }
        self.arm(&current, strategy);
        Ok(())
    }

    /// Ends one attempt: releases its instance and disarms the task while
    /// `running` is kept. The alarm of a newer generation stays armed.
    pub fn terminate(&self, task: &NetworkTask) -> SchedulerResult<()> {
        let Some(current) = self.tasks.read_task(task.id)? else {
            debug!(task_id = %task.id, "task vanished, nothing to terminate");
            return Ok(());
        };
        debug!(task_id = %task.id, scheduler_id = %task.scheduler_id, "terminating task");
        if current.scheduler_id == task.scheduler_id {
            self.disarm(task.id);
        }
        self.tasks.decrease_instances(task.id)?;
        Ok(())
    }

    /// Recovers after a process (re)start. Attempts of the previous process
    /// are presumed dead, overdue tasks fire at once.
    pub fn startup(&self) -> SchedulerResult<()> {
        let running = self.running_tasks()?;
        info!(running = running.len(), "task scheduler startup");

        for task in &running {
            self.tasks.reset_instances(task.id)?;
        }

        self.suspension.startup(self, self.clock.now())?;

        if self.suspension.is_suspended()? {
            info!("suspended at startup, task alarms deferred");
            return Ok(());
        }
        for task in &running {
            self.arm(task, DelayStrategy::LastScheduled);
        }
        Ok(())
    }

    /// Hard stop of every task.
    pub fn cancel_all(&self) -> SchedulerResult<()> {
        info!("cancelling all tasks");
        for task in self.tasks.read_tasks()? {
            self.tasks.update_running(task.id, false)?;
            self.disarm(task.id);
            self.tasks.update_last_scheduled(task.id, NOT_SCHEDULED)?;
        }
        self.pool.cancel_all();
        Ok(())
    }

    pub fn terminate_all(&self) -> SchedulerResult<()> {
        info!("terminating all tasks");
        for task in self.running_tasks()? {
            self.terminate(&task)?;
        }
        Ok(())
    }

    pub fn suspend_all(&self) -> SchedulerResult<()> {
        let running = self.running_tasks()?;
        info!(running = running.len(), "suspending all tasks");
        for task in &running {
            self.disarm(task.id);
        }
        Ok(())
    }

    pub fn on_suspension_alarm(&self, alarm: SuspensionAlarm) -> SchedulerResult<()> {
        self.suspension.on_alarm(self, alarm)
    }
}

impl TaskControl for TaskScheduler {
    fn suspend_all(&self) -> SchedulerResult<()> {
        TaskScheduler::suspend_all(self)
    }

    fn schedule_all(&self) -> SchedulerResult<()> {
        for task in self.running_tasks()? {
            self.schedule(&task)?;
        }
        Ok(())
    }
}
