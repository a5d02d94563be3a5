//! Quiet hours layered on top of the task scheduler.
//!
//! A single suspension alarm is armed at a time: at the start of the next
//! interval while tasks run, at the end of the current interval while they
//! are suspended. Every decision re-reads the intervals and the persisted
//! [`SchedulerState`] and evaluates "now" shifted by the configured
//! threshold, so an alarm delivered slightly early lands on the side of the
//! boundary it was armed for.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use keepup_core::{
    Clock, Interval, SchedulerState, SettingsHandle, find_current, find_next, next_occurrence,
};
use keepup_storage::{IntervalStore, SchedulerStateStore};
use tracing::{debug, info};

use crate::{
    AlarmEvent, AlarmId, AlarmService, AlarmTrigger, SchedulerResult, SuspensionAlarm, TaskControl,
};

#[derive(Debug, Default)]
struct Flags {
    running: bool,
    was_restarted: bool,
}

#[derive(Debug)]
pub struct SuspensionScheduler {
    intervals: Arc<dyn IntervalStore>,
    state: Arc<dyn SchedulerStateStore>,
    alarms: Arc<dyn AlarmService>,
    settings: SettingsHandle,
    clock: Arc<dyn Clock>,
    flags: Mutex<Flags>,
}

impl SuspensionScheduler {
    pub fn new(
        intervals: Arc<dyn IntervalStore>,
        state: Arc<dyn SchedulerStateStore>,
        alarms: Arc<dyn AlarmService>,
        settings: SettingsHandle,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            intervals,
            state,
            alarms,
            settings,
            clock,
            flags: Mutex::new(Flags::default()),
        }
    }

    fn flags(&self) -> MutexGuard<'_, Flags> {
        self.flags
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn threshold(&self) -> TimeDelta {
        let threshold = self.settings.get().scheduler.suspension_threshold();
        TimeDelta::from_std(threshold).unwrap_or(TimeDelta::zero())
    }

    pub fn suspension_threshold(&self) -> Duration {
        self.settings.get().scheduler.suspension_threshold()
    }

    /// Suspension is enabled and at least one interval is configured.
    pub fn is_suspension_active_and_enabled(&self) -> SchedulerResult<bool> {
        if !self.settings.get().scheduler.suspension_enabled {
            return Ok(false);
        }
        Ok(!self.intervals.read_intervals()?.is_empty())
    }

    pub fn is_suspended(&self) -> SchedulerResult<bool> {
        Ok(self.state.read_scheduler_state()?.suspended)
    }

    pub fn state(&self) -> SchedulerResult<SchedulerState> {
        Ok(self.state.read_scheduler_state()?)
    }

    /// Whether a suspension alarm is currently armed.
    pub fn is_running(&self) -> bool {
        self.flags().running
    }

    pub fn was_restarted(&self) -> bool {
        self.flags().was_restarted
    }

    pub fn find_current_suspend_interval(
        &self,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Option<Interval>> {
        let offset = self.settings.get().scheduler.offset()?;
        let intervals = self.intervals.read_intervals()?;
        let time = now.with_timezone(&offset).time();
        Ok(find_current(&intervals, time).cloned())
    }

    pub fn find_next_suspend_interval(
        &self,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Option<Interval>> {
        let offset = self.settings.get().scheduler.offset()?;
        let intervals = self.intervals.read_intervals()?;
        let time = now.with_timezone(&offset).time();
        Ok(find_next(&intervals, time).cloned())
    }

    /// Arms the alarm that ends the suspension at `interval`'s end.
    pub fn schedule_suspend(
        &self,
        interval: &Interval,
        now: DateTime<Utc>,
        mark_restarted: bool,
    ) -> SchedulerResult<DateTime<Utc>> {
        let offset = self.settings.get().scheduler.offset()?;
        let at = next_occurrence(interval.end, now, offset);
        info!(%interval, %at, "suspended until interval end");
        self.arm(at, mark_restarted);
        Ok(at)
    }

    /// Arms the alarm that begins the suspension at `interval`'s start.
    pub fn schedule_start(
        &self,
        interval: &Interval,
        now: DateTime<Utc>,
        mark_restarted: bool,
    ) -> SchedulerResult<DateTime<Utc>> {
        let offset = self.settings.get().scheduler.offset()?;
        let at = next_occurrence(interval.start, now, offset);
        info!(%interval, %at, "running until interval start");
        self.arm(at, mark_restarted);
        Ok(at)
    }

    fn arm(&self, at: DateTime<Utc>, restarted: bool) {
        self.alarms.set_alarm(
            AlarmTrigger::At(at),
            AlarmEvent::Suspension(SuspensionAlarm { restarted }),
        );
        self.flags().running = true;
    }

    fn disarm(&self) {
        self.alarms.cancel_alarm(AlarmId::Suspension);
        self.flags().running = false;
    }

    /// Starts the suspension timer unless it is already armed.
    pub fn start(&self, tasks: &dyn TaskControl) -> SchedulerResult<()> {
        if self.is_running() {
            return Ok(());
        }
        self.reconcile(tasks, self.clock.now())
    }

    /// Brings tasks and alarm in line with the intervals at `timestamp`.
    pub fn startup(
        &self,
        tasks: &dyn TaskControl,
        timestamp: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        self.reconcile(tasks, timestamp)
    }

    fn reconcile(&self, tasks: &dyn TaskControl, timestamp: DateTime<Utc>) -> SchedulerResult<()> {
        if !self.is_suspension_active_and_enabled()? {
            if self.is_suspended()? {
                info!("suspension no longer active, restarting tasks");
                self.restart(tasks)?;
            }
            self.disarm();
            return Ok(());
        }

        let probe = timestamp + self.threshold();
        match self.find_current_suspend_interval(probe)? {
            Some(interval) => {
                if !self.is_suspended()? {
                    self.suspend(tasks, timestamp)?;
                }
                self.schedule_suspend(&interval, timestamp, false)?;
            }
            None => {
                let restarted = if self.is_suspended()? {
                    self.restart(tasks)?;
                    true
                } else {
                    false
                };
                if let Some(next) = self.find_next_suspend_interval(probe)? {
                    self.schedule_start(&next, timestamp, restarted)?;
                }
            }
        }
        Ok(())
    }

    pub fn suspend(
        &self,
        tasks: &dyn TaskControl,
        timestamp: DateTime<Utc>,
    ) -> SchedulerResult<()> {
        info!(%timestamp, "suspending tasks");
        self.state
            .update_scheduler_state(SchedulerState::suspended_at(timestamp.timestamp_millis()))?;
        self.flags().was_restarted = false;
        tasks.suspend_all()
    }

    pub fn restart(&self, tasks: &dyn TaskControl) -> SchedulerResult<()> {
        let now = self.clock.now_millis();
        info!(timestamp = now, "restarting tasks");
        self.state
            .update_scheduler_state(SchedulerState::running_at(now))?;
        self.flags().was_restarted = true;
        tasks.schedule_all()
    }

    /// Turns suspension off, restarting the tasks if they are suspended.
    pub fn stop(&self, tasks: &dyn TaskControl) -> SchedulerResult<()> {
        info!("stopping suspension scheduler");
        self.disarm();
        if self.is_suspended()? {
            self.restart(tasks)?;
        }
        Ok(())
    }

    /// Re-reads the intervals after they changed.
    pub fn reset(&self, tasks: &dyn TaskControl) -> SchedulerResult<()> {
        info!("resetting suspension scheduler");
        self.disarm();
        self.reconcile(tasks, self.clock.now())
    }

    pub fn on_alarm(&self, tasks: &dyn TaskControl, alarm: SuspensionAlarm) -> SchedulerResult<()> {
        let was_restarted = {
            let mut flags = self.flags();
            flags.running = false;
            std::mem::take(&mut flags.was_restarted)
        };
        let now = self.clock.now();

        if alarm.restarted && was_restarted && !self.is_suspended()? {
            let probe = now + self.threshold();
            if self.find_current_suspend_interval(probe)?.is_none() {
                debug!("restart already processed, re-arming only");
                if let Some(next) = self.find_next_suspend_interval(probe)? {
                    self.schedule_start(&next, now, false)?;
                }
                return Ok(());
            }
        }

        self.reconcile(tasks, now)
    }
}
