#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use keepup_core::{
    AccessType, Interval, ManualClock, NetworkTask, Settings, SettingsHandle, TimeOfDay,
};
use keepup_scheduler::{ManualAlarms, ProcessPool, SuspensionScheduler, TaskScheduler};
use keepup_storage::{IntervalStore, MemoryStore, TaskStore};

pub const THRESHOLD_MS: u64 = 5_000;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub alarms: Arc<ManualAlarms>,
    pub clock: Arc<ManualClock>,
    pub pool: Arc<ProcessPool>,
    pub settings: SettingsHandle,
    pub scheduler: TaskScheduler,
}

pub fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, minute, second)
        .unwrap()
}

pub fn interval(start: &str, end: &str) -> Interval {
    Interval::new(
        start.parse::<TimeOfDay>().unwrap(),
        end.parse::<TimeOfDay>().unwrap(),
    )
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        let mut settings = Settings::default();
        settings.scheduler.utc_offset_minutes = Some(0);
        settings.scheduler.suspension_threshold_ms = THRESHOLD_MS;
        let settings = SettingsHandle::new(settings);

        let store = Arc::new(MemoryStore::new());
        let alarms = Arc::new(ManualAlarms::new());
        let clock = Arc::new(ManualClock::new(now));
        let pool = Arc::new(ProcessPool::new());

        let suspension = SuspensionScheduler::new(
            store.clone(),
            store.clone(),
            alarms.clone(),
            settings.clone(),
            clock.clone(),
        );
        let scheduler = TaskScheduler::new(
            store.clone(),
            alarms.clone(),
            pool.clone(),
            suspension,
            clock.clone(),
        );

        Self {
            store,
            alarms,
            clock,
            pool,
            settings,
            scheduler,
        }
    }

    pub fn with_intervals(self, intervals: &[Interval]) -> Self {
        for interval in intervals {
            self.store.insert_interval(interval.clone()).unwrap();
        }
        self
    }

    pub fn insert_task(&self) -> NetworkTask {
        self.store
            .insert_task(
                NetworkTask::builder("127.0.0.1")
                    .access_type(AccessType::Ping)
                    .interval_minutes(15)
                    .build(),
            )
            .unwrap()
    }

    pub fn task(&self, task: &NetworkTask) -> NetworkTask {
        self.store.read_task(task.id).unwrap().unwrap()
    }

    pub fn now_millis(&self) -> i64 {
        use keepup_core::Clock;
        self.clock.now_millis()
    }
}
