#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use keepup_core::{AccessType, LogEntry, ManualClock, NetworkTask, Settings, SettingsHandle};
use keepup_network::{
    ConfiguredConnectivity, Connector, DownloadControl, DownloadReport, DownloadRequest,
    Downloader, NetworkError, PingReply, Pinger, Resolver,
};
use keepup_scheduler::{ManualAlarms, ProcessPool, SuspensionScheduler, TaskScheduler};
use keepup_storage::{MemoryStore, TaskStore};
use keepup_worker::{NetworkServices, NotificationSink, TaskWorker};

pub const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[derive(Debug, Default)]
pub struct FakeResolver {
    pub addresses: Mutex<Option<Vec<IpAddr>>>,
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, NetworkError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        match self.addresses.lock().unwrap().clone() {
            Some(addresses) => Ok(addresses),
            None => Err(NetworkError::Resolution(format!("unknown host {host}"))),
        }
    }
}

/// Replays scripted replies, then answers every further request with
/// `fallback`.
#[derive(Debug)]
pub struct FakePinger {
    pub script: Mutex<VecDeque<Result<PingReply, NetworkError>>>,
    pub fallback: PingReply,
    pub calls: AtomicU32,
    pub panic_with: Option<&'static str>,
}

impl Default for FakePinger {
    fn default() -> Self {
        Self {
            script: Mutex::default(),
            fallback: PingReply {
                bytes: 64,
                time_ms: 12.5,
            },
            calls: AtomicU32::new(0),
            panic_with: None,
        }
    }
}

#[async_trait]
impl Pinger for FakePinger {
    async fn ping(&self, _address: IpAddr, _timeout: Duration) -> Result<PingReply, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.panic_with {
            panic!("{reason}");
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(self.fallback))
    }
}

#[derive(Debug, Default)]
pub struct FakeConnector {
    pub script: Mutex<VecDeque<Result<(), NetworkError>>>,
    pub connected_to: Mutex<Vec<SocketAddr>>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, address: SocketAddr, _timeout: Duration) -> Result<(), NetworkError> {
        self.connected_to.lock().unwrap().push(address);
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

/// Returns `report`, writing `contents` to the reported file first when
/// both are set.
#[derive(Debug, Default)]
pub struct FakeDownloader {
    pub report: Mutex<DownloadReport>,
    pub contents: Option<Vec<u8>>,
    pub requests: Mutex<Vec<DownloadRequest>>,
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(
        &self,
        request: &DownloadRequest,
        control: &DownloadControl,
    ) -> DownloadReport {
        self.requests.lock().unwrap().push(request.clone());
        let mut report = self.report.lock().unwrap().clone();
        if let (Some(file), Some(contents)) = (&report.file, &self.contents) {
            std::fs::write(file, contents).unwrap();
        }
        if control.stop.is_cancelled() {
            report.stopped = true;
        }
        report
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub notified: Mutex<Vec<LogEntry>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.notified.lock().unwrap().len()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, _task: &NetworkTask, entry: &LogEntry) {
        self.notified.lock().unwrap().push(entry.clone());
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub alarms: Arc<ManualAlarms>,
    pub clock: Arc<ManualClock>,
    pub pool: Arc<ProcessPool>,
    pub settings: SettingsHandle,
    pub scheduler: Arc<TaskScheduler>,
    pub resolver: Arc<FakeResolver>,
    pub pinger: Arc<FakePinger>,
    pub connector: Arc<FakeConnector>,
    pub downloader: Arc<FakeDownloader>,
    pub notifier: Arc<RecordingNotifier>,
    pub worker: Arc<TaskWorker>,
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
}

#[derive(Default)]
pub struct Fakes {
    pub pinger: FakePinger,
    pub connector: FakeConnector,
    pub downloader: FakeDownloader,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Fakes::default(), |_| {})
    }

    pub fn with(fakes: Fakes, configure: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::default();
        settings.scheduler.utc_offset_minutes = Some(0);
        configure(&mut settings);
        let settings = SettingsHandle::new(settings);

        let store = Arc::new(MemoryStore::new());
        let alarms = Arc::new(ManualAlarms::new());
        let clock = Arc::new(ManualClock::new(at(12, 0)));
        let pool = Arc::new(ProcessPool::new());

        let suspension = SuspensionScheduler::new(
            store.clone(),
            store.clone(),
            alarms.clone(),
            settings.clone(),
            clock.clone(),
        );
        let scheduler = Arc::new(TaskScheduler::new(
            store.clone(),
            alarms.clone(),
            pool.clone(),
            suspension,
            clock.clone(),
        ));

        let resolver = Arc::new(FakeResolver::default());
        let pinger = Arc::new(fakes.pinger);
        let connector = Arc::new(fakes.connector);
        let downloader = Arc::new(fakes.downloader);
        let notifier = Arc::new(RecordingNotifier::default());
        let network = NetworkServices {
            resolver: resolver.clone(),
            pinger: pinger.clone(),
            connector: connector.clone(),
            downloader: downloader.clone(),
            connectivity: Arc::new(ConfiguredConnectivity::new(settings.clone())),
        };
        let worker = Arc::new(TaskWorker::new(
            store.clone(),
            store.clone(),
            scheduler.clone(),
            network,
            notifier.clone(),
            settings.clone(),
            clock.clone(),
        ));

        Self {
            store,
            alarms,
            clock,
            pool,
            settings,
            scheduler,
            resolver,
            pinger,
            connector,
            downloader,
            notifier,
            worker,
        }
    }

    /// Inserts and starts a task, returning it with its live generation.
    pub fn start(&self, task: NetworkTask) -> NetworkTask {
        let task = self.store.insert_task(task).unwrap();
        self.scheduler.start(&task).unwrap()
    }

    pub fn start_ping(&self) -> NetworkTask {
        self.start(
            NetworkTask::builder("127.0.0.1")
                .access_type(AccessType::Ping)
                .interval_minutes(15)
                .notification(true)
                .build(),
        )
    }

    pub fn resolve_to(&self, addresses: Vec<IpAddr>) {
        *self.resolver.addresses.lock().unwrap() = Some(addresses);
    }

    pub fn task(&self, task: &NetworkTask) -> NetworkTask {
        self.store.read_task(task.id).unwrap().unwrap()
    }

    pub fn now_millis(&self) -> i64 {
        use keepup_core::Clock;
        self.clock.now_millis()
    }
}
