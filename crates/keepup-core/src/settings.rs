//! Runtime settings, loaded from a TOML file.
//!
//! Every section has defaults so an empty file is a valid configuration.
//! [`SettingsHandle`] is the shared, mutable view handed to the schedulers
//! and the worker: a user may toggle suspension or change probe settings
//! while tasks are running, and the next decision picks up the change.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AccessType, Interval, NetworkTask};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid utc offset {0} minutes")]
    Offset(i32),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scheduler: SchedulerSettings,
    pub ping: ProbeSettings,
    pub connect: ProbeSettings,
    pub download: DownloadSettings,
    pub notification: NotificationSettings,
    pub network: NetworkSettings,
    pub log: LogSettings,
    pub storage: StorageSettings,
    pub intervals: Vec<Interval>,
    pub tasks: Vec<TaskSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub suspension_enabled: bool,
    /// Tolerance applied around interval boundaries to absorb early or
    /// late timer delivery.
    pub suspension_threshold_ms: u64,
    /// Offset used to turn instants into times of day. Falls back to the
    /// host's current local offset.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            suspension_enabled: true,
            suspension_threshold_ms: 5_000,
            utc_offset_minutes: None,
        }
    }
}

impl SchedulerSettings {
    pub fn suspension_threshold(&self) -> Duration {
        Duration::from_millis(self.suspension_threshold_ms)
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        match self.utc_offset_minutes {
            Some(minutes) => {
                FixedOffset::east_opt(minutes * 60).ok_or(ConfigError::Offset(minutes))
            }
            None => Ok(Local::now().offset().fix()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub count: u32,
    pub stop_on_success: bool,
    pub timeout_secs: u64,
    pub max_instances: u32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            count: 3,
            stop_on_success: false,
            timeout_secs: 5,
            max_instances: 1,
        }
    }
}

impl ProbeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub folder: PathBuf,
    /// Keep the downloaded file instead of deleting it afterwards.
    pub keep: bool,
    pub max_instances: u32,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("downloads"),
            keep: false,
            max_instances: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPolicy {
    /// Notify once the consecutive failure count reaches the threshold.
    #[default]
    Failure,
    /// Notify whenever success flips to failure or back.
    Change,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub policy: NotificationPolicy,
    pub after_failures: u32,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            policy: NotificationPolicy::Failure,
            after_failures: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub prefer_ipv6: bool,
    pub connected: bool,
    pub wifi_connected: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            prefer_ipv6: false,
            connected: true,
            wifi_connected: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub filter: Option<String>,
    pub max_entries_per_task: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: None,
            max_entries_per_task: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("keepup-state.json"),
        }
    }
}

/// A task declared in the config file, inserted on first run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSeed {
    pub address: String,
    #[serde(default)]
    pub port: u16,
    pub access_type: Option<AccessType>,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default)]
    pub only_wifi: bool,
    #[serde(default)]
    pub notification: bool,
    #[serde(default)]
    pub start: bool,
}

fn default_interval_minutes() -> u32 {
    15
}

impl TaskSeed {
    pub fn to_task(&self) -> NetworkTask {
        let mut builder = NetworkTask::builder(self.address.clone())
            .port(self.port)
            .interval_minutes(self.interval_minutes)
            .only_wifi(self.only_wifi)
            .notification(self.notification);
        if let Some(access_type) = self.access_type {
            builder = builder.access_type(access_type);
        }
        builder.build()
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn max_instances(&self, access_type: Option<AccessType>) -> u32 {
        match access_type {
            Some(AccessType::Ping) => self.ping.max_instances,
            Some(AccessType::Connect) => self.connect.max_instances,
            Some(AccessType::Download) => self.download.max_instances,
            None => 1,
        }
    }
}

/// Shared view of the current [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsHandle {
    inner: Arc<RwLock<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Snapshot of the current settings.
    pub fn get(&self) -> Settings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut Settings)) {
        match self.inner.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
