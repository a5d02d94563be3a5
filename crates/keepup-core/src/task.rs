use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{SchedulerId, TaskId};

/// Marker stored in `last_scheduled` while no timer is counting for a task.
pub const NOT_SCHEDULED: i64 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Ping,
    Connect,
    Download,
}

#[derive(Debug, Error)]
#[error("unknown access type {0}")]
pub struct UnknownAccessType(String);

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Ping => "ping",
            AccessType::Connect => "connect",
            AccessType::Download => "download",
        }
    }
}

impl Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = UnknownAccessType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ping" => Ok(AccessType::Ping),
            "connect" => Ok(AccessType::Connect),
            "download" => Ok(AccessType::Download),
            other => Err(UnknownAccessType(other.to_string())),
        }
    }
}

/// A user defined probe and its persisted scheduling state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkTask {
    pub id: TaskId,
    pub scheduler_id: SchedulerId,
    pub instances: u32,
    pub address: String,
    pub port: u16,
    /// `None` means no access type was configured; such a task always fails.
    pub access_type: Option<AccessType>,
    pub interval_minutes: u32,
    pub only_wifi: bool,
    pub notification: bool,
    pub running: bool,
    /// Epoch millis of the last attempt start, or [`NOT_SCHEDULED`].
    pub last_scheduled: i64,
    pub failure_count: u32,
}

impl NetworkTask {
    pub fn builder(address: impl Into<String>) -> NetworkTaskBuilder {
        NetworkTaskBuilder::new(address)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_scheduled(&self) -> bool {
        self.last_scheduled > 0
    }

    pub fn interval_millis(&self) -> i64 {
        i64::from(self.interval_minutes) * 60 * 1000
    }
}

impl Default for NetworkTask {
    fn default() -> Self {
        Self {
            id: TaskId(0),
            scheduler_id: SchedulerId(0),
            instances: 0,
            address: String::new(),
            port: 0,
            access_type: None,
            interval_minutes: 15,
            only_wifi: false,
            notification: false,
            running: false,
            last_scheduled: NOT_SCHEDULED,
            failure_count: 0,
        }
    }
}

#[derive(Debug)]
pub struct NetworkTaskBuilder {
    task: NetworkTask,
}

impl NetworkTaskBuilder {
    fn new(address: impl Into<String>) -> Self {
        Self {
            task: NetworkTask {
                address: address.into(),
                ..NetworkTask::default()
            },
        }
    }

    pub fn id(mut self, id: TaskId) -> Self {
        self.task.id = id;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.task.port = port;
        self
    }

    pub fn access_type(mut self, access_type: AccessType) -> Self {
        self.task.access_type = Some(access_type);
        self
    }

    pub fn interval_minutes(mut self, minutes: u32) -> Self {
        self.task.interval_minutes = minutes;
        self
    }

    pub fn only_wifi(mut self, only_wifi: bool) -> Self {
        self.task.only_wifi = only_wifi;
        self
    }

    pub fn notification(mut self, notification: bool) -> Self {
        self.task.notification = notification;
        self
    }

    pub fn running(mut self, running: bool) -> Self {
        self.task.running = running;
        self
    }

    pub fn last_scheduled(mut self, last_scheduled: i64) -> Self {
        self.task.last_scheduled = last_scheduled;
        self
    }

    pub fn build(self) -> NetworkTask {
        self.task
    }
}
