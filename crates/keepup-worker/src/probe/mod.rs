//! The three ways of exercising a target, plus the fallback for tasks
//! without an access type.

mod connect;
mod download;
mod ping;

use std::fmt;
use std::net::IpAddr;

use keepup_core::ProbeStats;

pub use connect::{connect_message, run_connect};
pub use download::{FileDisposition, dispose_file, download_message, run_download};
pub use ping::{ping_message, run_ping};

pub const NO_ACCESS_TYPE_MESSAGE: &str = "Network task has no access type. Nothing to do.";

/// A resolved probe destination. `host` is what the task was configured
/// with, `ip` what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub ip: IpAddr,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host == self.ip.to_string() {
            write!(f, "{}", self.host)
        } else {
            write!(f, "{} ({})", self.host, self.ip)
        }
    }
}

/// What a probe hands back to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub success: bool,
    pub message: String,
    pub stats: ProbeStats,
}

impl ProbeOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            stats: ProbeStats::default(),
        }
    }
}
