use std::fmt::Debug;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::NetworkError;

#[async_trait]
pub trait Resolver: Debug + Send + Sync {
    async fn resolve(&self, host: &str) -> Result<Vec<IpAddr>, NetworkError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PingReply {
    /// Bytes received in the echo reply.
    pub bytes: u32,
    pub time_ms: f64,
}

/// One ICMP echo round trip.
#[async_trait]
pub trait Pinger: Debug + Send + Sync {
    async fn ping(&self, address: IpAddr, timeout: Duration) -> Result<PingReply, NetworkError>;
}

/// One TCP connect attempt. The connection is closed right away.
#[async_trait]
pub trait Connector: Debug + Send + Sync {
    async fn connect(&self, address: SocketAddr, timeout: Duration) -> Result<(), NetworkError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub folder: PathBuf,
    /// Address the URL's host was resolved to. `None` leaves resolution to
    /// the downloader.
    pub address: Option<IpAddr>,
}

/// Signals a download observes while transferring.
#[derive(Clone)]
pub struct DownloadControl {
    /// Cancelled when the user or the scheduler stops the attempt.
    pub stop: CancellationToken,
    /// Reports whether the owning task is still the current generation.
    pub valid: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Debug for DownloadControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadControl")
            .field("stop", &self.stop)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatus {
    pub code: u16,
    pub message: String,
}

impl HttpStatus {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == 404
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadReport {
    /// `None` when no response was received.
    pub status: Option<HttpStatus>,
    /// The file written to, possibly partial.
    pub file: Option<PathBuf>,
    pub stopped: bool,
    /// The owning task became invalid during the transfer.
    pub invalid: bool,
    pub error: Option<NetworkError>,
    pub duration: Duration,
}

impl DownloadReport {
    pub fn completed(&self) -> bool {
        !self.stopped
            && !self.invalid
            && self.error.is_none()
            && self.status.as_ref().is_some_and(HttpStatus::is_success)
    }
}

#[async_trait]
pub trait Downloader: Debug + Send + Sync {
    async fn download(
        &self,
        request: &DownloadRequest,
        control: &DownloadControl,
    ) -> DownloadReport;
}

pub trait Connectivity: Debug + Send + Sync {
    fn is_connected(&self) -> bool;

    fn is_wifi_connected(&self) -> bool;
}
