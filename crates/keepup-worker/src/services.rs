use std::sync::Arc;

use keepup_core::SettingsHandle;
use keepup_network::{
    ConfiguredConnectivity, Connectivity, Connector, Downloader, HttpDownloader, Pinger,
    Resolver, SystemPinger, SystemResolver, TcpConnector,
};

/// The network primitives an attempt is allowed to touch.
#[derive(Debug, Clone)]
pub struct NetworkServices {
    pub resolver: Arc<dyn Resolver>,
    pub pinger: Arc<dyn Pinger>,
    pub connector: Arc<dyn Connector>,
    pub downloader: Arc<dyn Downloader>,
    pub connectivity: Arc<dyn Connectivity>,
}

impl NetworkServices {
    /// Real sockets, the system `ping` binary and an HTTP client.
    pub fn system(settings: SettingsHandle) -> Self {
        Self {
            resolver: Arc::new(SystemResolver),
            pinger: Arc::new(SystemPinger::default()),
            connector: Arc::new(TcpConnector),
            downloader: Arc::new(HttpDownloader::default()),
            connectivity: Arc::new(ConfiguredConnectivity::new(settings)),
        }
    }
}
