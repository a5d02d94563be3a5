//! Network primitives consumed by the probes, with default
//! implementations on top of tokio and reqwest.

mod connectivity;
mod error;
mod http;
mod ping;
mod primitives;
mod resolve;
mod tcp;

pub use connectivity::ConfiguredConnectivity;
pub use error::NetworkError;
pub use http::{HttpDownloader, url_host};
pub use ping::{SystemPinger, parse_ping_reply};
pub use primitives::{
    Connectivity, Connector, DownloadControl, DownloadReport, DownloadRequest, Downloader,
    HttpStatus, PingReply, Pinger, Resolver,
};
pub use resolve::{SystemResolver, select_address};
pub use tcp::TcpConnector;
