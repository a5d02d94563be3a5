use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::{
    DownloadControl, DownloadReport, DownloadRequest, Downloader, HttpStatus, NetworkError,
};

const DEFAULT_FILE_NAME: &str = "download";

#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Requests with a resolved address get a client that connects to it
    /// directly instead of looking the host up again.
    fn client_for(&self, request: &DownloadRequest) -> Result<reqwest::Client, reqwest::Error> {
        let (Some(address), Some(host)) = (request.address, url_host(&request.url)) else {
            return Ok(self.client.clone());
        };
        if host.parse::<std::net::IpAddr>().is_ok() {
            return Ok(self.client.clone());
        }
        debug!(%host, %address, "pinning download to resolved address");
        reqwest::Client::builder()
            .no_proxy()
            .resolve(&host, SocketAddr::new(address, 0))
            .build()
    }
}

/// The host part of `url`, without the brackets around IPv6 literals.
pub fn url_host(url: &str) -> Option<String> {
    let url = reqwest::Url::parse(url).ok()?;
    let host = url.host_str()?;
    Some(host.trim_start_matches('[').trim_end_matches(']').to_string())
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(
        &self,
        request: &DownloadRequest,
        control: &DownloadControl,
    ) -> DownloadReport {
        let started = Instant::now();
        let mut report = DownloadReport::default();

        let client = match self.client_for(request) {
            Ok(client) => client,
            Err(err) => {
                report.error = Some(err.into());
                report.duration = started.elapsed();
                return report;
            }
        };

        let response = tokio::select! {
            _ = control.stop.cancelled() => {
                report.stopped = true;
                report.duration = started.elapsed();
                return report;
            }
            response = client.get(&request.url).send() => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                report.error = Some(err.into());
                report.duration = started.elapsed();
                return report;
            }
        };

        let status = response.status();
        report.status = Some(HttpStatus {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
        });
        if !status.is_success() {
            report.duration = started.elapsed();
            return report;
        }

        if let Err(err) = transfer(response, request, control, &mut report).await {
            warn!(url = %request.url, error = %err, "download transfer failed");
            report.error = Some(err);
        }
        report.duration = started.elapsed();
        debug!(
            url = %request.url,
            stopped = report.stopped,
            invalid = report.invalid,
            "download finished"
        );
        report
    }
}

async fn transfer(
    response: reqwest::Response,
    request: &DownloadRequest,
    control: &DownloadControl,
    report: &mut DownloadReport,
) -> Result<(), NetworkError> {
    let folder = request.folder.clone();
    let name = file_name(&request.url).to_string();
    let (file, path) = tokio::task::spawn_blocking(move || create_target(&folder, &name))
        .await
        .map_err(|err| NetworkError::Io(err.to_string()))??;
    let mut file = File::from_std(file);
    report.file = Some(path);

    let mut body = response.bytes_stream();
    loop {
        let chunk = tokio::select! {
            _ = control.stop.cancelled() => {
                report.stopped = true;
                break;
            }
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        file.write_all(&chunk?).await?;
        if !(control.valid)() {
            report.invalid = true;
            break;
        }
    }
    file.flush().await?;
    Ok(())
}

fn file_name(url: &str) -> &str {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .unwrap_or(DEFAULT_FILE_NAME)
}

/// Creates a file named after `name` that no other attempt writes to, e.g.
/// `index-a81Kx2.html` for `index.html`.
fn create_target(folder: &Path, name: &str) -> io::Result<(std::fs::File, PathBuf)> {
    std::fs::create_dir_all(folder)?;
    let name = Path::new(name);
    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(DEFAULT_FILE_NAME);
    let extension = name
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| format!(".{extension}"))
        .unwrap_or_default();
    tempfile::Builder::new()
        .prefix(&format!("{stem}-"))
        .suffix(&extension)
        .tempfile_in(folder)?
        .keep()
        .map_err(|err| err.error)
}
