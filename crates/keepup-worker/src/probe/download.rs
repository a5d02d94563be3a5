use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use keepup_core::{DownloadSettings, ProbeStats};
use keepup_network::{DownloadControl, DownloadReport, DownloadRequest, Downloader};
use tracing::{debug, warn};

use crate::format::readable_duration;
use crate::probe::ProbeOutcome;

/// What happened to the file after the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDisposition {
    /// Nothing was written.
    None,
    Kept(PathBuf),
    Deleted,
    DeletionFailed(PathBuf),
}

/// Keeps or removes the downloaded file. Partial files are always removed.
pub async fn dispose_file(file: Option<&Path>, keep: bool) -> FileDisposition {
    let Some(file) = file else {
        return FileDisposition::None;
    };
    if keep {
        return FileDisposition::Kept(file.to_path_buf());
    }
    match tokio::fs::remove_file(file).await {
        Ok(()) => FileDisposition::Deleted,
        Err(err) if err.kind() == ErrorKind::NotFound => FileDisposition::None,
        Err(err) => {
            warn!(file = %file.display(), error = %err, "failed to delete downloaded file");
            FileDisposition::DeletionFailed(file.to_path_buf())
        }
    }
}

pub async fn run_download(
    downloader: &dyn Downloader,
    url: &str,
    address: Option<IpAddr>,
    settings: &DownloadSettings,
    control: &DownloadControl,
) -> ProbeOutcome {
    let request = DownloadRequest {
        url: url.to_string(),
        folder: settings.folder.clone(),
        address,
    };
    let report = downloader.download(&request, control).await;
    let success = report.completed();
    debug!(
        url,
        success,
        stopped = report.stopped,
        invalid = report.invalid,
        "download finished"
    );

    let disposition = dispose_file(report.file.as_deref(), success && settings.keep).await;

    let duration_ms = report.duration.as_secs_f64() * 1000.0;
    let stats = ProbeStats {
        attempts: 1,
        successes: u32::from(success),
        timeouts: u32::from(report.error.as_ref().is_some_and(|err| err.is_timeout())),
        other_errors: u32::from(report.error.as_ref().is_some_and(|err| !err.is_timeout())),
        total_duration_ms: if success { duration_ms } else { 0.0 },
        last_error: report.error.as_ref().map(|err| err.describe()),
    };

    ProbeOutcome {
        success,
        message: download_message(url, &report, &disposition),
        stats,
    }
}

/// Renders the log line of a download.
pub fn download_message(
    url: &str,
    report: &DownloadReport,
    disposition: &FileDisposition,
) -> String {
    let mut message = if report.completed() {
        let mut message = format!("Successfully downloaded {url}.");
        match disposition {
            FileDisposition::Kept(path) => {
                message.push_str(&format!(" The file was stored as {}.", path.display()));
            }
            FileDisposition::Deleted => message.push_str(" The file was deleted."),
            FileDisposition::DeletionFailed(path) => {
                message.push_str(&format!(" Deletion of the file {} failed.", path.display()));
            }
            FileDisposition::None => {}
        }
        message
    } else {
        let mut message = if report.stopped {
            format!("The download from {url} was stopped.")
        } else if report.invalid {
            format!(
                "The download from {url} was interrupted. The network task is no longer valid."
            )
        } else if let Some(err) = &report.error {
            format!("The download from {url} failed. {}", err.describe())
        } else if let Some(status) = report.status.as_ref().filter(|s| s.is_not_found()) {
            format!(
                "The download from {url} failed. Server return code {} {}.",
                status.code, status.message
            )
        } else if let Some(status) = &report.status {
            format!(
                "The download from {url} failed. Unexpected server return code {} {}.",
                status.code, status.message
            )
        } else {
            format!("The download from {url} failed.")
        };
        match disposition {
            FileDisposition::Deleted => {
                message.push_str(" The partially downloaded file was deleted.");
            }
            FileDisposition::DeletionFailed(path) => message.push_str(&format!(
                " The partially downloaded file {} remains, \
                 deletion of the partially downloaded file failed.",
                path.display()
            )),
            FileDisposition::Kept(_) | FileDisposition::None => {}
        }
        message
    };
    let duration_ms = report.duration.as_secs_f64() * 1000.0;
    message.push_str(&format!(" Duration: {}.", readable_duration(duration_ms)));
    message
}
