use std::net::SocketAddr;

use keepup_core::{ProbeSettings, ProbeStats};
use keepup_network::Connector;
use keepup_scheduler::WorkToken;
use tokio::time::Instant;
use tracing::debug;

use crate::format::{counted, readable_duration, with_last_error};
use crate::probe::{ProbeOutcome, Target};

/// Opens and closes up to `settings.count` TCP connections.
pub async fn run_connect(
    connector: &dyn Connector,
    target: &Target,
    port: u16,
    settings: &ProbeSettings,
    token: &WorkToken,
) -> ProbeOutcome {
    let address = SocketAddr::new(target.ip, port);
    let mut stats = ProbeStats::default();
    let mut stopped = false;

    for _ in 0..settings.count {
        if token.is_cancelled() {
            stopped = true;
            break;
        }
        let started = Instant::now();
        let result = tokio::select! {
            _ = token.cancelled() => {
                stopped = true;
                break;
            }
            result = connector.connect(address, settings.timeout()) => result,
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        stats.attempts += 1;

        match result {
            Ok(()) => {
                debug!(%address, elapsed_ms, "connected");
                stats.successes += 1;
                stats.total_duration_ms += elapsed_ms;
                if settings.stop_on_success {
                    break;
                }
            }
            Err(err) => {
                debug!(%address, error = %err, "connect failed");
                if err.is_timeout() {
                    stats.timeouts += 1;
                } else {
                    stats.other_errors += 1;
                }
                stats.last_error = Some(err.describe());
            }
        }
    }

    let success = !stopped && stats.successes > 0;
    ProbeOutcome {
        success,
        message: connect_message(target, port, &stats, stopped),
        stats,
    }
}

/// Renders the log line of a connect run.
pub fn connect_message(target: &Target, port: u16, stats: &ProbeStats, stopped: bool) -> String {
    let counters = format!(
        "{}. {} successful. {} timed out. {} failed with an error.",
        counted(stats.attempts, "connection attempt", "connection attempts"),
        counted(stats.successes, "attempt", "attempts"),
        counted(stats.timeouts, "attempt", "attempts"),
        counted(stats.other_errors, "attempt", "attempts"),
    );

    let message = if stopped {
        format!("Connection to {target} port {port} was stopped. {counters}")
    } else {
        match stats.average_duration_ms() {
            Some(average) => format!(
                "Connection to {target} port {port} successful. {counters} {} average time.",
                readable_duration(average),
            ),
            None => format!("Connection to {target} port {port} failed. {counters}"),
        }
    };
    with_last_error(message, stats.last_error.as_deref())
}
