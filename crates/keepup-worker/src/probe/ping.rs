use keepup_core::{ProbeSettings, ProbeStats};
use keepup_network::Pinger;
use keepup_scheduler::WorkToken;
use tokio::time::Instant;
use tracing::debug;

use crate::format::{counted, percent, readable_duration, with_last_error};
use crate::probe::{ProbeOutcome, Target};

/// Sends up to `settings.count` echo requests, one after another.
pub async fn run_ping(
    pinger: &dyn Pinger,
    target: &Target,
    settings: &ProbeSettings,
    token: &WorkToken,
) -> ProbeOutcome {
    let mut stats = ProbeStats::default();
    let mut bytes = 0;
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
            result = pinger.ping(target.ip, settings.timeout()) => result,
        };
        stats.attempts += 1;

        match result {
            Ok(reply) => {
                debug!(ip = %target.ip, time_ms = reply.time_ms, "echo reply");
                stats.successes += 1;
                stats.total_duration_ms += reply.time_ms;
                bytes = reply.bytes;
                if settings.stop_on_success {
                    break;
                }
            }
            Err(err) => {
                debug!(ip = %target.ip, elapsed = ?started.elapsed(), error = %err, "echo failed");
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
        message: ping_message(target, &stats, bytes, stopped),
        stats,
    }
}

/// Renders the log line of a ping run.
pub fn ping_message(target: &Target, stats: &ProbeStats, bytes: u32, stopped: bool) -> String {
    let loss = if stats.attempts == 0 {
        0.0
    } else {
        f64::from(stats.failures()) * 100.0 / f64::from(stats.attempts)
    };
    let counters = format!(
        "{} transmitted. {} received. {} packet loss.",
        counted(stats.attempts, "packet", "packets"),
        counted(stats.successes, "packet", "packets"),
        percent(loss),
    );

    let message = if stopped {
        format!("Pinging {target} was stopped. {counters}")
    } else {
        match stats.average_duration_ms() {
            Some(average) => format!(
                "Pinged {target} successfully. {} received per packet. {counters} {} average time.",
                counted(bytes, "byte", "bytes"),
                readable_duration(average),
            ),
            None => format!("Pinging {target} failed. {counters}"),
        }
    };
    with_last_error(message, stats.last_error.as_deref())
}
