use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{NetworkError, PingReply, Pinger};

/// Sends a single echo request through the system `ping` binary.
#[derive(Debug, Clone)]
pub struct SystemPinger {
    program: String,
}

impl Default for SystemPinger {
    fn default() -> Self {
        Self {
            program: "ping".into(),
        }
    }
}

impl SystemPinger {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Pinger for SystemPinger {
    async fn ping(&self, address: IpAddr, timeout: Duration) -> Result<PingReply, NetworkError> {
        let wait_secs = timeout.as_secs().max(1);
        let mut command = Command::new(&self.program);
        if address.is_ipv6() {
            command.arg("-6");
        }
        command
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(wait_secs.to_string())
            .arg(address.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if let Some(reply) = parse_ping_reply(&stdout) {
            debug!(%address, time_ms = reply.time_ms, "ping reply");
            return Ok(reply);
        }

        if output.status.success() {
            return Err(NetworkError::Io(format!(
                "unrecognised ping output: {}",
                stdout.trim()
            )));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.trim().is_empty() {
            Err(NetworkError::Timeout(format!(
                "no reply from {address} within {wait_secs} s"
            )))
        } else {
            Err(NetworkError::Unreachable(stderr.trim().to_string()))
        }
    }
}

/// Parses the first reply line of `ping` output, e.g.
/// `64 bytes from 127.0.0.1: icmp_seq=1 ttl=64 time=0.045 ms`.
pub fn parse_ping_reply(output: &str) -> Option<PingReply> {
    let line = output.lines().find(|line| line.contains("bytes from"))?;
    let bytes = line.split_whitespace().next()?.parse().ok()?;
    let time = line
        .split_whitespace()
        .find_map(|field| field.strip_prefix("time="))?;
    let time_ms = time.trim_end_matches("ms").parse().ok()?;
    Some(PingReply { bytes, time_ms })
}
