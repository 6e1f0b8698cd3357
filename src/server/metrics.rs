//! Performance and resource figures shown by the console.

use crate::error::{Error, Result};
use crate::server::process::StdinHandle;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use sysinfo::{Pid, System};
use tokio::sync::broadcast;

/// Command that makes the server print tick statistics.
pub const TICK_QUERY_COMMAND: &str = "tick query";

/// Upper bound on output lines inspected for the tick answer.
pub const TICK_QUERY_MAX_LINES: usize = 15;

/// Ticks per second of a healthy server.
pub const MAX_TPS: f64 = 20.0;

/// TPS and MSPT from one `tick query` exchange.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickStats {
    /// Ticks per second, at most [`MAX_TPS`]
    pub tps: f64,
    /// Milliseconds per tick
    pub mspt: f64,
}

impl TickStats {
    /// Derives TPS from MSPT.
    pub fn from_mspt(mspt: f64) -> Self {
        let tps = if mspt > 0.0 {
            (1000.0 / mspt).min(MAX_TPS)
        } else {
            MAX_TPS
        };
        Self { tps, mspt }
    }
}

/// Extracts MSPT from an `Average time per tick: <ms>ms` line.
pub fn parse_mspt(line: &str) -> Option<f64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"Average time per tick: ([\d.]+)ms").expect("static regex is valid")
    });
    pattern.captures(line)?.get(1)?.as_str().parse().ok()
}

/// Sends `tick query` and scans the following output for the answer.
///
/// `lines` must be subscribed before the call so no answer line is missed.
/// Gives up after [`TICK_QUERY_MAX_LINES`] lines or `timeout`, returning
/// zeroed stats.
pub async fn query_tick_stats(
    stdin: &StdinHandle,
    mut lines: broadcast::Receiver<String>,
    timeout: Duration,
) -> Result<TickStats> {
    stdin.write_line(TICK_QUERY_COMMAND).await?;

    let scan = async {
        let mut seen = 0;
        while seen < TICK_QUERY_MAX_LINES {
            match lines.recv().await {
                Ok(line) => {
                    seen += 1;
                    if line.contains("Average time per tick:") {
                        return parse_mspt(&line).map(TickStats::from_mspt);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    seen += skipped as usize;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
        None
    };

    match tokio::time::timeout(timeout, scan).await {
        Ok(Some(stats)) => Ok(stats),
        Ok(None) => {
            tracing::debug!("No tick statistics in server output");
            Ok(TickStats::default())
        }
        Err(_) => {
            tracing::debug!(timeout_secs = timeout.as_secs(), "Timed out waiting for tick statistics");
            Ok(TickStats::default())
        }
    }
}

/// Resident memory of a process in MB, `None` if it cannot be inspected.
pub fn used_ram_mb(pid: u32) -> Option<f64> {
    let mut system = System::new();
    let pid = Pid::from_u32(pid);
    if !system.refresh_process(pid) {
        return None;
    }
    system
        .process(pid)
        .map(|process| process.memory() as f64 / (1024.0 * 1024.0))
}

/// Total size of all files below `dir`, in bytes.
pub fn directory_size(dir: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            total += directory_size(&entry.path())?;
        } else if file_type.is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Formats a byte count as `x.xx GB` above 1 GiB, else `x.xx MB`.
pub fn format_size(bytes: u64) -> String {
    const MIB: f64 = 1024.0 * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f > GIB {
        format!("{:.2} GB", bytes_f / GIB)
    } else {
        format!("{:.2} MB", bytes_f / MIB)
    }
}

/// Size of the world directory, `None` if it does not exist.
pub async fn world_size(dir: &Path) -> Option<String> {
    if !dir.exists() {
        return None;
    }
    let dir = dir.to_path_buf();
    let size = tokio::task::spawn_blocking(move || directory_size(&dir))
        .await
        .map_err(|e| Error::Other(format!("World size task failed: {}", e)))
        .and_then(|result| result);

    match size {
        Ok(bytes) => Some(format_size(bytes)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to compute world size");
            None
        }
    }
}
