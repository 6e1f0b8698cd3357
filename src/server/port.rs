//! Port reclaim for hard starts.
//!
//! Looks up the processes holding a TCP port with `lsof` and kills them.
//! This runs before spawning, never against the runner's own child.

use crate::error::{Error, Result};
use async_process::Command;

/// Parses `lsof -t` output into process ids.
pub fn parse_pids(output: &str) -> Vec<u32> {
    output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// Kills every process bound to `port` and returns their pids.
///
/// An empty list means nothing was listening.
pub async fn kill_process_on_port(port: u16) -> Result<Vec<u32>> {
    let output = Command::new("lsof")
        .arg("-t")
        .arg(format!("-i:{}", port))
        .output()
        .await
        .map_err(|e| Error::Other(format!("Failed to run lsof: {}", e)))?;

    let pids = parse_pids(&String::from_utf8_lossy(&output.stdout));
    for pid in &pids {
        kill_pid(*pid)?;
        tracing::warn!(pid, port, "Killed process holding server port");
    }
    Ok(pids)
}

#[cfg(unix)]
fn kill_pid(pid: u32) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| Error::Other(format!("Invalid pid {}", pid)))?;
    kill(Pid::from_raw(raw), Signal::SIGKILL)
        .map_err(|e| Error::Other(format!("Failed to kill process {}: {}", pid, e)))
}

#[cfg(not(unix))]
fn kill_pid(pid: u32) -> Result<()> {
    let status = std::process::Command::new("taskkill")
        .args(["/F", "/PID", &pid.to_string()])
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Other(format!("taskkill failed for process {}", pid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pids() {
        assert_eq!(parse_pids("1234\n5678\n"), vec![1234, 5678]);
        assert!(parse_pids("").is_empty());
        assert_eq!(parse_pids("42\nnot-a-pid\n"), vec![42]);
    }
}
