// src/server/process.rs
use crate::error::{Error, Result};
use async_process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use futures::stream::{self, BoxStream, StreamExt};
use futures_lite::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Merged stdout and stderr of the server, one item per line.
pub type OutputLines = BoxStream<'static, std::io::Result<String>>;

/// How to launch the server process.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Script or binary to execute
    pub program: PathBuf,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory of the process
    pub working_dir: PathBuf,
    /// Number of spawn attempts
    pub attempts: u32,
    /// Delay before the second attempt, doubled afterwards
    pub backoff: Duration,
}

/// How a graceful stop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The server exited on its own after `stop`.
    Graceful(ExitStatus),
    /// The timeout expired and the process was killed.
    Killed,
}

/// Serialized writer for the server's standard input.
///
/// Clones share one pipe; each line is written and flushed while holding
/// the lock, so concurrent writers never interleave.
#[derive(Clone)]
pub struct StdinHandle {
    stdin: Arc<Mutex<ChildStdin>>,
}

impl StdinHandle {
    /// Writes `text` followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChildUnavailable`] if the process has gone away.
    pub async fn write_line(&self, text: &str) -> Result<()> {
        let mut data = text.as_bytes().to_vec();
        data.push(b'\n');

        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(&data)
            .await
            .map_err(|e| Error::ChildUnavailable(format!("Failed to write to stdin: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::ChildUnavailable(format!("Failed to flush stdin: {}", e)))?;
        Ok(())
    }
}

/// The running Minecraft server process
pub struct ServerProcess {
    /// Child process
    child: Child,
    /// Shared stdin writer
    stdin: StdinHandle,
    /// Output stream, until taken by the log reader
    output: Option<OutputLines>,
}

impl ServerProcess {
    /// Spawns the server with piped stdin and merged, line-split output.
    ///
    /// Transient spawn failures are retried with exponential backoff. A
    /// missing or non-executable program fails on the first attempt.
    pub async fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let program = resolve_program(&spec.program);
        if !program.exists() {
            return Err(Error::Spawn(format!(
                "Launch script {} does not exist",
                program.display()
            )));
        }

        let attempts = spec.attempts.max(1);
        let mut backoff = spec.backoff;
        let mut attempt = 1;

        let mut child = loop {
            match build_command(&program, spec).spawn() {
                Ok(child) => break child,
                Err(e)
                    if attempt < attempts
                        && !matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) =>
                {
                    tracing::warn!(attempt, error = %e, backoff_ms = backoff.as_millis() as u64, "Spawn failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(Error::Spawn(format!(
                        "Failed to start {}: {}",
                        program.display(),
                        e
                    )));
                }
            }
        };

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn("Failed to get stdin pipe from server process".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn("Failed to get stdout pipe from server process".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Spawn("Failed to get stderr pipe from server process".to_string()))?;

        let output = stream::select(BufReader::new(stdout).lines(), BufReader::new(stderr).lines()).boxed();

        tracing::info!(pid = child.id(), program = %program.display(), "Server process spawned");

        Ok(Self {
            child,
            stdin: StdinHandle {
                stdin: Arc::new(Mutex::new(stdin)),
            },
            output: Some(output),
        })
    }

    /// OS process id
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// A writer for the process's standard input.
    pub fn stdin(&self) -> StdinHandle {
        self.stdin.clone()
    }

    /// Takes the output stream. Only the first call returns it.
    pub fn take_output(&mut self) -> Result<OutputLines> {
        self.output
            .take()
            .ok_or_else(|| Error::Other("Server output has already been taken".to_string()))
    }

    /// Writes one line to the server's standard input.
    pub async fn write_line(&mut self, text: &str) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::ChildUnavailable("Server process has exited".to_string()));
        }
        self.stdin.write_line(text).await
    }

    /// Non-blocking check whether the process is still running.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_status(), Ok(None))
    }

    /// Sends `stop` and waits up to `timeout` for the process to exit, then kills it.
    pub async fn request_graceful_stop(&mut self, timeout: Duration) -> Result<StopOutcome> {
        if let Err(e) = self.stdin.write_line("stop").await {
            tracing::warn!(error = %e, "Could not send stop command, waiting for exit anyway");
        }

        let waited = tokio::time::timeout(timeout, self.child.status()).await;
        match waited {
            Ok(Ok(status)) => {
                tracing::info!(%status, "Server process exited");
                Ok(StopOutcome::Graceful(status))
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Server did not stop in time, killing it");
                self.force_kill().await?;
                Ok(StopOutcome::Killed)
            }
        }
    }

    /// Kills the process and reaps it.
    pub async fn force_kill(&mut self) -> Result<()> {
        if let Err(e) = self.child.kill() {
            // already exited
            if e.kind() != ErrorKind::InvalidInput {
                return Err(Error::Other(format!("Failed to kill server process: {}", e)));
            }
        }
        self.child.status().await?;
        Ok(())
    }
}

fn resolve_program(program: &Path) -> PathBuf {
    std::path::absolute(program).unwrap_or_else(|_| program.to_path_buf())
}

fn build_command(program: &Path, spec: &LaunchSpec) -> Command {
    let mut command = Command::new(program);
    command
        .args(&spec.args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}
