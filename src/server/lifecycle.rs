use crate::config::{LaunchScript, PropertiesFile, RunnerConfig};
use crate::error::{Error, Result};
use crate::notify::{Notifier, ServerEvent};
use crate::server::address::AddressResolver;
use crate::server::metrics::{self, TickStats};
use crate::server::port;
use crate::server::process::{LaunchSpec, ServerProcess, StdinHandle, StopOutcome};
use crate::server::reader::LogReader;
use crate::server::state::{Generation, SharedState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;

/// Capacity of the raw output fan-out.
const OUTPUT_CHANNEL_CAPACITY: usize = 1024;

/// How long a stopped run's reader may keep draining before it is aborted.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval of the exit watcher once the output has closed.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new process was spawned.
    Started {
        /// OS process id
        pid: u32,
        /// Generation of the new run
        generation: Generation,
    },
    /// A process was already running; nothing changed.
    AlreadyRunning,
}

/// Result of a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    /// The process was stopped.
    Stopped(StopOutcome),
    /// No process was running.
    NotRunning,
}

/// One spawned server and the reader consuming its output.
struct ActiveRun {
    process: ServerProcess,
    generation: Generation,
    reader: JoinHandle<()>,
}

/// Server lifecycle manager
///
/// Owns the single server process. Every transition (start, hard start,
/// stop, restart) runs while holding the run lock, so the liveness check
/// and the spawn that follows it can never interleave with another
/// transition. Each run also gets an exit watcher that tears it down when
/// the process exits on its own.
pub struct LifecycleManager {
    /// Runner configuration
    config: Arc<RunnerConfig>,
    /// Shared server state
    state: SharedState,
    /// Event sink
    notifier: Arc<dyn Notifier>,
    /// Address lookup handed to readers
    resolver: Arc<dyn AddressResolver>,
    /// Raw output fan-out shared by all generations
    lines: broadcast::Sender<String>,
    /// The current run, if any
    run: Arc<Mutex<Option<ActiveRun>>>,
}

impl LifecycleManager {
    /// Create a new lifecycle manager
    pub fn new(
        config: Arc<RunnerConfig>,
        state: SharedState,
        notifier: Arc<dyn Notifier>,
        resolver: Arc<dyn AddressResolver>,
    ) -> Self {
        let (lines, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        Self {
            config,
            state,
            notifier,
            resolver,
            lines,
            run: Arc::new(Mutex::new(None)),
        }
    }

    /// Shared state handle
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Receives every output line from now on.
    pub fn subscribe_output(&self) -> broadcast::Receiver<String> {
        self.lines.subscribe()
    }

    /// Starts the server unless it is already running.
    ///
    /// With `hard`, whatever holds the configured port is killed first.
    /// Returns as soon as the process is spawned; readiness is reported later
    /// by the log reader.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, hard: bool) -> Result<StartOutcome> {
        let mut run = self.run.lock().await;
        self.start_locked(&mut run, hard).await
    }

    /// Stops the server, waiting for the process to exit.
    ///
    /// Unless `silent`, a [`ServerEvent::ServerStopped`] notification follows
    /// the transition to stopped.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self, silent: bool) -> Result<StopResult> {
        let mut run = self.run.lock().await;
        self.stop_locked(&mut run, silent).await
    }

    /// Restarts a running server, or starts a stopped one.
    #[tracing::instrument(skip(self))]
    pub async fn restart(&self) -> Result<StartOutcome> {
        let mut run = self.run.lock().await;

        if !Self::is_alive(&mut run) {
            return self.start_locked(&mut run, false).await;
        }

        tracing::info!("Restarting server");
        self.stop_locked(&mut run, true).await?;
        let outcome = self.start_locked(&mut run, false).await?;
        self.dispatch(ServerEvent::ServerRestarted).await;
        self.state.reset_online_players();
        Ok(outcome)
    }

    /// Whether a live server process exists.
    ///
    /// A run whose process exited on its own is torn down here, so the
    /// state reads stopped from then on.
    pub async fn is_running(&self) -> bool {
        let mut run = self.run.lock().await;
        self.reap_if_dead(&mut run).await;
        run.is_some()
    }

    /// OS process id of the running server.
    pub async fn pid(&self) -> Option<u32> {
        let mut run = self.run.lock().await;
        self.reap_if_dead(&mut run).await;
        run.as_ref().map(|active| active.process.pid())
    }

    /// Forwards a raw command line to the server.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        let mut run = self.run.lock().await;
        let Some(active) = run.as_mut() else {
            return Err(Error::NotRunning);
        };
        if !active.process.is_alive() {
            return Err(Error::NotRunning);
        }
        tracing::debug!(command, "Forwarding command to server");
        active.process.write_line(command).await
    }

    /// Runs one `tick query` exchange.
    ///
    /// The run lock is released before waiting for the answer, so the console
    /// does not block other transitions while the server responds.
    pub async fn tick_stats(&self) -> Result<TickStats> {
        let (stdin, lines) = {
            let mut run = self.run.lock().await;
            let stdin = Self::live_stdin(&mut run).ok_or(Error::NotRunning)?;
            (stdin, self.lines.subscribe())
        };
        metrics::query_tick_stats(&stdin, lines, self.config.tick_query_timeout()).await
    }

    /// Stops the server if it is running. Used on exit and Ctrl-C.
    pub async fn shutdown(&self) -> Result<()> {
        let mut run = self.run.lock().await;
        if Self::is_alive(&mut run) {
            self.stop_locked(&mut run, false).await?;
        }
        Ok(())
    }

    async fn start_locked(&self, run: &mut Option<ActiveRun>, hard: bool) -> Result<StartOutcome> {
        self.reap_if_dead(run).await;
        if run.is_some() {
            tracing::warn!("Server is already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let properties = PropertiesFile::new(&self.config.properties_file);
        if hard {
            let port = properties.server_port(self.config.default_port);
            tracing::warn!(port, "Hard start: reclaiming server port");
            match port::kill_process_on_port(port).await {
                Ok(pids) if pids.is_empty() => tracing::info!(port, "Port was free"),
                Ok(pids) => tracing::info!(port, ?pids, "Port reclaimed"),
                Err(e) => tracing::warn!(port, error = %e, "Failed to reclaim port"),
            }
        }

        let max_players = properties.max_players();
        let max_ram_mb = LaunchScript::new(&self.config.launch_script).max_ram_mb();

        let spec = LaunchSpec {
            program: self.config.launch_script.clone(),
            args: self.config.launch_args.clone(),
            working_dir: self.config.server_dir.clone(),
            attempts: self.config.spawn_attempts,
            backoff: self.config.spawn_backoff(),
        };
        let mut process = ServerProcess::spawn(&spec).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to start server process");
            e
        })?;

        let generation = self.state.begin_generation(max_players, max_ram_mb);
        let output = process.take_output()?;
        let (finished, output_closed) = oneshot::channel();
        let reader = LogReader::new(
            generation,
            self.state.clone(),
            Arc::clone(&self.notifier),
            Arc::clone(&self.resolver),
            self.lines.clone(),
            self.config.echo_server_output,
        )
        .spawn(output, finished);
        self.watch_exit(generation, output_closed);

        let pid = process.pid();
        *run = Some(ActiveRun {
            process,
            generation,
            reader,
        });

        tracing::info!(pid, %generation, max_players, max_ram_mb, "Server started");
        Ok(StartOutcome::Started { pid, generation })
    }

    async fn stop_locked(&self, run: &mut Option<ActiveRun>, silent: bool) -> Result<StopResult> {
        let Some(mut active) = run.take() else {
            tracing::warn!("Server is not running");
            return Ok(StopResult::NotRunning);
        };

        if !active.process.is_alive() {
            tracing::warn!(generation = %active.generation, "Server process had already exited");
            Self::teardown(&self.state, active).await;
            return Ok(StopResult::NotRunning);
        }

        tracing::info!(generation = %active.generation, "Stopping server");
        self.state.invalidate();

        let outcome = match active
            .process
            .request_graceful_stop(self.config.stop_timeout())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Graceful stop failed, killing server");
                if let Err(kill_error) = active.process.force_kill().await {
                    tracing::error!(error = %kill_error, "Failed to kill server process");
                }
                StopOutcome::Killed
            }
        };

        Self::teardown(&self.state, active).await;
        tracing::info!(?outcome, "Server stopped");

        if !silent {
            self.dispatch(ServerEvent::ServerStopped).await;
        }
        Ok(StopResult::Stopped(outcome))
    }

    /// Waits for the reader of a finished run and resets the state.
    async fn teardown(state: &SharedState, active: ActiveRun) {
        state.invalidate();

        let mut reader = active.reader;
        if tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut reader).await.is_err() {
            tracing::warn!(generation = %active.generation, "Log reader did not finish, aborting it");
            reader.abort();
        }

        state.mark_stopped();
    }

    /// Tears the run of `generation` down once its output closes and the
    /// process is gone.
    ///
    /// Runs that were already stopped or replaced are left alone: the
    /// generation is compared under the run lock before anything changes.
    fn watch_exit(&self, generation: Generation, output_closed: oneshot::Receiver<()>) {
        let run = Arc::clone(&self.run);
        let state = self.state.clone();

        tokio::spawn(async move {
            // dropped sender: the reader was aborted by a teardown
            if output_closed.await.is_err() {
                return;
            }

            loop {
                {
                    let mut guard = run.lock().await;
                    let exited = match guard.as_mut() {
                        Some(active) if active.generation == generation => {
                            !active.process.is_alive()
                        }
                        _ => return,
                    };
                    if exited {
                        if let Some(dead) = guard.take() {
                            tracing::warn!(%generation, "Server process exited on its own");
                            Self::teardown(&state, dead).await;
                        }
                        return;
                    }
                }
                tokio::time::sleep(EXIT_POLL_INTERVAL).await;
            }
        });
    }

    /// Tears down a run whose process exited without being stopped.
    async fn reap_if_dead(&self, run: &mut Option<ActiveRun>) {
        if run.is_some() && !Self::is_alive(run) {
            if let Some(dead) = run.take() {
                tracing::warn!(generation = %dead.generation, "Server process exited on its own");
                Self::teardown(&self.state, dead).await;
            }
        }
    }

    fn live_stdin(run: &mut Option<ActiveRun>) -> Option<StdinHandle> {
        let active = run.as_mut()?;
        if active.process.is_alive() {
            Some(active.process.stdin())
        } else {
            None
        }
    }

    fn is_alive(run: &mut Option<ActiveRun>) -> bool {
        run.as_mut()
            .map(|active| active.process.is_alive())
            .unwrap_or(false)
    }

    async fn dispatch(&self, event: ServerEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(error = %e, ?event, "Failed to deliver notification");
        }
    }
}
