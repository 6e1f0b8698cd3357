//! Log reader bound to one process generation.
//!
//! The reader echoes every output line, publishes it to output subscribers
//! and classifies it. Classification results are applied to the shared state
//! only while the reader's generation is current. Once the generation is
//! invalidated the reader keeps draining the pipe until end-of-stream, so a
//! stopping server never blocks on a full stdout, but it no longer touches
//! state or sends notifications.

use crate::notify::{Notifier, ServerEvent};
use crate::server::address::AddressResolver;
use crate::server::classifier::{LogEvent, classify};
use crate::server::process::OutputLines;
use crate::server::state::{Generation, ServerStatus, SharedState};
use colored::Colorize;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

/// Consumes the output of one server process.
pub struct LogReader {
    /// Generation this reader belongs to
    generation: Generation,
    /// Shared state
    state: SharedState,
    /// Event sink
    notifier: Arc<dyn Notifier>,
    /// Address lookup for the binding line
    resolver: Arc<dyn AddressResolver>,
    /// Raw line fan-out (used by `tick query`)
    lines: broadcast::Sender<String>,
    /// Echo lines on the console
    echo: bool,
}

impl LogReader {
    /// Creates a reader for `generation`.
    pub fn new(
        generation: Generation,
        state: SharedState,
        notifier: Arc<dyn Notifier>,
        resolver: Arc<dyn AddressResolver>,
        lines: broadcast::Sender<String>,
        echo: bool,
    ) -> Self {
        Self {
            generation,
            state,
            notifier,
            resolver,
            lines,
            echo,
        }
    }

    /// Runs the reader on its own task.
    ///
    /// `finished` fires once the output has reached end-of-stream.
    pub fn spawn(self, output: OutputLines, finished: oneshot::Sender<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run(output).await;
            // the exit watcher may be gone already
            let _ = finished.send(());
        })
    }

    /// Reads until end-of-stream.
    #[tracing::instrument(skip_all, fields(generation = %self.generation))]
    pub async fn run(self, mut output: OutputLines) {
        let mut current = true;

        while let Some(next) = output.next().await {
            let line = match next {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read server output");
                    continue;
                }
            };

            if self.echo {
                println!("{}", line);
            }
            // no subscribers is the normal case
            let _ = self.lines.send(line.clone());

            if current && !self.handle_line(&line).await {
                tracing::debug!("Generation superseded, draining output without classifying");
                current = false;
            }
        }

        tracing::debug!("Server output closed");
    }

    /// Classifies and applies one line. Returns `false` once the generation is stale.
    pub async fn handle_line(&self, line: &str) -> bool {
        let event = match classify(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, line, "Failed to classify server output");
                if self.echo {
                    println!("{}", format!("Failed to recognize server output: {}", e).red());
                }
                return self.is_current();
            }
        };

        match event {
            LogEvent::Unrecognized => self.is_current(),
            LogEvent::AddressBound { host, port } => self.on_address(&host, port).await,
            LogEvent::GameMode(mode) => self.state.apply(self.generation, |s| s.game_mode = mode).is_some(),
            LogEvent::Version(version) => self.state.apply(self.generation, |s| s.mc_version = version).is_some(),
            LogEvent::Ready => {
                let ready = self.state.apply(self.generation, |s| {
                    if s.status == ServerStatus::Ready {
                        return None;
                    }
                    s.status = ServerStatus::Ready;
                    Some(ServerEvent::ServerReady {
                        version: s.mc_version.clone(),
                        public_address: s.public_address.clone(),
                        local_address: s.local_address.clone(),
                        port: s.port.clone(),
                    })
                });
                match ready {
                    None => false,
                    Some(None) => true,
                    Some(Some(event)) => {
                        if self.echo {
                            println!("{}", "✅ Server is ready!".green());
                        }
                        tracing::info!("Server is ready");
                        self.dispatch(event).await;
                        true
                    }
                }
            }
            LogEvent::PlayerJoined(name) => {
                let applied = self
                    .state
                    .apply(self.generation, |s| s.online_players += 1)
                    .is_some();
                if applied {
                    tracing::info!(player = %name, "Player joined");
                    self.dispatch(ServerEvent::PlayerJoined(name)).await;
                }
                applied
            }
            LogEvent::PlayerLeft(name) => {
                let applied = self
                    .state
                    .apply(self.generation, |s| {
                        s.online_players = s.online_players.saturating_sub(1)
                    })
                    .is_some();
                if applied {
                    tracing::info!(player = %name, "Player left");
                    self.dispatch(ServerEvent::PlayerLeft(name)).await;
                }
                applied
            }
        }
    }

    async fn on_address(&self, host: &str, port: u16) -> bool {
        tracing::info!(host, port, "Server bound address");
        if self
            .state
            .apply(self.generation, |s| s.port = port.to_string())
            .is_none()
        {
            return false;
        }

        match self.resolver.public_address().await {
            Ok(address) => {
                if self
                    .state
                    .apply(self.generation, |s| s.public_address = address)
                    .is_none()
                {
                    return false;
                }
            }
            Err(e) => tracing::warn!(error = %e, "Public address unavailable"),
        }

        match self.resolver.local_address().await {
            Ok(address) => self
                .state
                .apply(self.generation, |s| s.local_address = address)
                .is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Local address unavailable");
                self.is_current()
            }
        }
    }

    async fn dispatch(&self, event: ServerEvent) {
        if let Err(e) = self.notifier.notify(&event).await {
            tracing::warn!(error = %e, ?event, "Failed to deliver notification");
        }
    }

    fn is_current(&self) -> bool {
        self.state.current_generation() == self.generation
    }
}
