//! Operator console.
//!
//! [`ConsoleCommand::parse`] turns one input line into a command and
//! [`Console::execute`] runs it against the runner, producing a [`Reply`]
//! for the terminal. Command words are matched case-insensitively; anything
//! unrecognized is forwarded to the server exactly as typed.

pub mod render;

use crate::config::{SETTING_OPTIONS, SettingEdit, apply_setting};
use crate::error::{Error, Result};
use crate::server::{StartOutcome, StopOutcome, StopResult, metrics};
use crate::{McRunner, VERSION};
use colored::Colorize;
use render::{ResourceUsage, TickMode};
use std::sync::Arc;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `info`
    Info,
    /// `version` / `tetos`
    Version,
    /// `start [--hard]`
    Start {
        /// Reclaim the server port first
        hard: bool,
    },
    /// `stop`
    Stop,
    /// `restart`
    Restart,
    /// `tps`, `mspt`, `tps all`, `perf`
    Tick(TickMode),
    /// `get-ip`
    GetIp,
    /// `set <option> <value...>`
    Set {
        /// Option name as typed
        option: String,
        /// Rest of the line
        value: String,
    },
    /// `exit`
    Exit,
    /// `clear` / `cls`
    Clear,
    /// `help`
    Help,
    /// Anything else, forwarded verbatim
    Raw(String),
    /// Blank line
    Empty,
}

impl ConsoleCommand {
    /// Parses one console line.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let mut words = trimmed.split_whitespace();
        let Some(first) = words.next() else {
            return Self::Empty;
        };
        let rest: Vec<String> = words.map(str::to_ascii_lowercase).collect();

        match (first.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("info", []) => Self::Info,
            ("version" | "tetos", []) => Self::Version,
            ("start", []) => Self::Start { hard: false },
            ("start", [flag]) if flag == "--hard" => Self::Start { hard: true },
            ("stop", []) => Self::Stop,
            ("restart", []) => Self::Restart,
            ("tps", []) => Self::Tick(TickMode::Tps),
            ("tps", [all]) if all == "all" => Self::Tick(TickMode::All),
            ("mspt", []) => Self::Tick(TickMode::Mspt),
            ("perf", []) => Self::Tick(TickMode::All),
            ("get-ip", []) => Self::GetIp,
            ("set", _) => {
                let args = trimmed[first.len()..].trim_start();
                let (option, value) = args
                    .split_once(char::is_whitespace)
                    .unwrap_or((args, ""));
                Self::Set {
                    option: option.to_string(),
                    value: value.trim().to_string(),
                }
            }
            ("exit", []) => Self::Exit,
            ("clear" | "cls", []) => Self::Clear,
            ("help", []) => Self::Help,
            _ => Self::Raw(trimmed.to_string()),
        }
    }
}

/// What the terminal should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print the text
    Text(String),
    /// Clear the terminal
    Clear,
    /// Print the text and quit
    Exit(String),
    /// Nothing to show
    Nothing,
}

/// Executes console commands against a runner.
pub struct Console {
    runner: Arc<McRunner>,
}

impl Console {
    /// Creates a console for `runner`.
    pub fn new(runner: Arc<McRunner>) -> Self {
        Self { runner }
    }

    /// Startup banner.
    pub fn banner(&self) -> String {
        render::banner(VERSION, self.runner.notifications())
    }

    /// Parses and executes one line. Errors become red reply text.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, line: &str) -> Reply {
        let command = ConsoleCommand::parse(line);
        match self.dispatch(command).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Command failed");
                Reply::Text(format!("❌ {}", e).red().to_string())
            }
        }
    }

    async fn dispatch(&self, command: ConsoleCommand) -> Result<Reply> {
        let lifecycle = self.runner.lifecycle();

        let reply = match command {
            ConsoleCommand::Empty => Reply::Nothing,
            ConsoleCommand::Info => Reply::Text(self.info().await),
            ConsoleCommand::Version => Reply::Text(format!("Utility version: {}", VERSION.yellow())),
            ConsoleCommand::Help => Reply::Text(render::help()),
            ConsoleCommand::Clear => Reply::Clear,
            ConsoleCommand::Start { hard } => {
                let heading = if hard {
                    "🚨 Hard start: freeing the server port...".red()
                } else {
                    "🚀 Starting server...".cyan()
                };
                let outcome = lifecycle.start(hard).await?;
                Reply::Text(format!("{}\n{}", heading, started_text(outcome)))
            }
            ConsoleCommand::Stop => Reply::Text(stopped_text(lifecycle.stop(false).await?)),
            ConsoleCommand::Restart => {
                let outcome = lifecycle.restart().await?;
                Reply::Text(format!(
                    "{}\n{}",
                    "🔄 Restarting server...".cyan(),
                    started_text(outcome)
                ))
            }
            ConsoleCommand::Tick(mode) => {
                if !lifecycle.is_running().await {
                    return Ok(not_running());
                }
                Reply::Text(render::tick_stats(mode, lifecycle.tick_stats().await?))
            }
            ConsoleCommand::GetIp => {
                if !lifecycle.is_running().await {
                    return Ok(not_running());
                }
                Reply::Text(render::addresses(&self.runner.state().snapshot()))
            }
            ConsoleCommand::Set { option, value } => Reply::Text(self.set(&option, &value).await?),
            ConsoleCommand::Raw(text) => {
                if !lifecycle.is_running().await {
                    return Ok(not_running());
                }
                lifecycle.send_command(&text).await?;
                Reply::Nothing
            }
            ConsoleCommand::Exit => {
                lifecycle.shutdown().await?;
                Reply::Exit("👋 Bye!".to_string())
            }
        };
        Ok(reply)
    }

    async fn info(&self) -> String {
        let lifecycle = self.runner.lifecycle();
        // reaps a crashed run before the snapshot
        let pid = lifecycle.pid().await;
        // limits stay as read at start while the server runs
        if pid.is_none() {
            self.runner.refresh_limits();
        }

        let usage = ResourceUsage {
            used_ram_mb: pid.and_then(metrics::used_ram_mb),
            world_size: metrics::world_size(&self.runner.config().world_dir()).await,
        };
        render::info(&self.runner.state().snapshot(), &usage)
    }

    async fn set(&self, option: &str, value: &str) -> Result<String> {
        if option.is_empty() {
            return Err(Error::ConfigValidation(format!(
                "Usage: set <option> <value> (options: {})",
                SETTING_OPTIONS.join(", ")
            )));
        }
        if self.runner.lifecycle().is_running().await {
            return Err(Error::ConfigValidation(
                "Stop the server before changing settings".to_string(),
            ));
        }

        let edit = SettingEdit::parse(option, value)?;
        apply_setting(self.runner.config(), &edit)?;
        self.runner.refresh_limits();
        tracing::info!(option = edit.option(), value = %edit.value(), "Setting updated");

        Ok(format!("✅ {} set to {}", edit.option(), edit.value())
            .green()
            .to_string())
    }
}

fn not_running() -> Reply {
    Reply::Text(not_running_text())
}

fn started_text(outcome: StartOutcome) -> String {
    match outcome {
        StartOutcome::Started { pid, .. } => {
            format!("Server process started (pid {})", pid).green().to_string()
        }
        StartOutcome::AlreadyRunning => "Server is already running!".yellow().to_string(),
    }
}

fn stopped_text(result: StopResult) -> String {
    match result {
        StopResult::Stopped(StopOutcome::Graceful(_)) => "🛑 Server stopped!".red().to_string(),
        StopResult::Stopped(StopOutcome::Killed) => {
            "🛑 Server did not stop in time and was killed!".red().to_string()
        }
        StopResult::NotRunning => not_running_text(),
    }
}

fn not_running_text() -> String {
    "Server is not running! Use 'start' to launch it."
        .yellow()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builtin_commands() {
        assert_eq!(ConsoleCommand::parse("info"), ConsoleCommand::Info);
        assert_eq!(ConsoleCommand::parse("  INFO  "), ConsoleCommand::Info);
        assert_eq!(ConsoleCommand::parse("tetos"), ConsoleCommand::Version);
        assert_eq!(ConsoleCommand::parse("start"), ConsoleCommand::Start { hard: false });
        assert_eq!(ConsoleCommand::parse("Start --HARD"), ConsoleCommand::Start { hard: true });
        assert_eq!(ConsoleCommand::parse("tps"), ConsoleCommand::Tick(TickMode::Tps));
        assert_eq!(ConsoleCommand::parse("tps all"), ConsoleCommand::Tick(TickMode::All));
        assert_eq!(ConsoleCommand::parse("perf"), ConsoleCommand::Tick(TickMode::All));
        assert_eq!(ConsoleCommand::parse("mspt"), ConsoleCommand::Tick(TickMode::Mspt));
        assert_eq!(ConsoleCommand::parse("cls"), ConsoleCommand::Clear);
        assert_eq!(ConsoleCommand::parse(""), ConsoleCommand::Empty);
        assert_eq!(ConsoleCommand::parse("   "), ConsoleCommand::Empty);
    }

    #[test]
    fn test_parse_set_keeps_value_text() {
        assert_eq!(
            ConsoleCommand::parse("set motd  Welcome to   the server "),
            ConsoleCommand::Set {
                option: "motd".to_string(),
                value: "Welcome to   the server".to_string(),
            }
        );
        assert_eq!(
            ConsoleCommand::parse("set"),
            ConsoleCommand::Set {
                option: String::new(),
                value: String::new(),
            }
        );
    }

    #[test]
    fn test_unknown_input_is_forwarded_verbatim() {
        assert_eq!(
            ConsoleCommand::parse("Say Hello World"),
            ConsoleCommand::Raw("Say Hello World".to_string())
        );
        assert_eq!(
            ConsoleCommand::parse("start now"),
            ConsoleCommand::Raw("start now".to_string())
        );
        assert_eq!(
            ConsoleCommand::parse("tps 5"),
            ConsoleCommand::Raw("tps 5".to_string())
        );
    }
}
