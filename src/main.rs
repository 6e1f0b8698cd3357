//! Entry point for the `mc-runner` binary.
//!
//! Sets up file logging, loads the configuration, prints the banner and then
//! reads operator commands from stdin until `exit` or Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use mc_runner::{Console, McRunner, Reply, RunnerConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Config file used when `--config` is not given and the file exists.
const DEFAULT_CONFIG_FILE: &str = "mc-runner.yaml";

#[derive(Debug, Parser)]
#[command(name = "mc-runner", version, about = "Minecraft server supervisor console")]
struct Args {
    /// Runner configuration (JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to stderr
    #[arg(long)]
    log_stderr: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    #[cfg(not(unix))]
    colored::control::set_override(false);

    let config = load_config(args.config.as_deref())?;
    let _guard = init_tracing(&config.log_dir, args.log_stderr)?;

    let runner = Arc::new(McRunner::new(config).context("Failed to create runner")?);
    let console = Console::new(Arc::clone(&runner));
    println!("{}", console.banner());

    if runner.spawn_bot().is_some() {
        tracing::debug!("Telegram bot running");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read console input")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, shutting down");
                println!();
                shutdown(&runner).await;
                return Ok(());
            }
        };

        let Some(line) = line else {
            tracing::info!("Console input closed, shutting down");
            shutdown(&runner).await;
            return Ok(());
        };

        match console.execute(&line).await {
            Reply::Text(text) => println!("{}", text),
            Reply::Clear => clear_screen(),
            Reply::Exit(text) => {
                clear_screen();
                println!("{}", text);
                return Ok(());
            }
            Reply::Nothing => {}
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    match path {
        Some(path) => RunnerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => RunnerConfig::from_file(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG_FILE)),
        None => Ok(RunnerConfig::default()),
    }
}

fn init_tracing(log_dir: &Path, log_stderr: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("mc-runner")
        .filename_suffix("log")
        .build(log_dir)
        .context("Failed to create log file")?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer().with_ansi(false).with_writer(writer);
    let stderr_layer = log_stderr.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Ok(guard)
}

async fn shutdown(runner: &McRunner) {
    if let Err(e) = runner.lifecycle().shutdown().await {
        tracing::error!(error = %e, "Failed to stop server during shutdown");
        eprintln!("Failed to stop server: {}", e);
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
    let _ = std::io::stdout().flush();
}
