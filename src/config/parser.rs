use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Telegram notification settings.
///
/// The bot token itself never lives in the runner configuration. It is read
/// from the `TELEGRAM_TOKEN` environment variable after loading `env_file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    /// Whether Telegram notifications may be used at all.
    pub enabled: bool,
    /// Dotenv file holding `TELEGRAM_TOKEN`.
    pub env_file: PathBuf,
    /// File with one registered chat id per line.
    pub users_file: PathBuf,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            env_file: PathBuf::from(".env"),
            users_file: PathBuf::from("telegram_cache/tg_users.txt"),
        }
    }
}

/// Configuration for the supervised Minecraft server.
///
/// Every field has a default, so an empty document (or no file at all)
/// yields a usable configuration.
///
/// # Examples
///
/// ```
/// use mc_runner::config::RunnerConfig;
///
/// let config = RunnerConfig::parse_from_str(r#"{ "serverDir": "srv", "stopTimeoutSecs": 30 }"#).unwrap();
/// assert_eq!(config.server_dir.to_str(), Some("srv"));
/// assert_eq!(config.default_port, 25565);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunnerConfig {
    /// Working directory of the server process.
    pub server_dir: PathBuf,

    /// Script (or binary) that launches the server.
    pub launch_script: PathBuf,

    /// Extra arguments passed to the launch script.
    pub launch_args: Vec<String>,

    /// Location of `server.properties`.
    pub properties_file: PathBuf,

    /// Port assumed when `server-port` is missing from the properties.
    pub default_port: u16,

    /// Seconds to wait for a graceful stop before killing the process.
    pub stop_timeout_secs: u64,

    /// How many times a spawn is attempted.
    pub spawn_attempts: u32,

    /// Initial delay between spawn attempts, doubled after each failure.
    pub spawn_backoff_ms: u64,

    /// Seconds to wait for the answer to `tick query`.
    pub tick_query_timeout_secs: u64,

    /// Echo server output on the console.
    pub echo_server_output: bool,

    /// Directory for the diagnostic log file.
    pub log_dir: PathBuf,

    /// Telegram notification settings.
    pub telegram: TelegramConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server_dir: PathBuf::from("server"),
            launch_script: PathBuf::from("run_server.sh"),
            launch_args: Vec::new(),
            properties_file: PathBuf::from("server/server.properties"),
            default_port: 25565,
            stop_timeout_secs: 60,
            spawn_attempts: 3,
            spawn_backoff_ms: 500,
            tick_query_timeout_secs: 5,
            echo_server_output: true,
            log_dir: PathBuf::from("logs"),
            telegram: TelegramConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Loads a configuration from a file path.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, anything else
    /// as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The contents are not valid for the chosen format
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::parse_from_yaml(&content),
            _ => Self::parse_from_str(&content),
        }
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Parses a configuration from a YAML string.
    pub fn parse_from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML config: {}", e)))
    }

    /// Graceful stop timeout as a `Duration`.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Initial spawn backoff as a `Duration`.
    pub fn spawn_backoff(&self) -> Duration {
        Duration::from_millis(self.spawn_backoff_ms)
    }

    /// `tick query` answer timeout as a `Duration`.
    pub fn tick_query_timeout(&self) -> Duration {
        Duration::from_secs(self.tick_query_timeout_secs)
    }

    /// The world directory inside the server directory.
    pub fn world_dir(&self) -> PathBuf {
        self.server_dir.join("world")
    }
}
