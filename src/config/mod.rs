//! Configuration module for MC Runner.
//!
//! This module covers two kinds of configuration:
//!
//! * the runner's own settings ([`RunnerConfig`]), loaded from an optional
//!   JSON or YAML file;
//! * the supervised server's files, `server.properties` and the JVM memory
//!   flags in the launch script, which the operator can edit through `set`.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use mc_runner::config::RunnerConfig;
//!
//! let config = RunnerConfig::from_file("mc-runner.yaml").unwrap();
//! println!("Server directory: {}", config.server_dir.display());
//! ```
//!
//! Validating an operator edit:
//!
//! ```
//! use mc_runner::config::SettingEdit;
//!
//! let edit = SettingEdit::parse("difficulty", "hard").unwrap();
//! assert_eq!(edit.value(), "hard");
//! assert!(SettingEdit::parse("difficulty", "brutal").is_err());
//! ```
pub mod launch_script;
mod parser;
pub mod properties;
mod settings;
pub mod validator;

pub use launch_script::{LaunchScript, MemoryFlag, MemorySize, MemoryUnit};
pub use parser::{RunnerConfig, TelegramConfig};
pub use properties::PropertiesFile;
pub use settings::{SETTING_OPTIONS, SettingEdit, apply_setting};
pub use validator::validate_config;
