/// Error handling module for MC Runner.
///
/// This module defines the error types used throughout the library.
/// Almost every failure here is recoverable: the console reports it and
/// keeps reading commands, so the variants carry enough context to print a
/// useful message to the operator.
///
/// # Example
///
/// ```
/// use mc_runner::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::NotRunning) => println!("Start the server first"),
///         Err(Error::ConfigValidation(msg)) => println!("Rejected: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the mc-runner library.
#[derive(Error, Debug)]
pub enum Error {
    /// The server process could not be launched.
    ///
    /// This error occurs when:
    /// - The launch script does not exist
    /// - The launch script is not executable
    /// - Every spawn attempt failed
    #[error("Failed to spawn server: {0}")]
    Spawn(String),

    /// A write was attempted to a server process that has already exited.
    #[error("Server process is unavailable: {0}")]
    ChildUnavailable(String),

    /// Failed to read or parse a configuration file.
    ///
    /// This error occurs when:
    /// - The runner configuration is malformed JSON or YAML
    /// - `server.properties` or the launch script cannot be read or written
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed fine but contains unusable values.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A `set` edit was rejected.
    ///
    /// This error occurs when:
    /// - The option is unknown
    /// - The value is outside the allowed range or set
    /// - The minimum memory would exceed the maximum
    /// - The server is running while the edit is attempted
    #[error("{0}")]
    ConfigValidation(String),

    /// A best-effort address lookup failed.
    #[error("Address resolution failed: {0}")]
    AddressResolution(String),

    /// Delivering a notification failed.
    #[error("Notification failed: {0}")]
    Notification(String),

    /// The server is not running.
    #[error("Server is not running")]
    NotRunning,

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for mc-runner operations.
pub type Result<T> = std::result::Result<T, Error>;
