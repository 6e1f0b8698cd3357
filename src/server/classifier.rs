//! Classification of server log lines.
//!
//! Matching is by case-sensitive substring on a fixed set of markers. The
//! markers do not overlap in real server output, so the first rule that
//! matches decides the event.

use crate::error::{Error, Result};

const ADDRESS_MARKER: &str = "Starting Minecraft server on";
const GAME_MODE_MARKER: &str = "Default game type:";
const VERSION_MARKER: &str = "Starting minecraft server version";
const READY_MARKER: &str = "Done (";
const JOINED_MARKER: &str = "joined the game";
const LEFT_MARKER: &str = "left the game";

/// Structured meaning of one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// The server bound its listening socket.
    AddressBound {
        /// Host part as logged, may be `*` or empty
        host: String,
        /// Port part
        port: u16,
    },
    /// Default game mode.
    GameMode(String),
    /// Server version.
    Version(String),
    /// Startup finished.
    Ready,
    /// A player joined.
    PlayerJoined(String),
    /// A player left.
    PlayerLeft(String),
    /// Any other line.
    Unrecognized,
}

/// Classifies a single log line.
///
/// # Errors
///
/// Returns an error when a marker matches but the rest of the line cannot be
/// parsed, e.g. an address without a port. Callers log it and carry on.
///
/// # Examples
///
/// ```
/// use mc_runner::server::{LogEvent, classify};
///
/// let event = classify("[12:00:00] [Server thread/INFO]: Steve joined the game").unwrap();
/// assert_eq!(event, LogEvent::PlayerJoined("Steve".to_string()));
/// ```
pub fn classify(line: &str) -> Result<LogEvent> {
    if let Some((_, rest)) = line.split_once(ADDRESS_MARKER) {
        return parse_address(rest.trim());
    }
    if let Some((_, rest)) = line.split_once(GAME_MODE_MARKER) {
        return Ok(LogEvent::GameMode(rest.trim().to_string()));
    }
    if let Some((_, rest)) = line.split_once(VERSION_MARKER) {
        return Ok(LogEvent::Version(rest.trim().to_string()));
    }
    if line.contains(READY_MARKER) {
        return Ok(LogEvent::Ready);
    }
    if let Some((before, _)) = line.split_once(JOINED_MARKER) {
        return player_name(before, line).map(LogEvent::PlayerJoined);
    }
    if let Some((before, _)) = line.split_once(LEFT_MARKER) {
        return player_name(before, line).map(LogEvent::PlayerLeft);
    }
    Ok(LogEvent::Unrecognized)
}

fn parse_address(address: &str) -> Result<LogEvent> {
    let (host, port) = address.rsplit_once(':').ok_or_else(|| {
        Error::AddressResolution(format!("No port in server address '{}'", address))
    })?;
    let port = port.trim().parse().map_err(|_| {
        Error::AddressResolution(format!("Invalid port in server address '{}'", address))
    })?;

    Ok(LogEvent::AddressBound {
        host: host.trim().to_string(),
        port,
    })
}

/// The player name is the last whitespace-separated token before the marker.
fn player_name(before_marker: &str, line: &str) -> Result<String> {
    before_marker
        .split_whitespace()
        .last()
        .map(str::to_string)
        .ok_or_else(|| Error::Other(format!("No player name in '{}'", line)))
}
