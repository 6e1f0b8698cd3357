//! Shared server state.
//!
//! One [`ServerState`] value exists per runner. It is reached through a
//! [`SharedState`] handle, which serializes every mutation behind a single
//! mutex and tags the state with the current process [`Generation`]. The log
//! reader of a torn-down run holds a stale generation and its updates are
//! discarded.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Placeholder for version and game mode until the log reports them.
pub const UNKNOWN: &str = "UNKNOWN";

/// Placeholder for address fields until the binding line is seen.
pub const UNKNOWN_ADDRESS: &str = "Unknown";

/// Lifecycle status of the supervised server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// No server process exists
    Stopped,
    /// Process spawned, startup not finished
    Starting,
    /// The log reported startup completion
    Ready,
}

impl ServerStatus {
    /// Whether a server process exists in this status.
    pub fn is_running(self) -> bool {
        !matches!(self, ServerStatus::Stopped)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ServerStatus::Stopped => "Not running",
            ServerStatus::Starting => "Running (starting...)",
            ServerStatus::Ready => "Running (ready)",
        };
        f.write_str(text)
    }
}

/// Identifier of one spawn-to-exit lifetime of the server process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Status fields of the supervised server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerState {
    /// Lifecycle status
    pub status: ServerStatus,
    /// Minecraft version, [`UNKNOWN`] until logged
    pub mc_version: String,
    /// Default game mode, [`UNKNOWN`] until logged
    pub game_mode: String,
    /// Players currently online
    pub online_players: u32,
    /// `max-players` read at start
    pub max_players: u32,
    /// `-Xmx` in MB read at start
    pub max_ram_mb: u64,
    /// Public (Hamachi) address
    pub public_address: String,
    /// LAN address
    pub local_address: String,
    /// Port the server bound to
    pub port: String,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            status: ServerStatus::Stopped,
            mc_version: UNKNOWN.to_string(),
            game_mode: UNKNOWN.to_string(),
            online_players: 0,
            max_players: crate::config::properties::DEFAULT_MAX_PLAYERS,
            max_ram_mb: crate::config::launch_script::DEFAULT_MAX_RAM_MB,
            public_address: UNKNOWN_ADDRESS.to_string(),
            local_address: UNKNOWN_ADDRESS.to_string(),
            port: UNKNOWN_ADDRESS.to_string(),
        }
    }
}

impl ServerState {
    /// Clears everything learned from the log. Limits are kept.
    fn reset_runtime(&mut self) {
        self.mc_version = UNKNOWN.to_string();
        self.game_mode = UNKNOWN.to_string();
        self.online_players = 0;
        self.public_address = UNKNOWN_ADDRESS.to_string();
        self.local_address = UNKNOWN_ADDRESS.to_string();
        self.port = UNKNOWN_ADDRESS.to_string();
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: ServerState,
    generation: u64,
}

/// Cloneable handle to the runner's [`ServerState`].
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<Mutex<Inner>>,
}

impl SharedState {
    /// Creates a stopped state with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> ServerState {
        self.lock().state.clone()
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ServerStatus {
        self.lock().state.status
    }

    /// The generation owning the state right now.
    pub fn current_generation(&self) -> Generation {
        Generation(self.lock().generation)
    }

    /// Opens a new generation for a freshly spawned process.
    ///
    /// Runtime fields return to their defaults, status becomes
    /// [`ServerStatus::Starting`] and the limits read from disk are cached.
    pub fn begin_generation(&self, max_players: u32, max_ram_mb: u64) -> Generation {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state.reset_runtime();
        inner.state.status = ServerStatus::Starting;
        inner.state.max_players = max_players;
        inner.state.max_ram_mb = max_ram_mb;
        Generation(inner.generation)
    }

    /// Invalidates the current generation without touching the fields.
    ///
    /// Called before a process is torn down so its reader stops mutating.
    pub fn invalidate(&self) -> Generation {
        let mut inner = self.lock();
        inner.generation += 1;
        Generation(inner.generation)
    }

    /// Marks the server stopped and resets every runtime field.
    pub fn mark_stopped(&self) {
        let mut inner = self.lock();
        inner.state.reset_runtime();
        inner.state.status = ServerStatus::Stopped;
    }

    /// Runs `update` only if `generation` is still current.
    ///
    /// Returns `None` when the generation is stale.
    pub fn apply<R>(
        &self,
        generation: Generation,
        update: impl FnOnce(&mut ServerState) -> R,
    ) -> Option<R> {
        let mut inner = self.lock();
        if inner.generation != generation.0 {
            return None;
        }
        Some(update(&mut inner.state))
    }

    /// Refreshes the cached limits.
    pub fn set_limits(&self, max_players: u32, max_ram_mb: u64) {
        let mut inner = self.lock();
        inner.state.max_players = max_players;
        inner.state.max_ram_mb = max_ram_mb;
    }

    /// Sets the online player count back to zero.
    pub fn reset_online_players(&self) {
        self.lock().state.online_players = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = SharedState::new().snapshot();
        assert_eq!(state.status, ServerStatus::Stopped);
        assert_eq!(state.mc_version, UNKNOWN);
        assert_eq!(state.public_address, UNKNOWN_ADDRESS);
        assert_eq!(state.online_players, 0);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let shared = SharedState::new();
        let old = shared.begin_generation(10, 2048);

        assert_eq!(shared.apply(old, |s| s.online_players += 1), Some(()));
        shared.invalidate();
        assert_eq!(shared.apply(old, |s| s.online_players += 1), None);
        assert_eq!(shared.snapshot().online_players, 1);
    }

    #[test]
    fn test_begin_generation_resets_runtime_fields() {
        let shared = SharedState::new();
        let generation = shared.begin_generation(10, 2048);
        shared.apply(generation, |s| {
            s.status = ServerStatus::Ready;
            s.mc_version = "1.21.1".to_string();
            s.online_players = 3;
            s.port = "25565".to_string();
        });

        let next = shared.begin_generation(20, 4096);
        assert!(next > generation);

        let state = shared.snapshot();
        assert_eq!(state.status, ServerStatus::Starting);
        assert_eq!(state.mc_version, UNKNOWN);
        assert_eq!(state.online_players, 0);
        assert_eq!(state.port, UNKNOWN_ADDRESS);
        assert_eq!(state.max_players, 20);
        assert_eq!(state.max_ram_mb, 4096);
    }

    #[test]
    fn test_mark_stopped_keeps_limits() {
        let shared = SharedState::new();
        let generation = shared.begin_generation(8, 1024);
        shared.apply(generation, |s| s.game_mode = "survival".to_string());

        shared.mark_stopped();

        let state = shared.snapshot();
        assert_eq!(state.status, ServerStatus::Stopped);
        assert_eq!(state.game_mode, UNKNOWN);
        assert_eq!(state.max_players, 8);
    }
}
