/*!
 # MC Runner

 A console supervisor for a single Minecraft server process.

 ## Overview

 MC Runner provides functionality to:
 - Start, hard start, stop and restart the server process
 - Follow the server log and track version, game mode, readiness and players
 - Forward raw console commands to the server
 - Query tick performance (TPS/MSPT), memory use and world size
 - Edit `server.properties` and the launch script's memory flags
 - Notify Telegram subscribers about lifecycle events

 ## Basic Usage

 ```no_run
 use mc_runner::{McRunner, Result};

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create a runner from config file
     let runner = McRunner::from_config_file("mc-runner.yaml")?;

     // Start the server
     runner.lifecycle().start(false).await?;

     // Inspect the shared state
     println!("{}", runner.state().status());

     // Stop it again
     runner.lifecycle().stop(false).await?;

     Ok(())
 }
 ```

 ## Features

 - **Process supervision**: Single server process with bounded graceful stop
 - **Log classification**: Structured events from server output
 - **Notifications**: Telegram broadcast with a no-op fallback
 - **Configuration**: JSON or YAML config files
 - **Async Support**: Full async/await support on tokio
*/

pub mod config;
pub mod console;
pub mod error;
pub mod notify;
pub mod server;

pub use config::RunnerConfig;
pub use console::{Console, ConsoleCommand, Reply};
pub use error::{Error, Result};
pub use notify::{NotificationStatus, Notifier, ServerEvent};
pub use server::{LifecycleManager, ServerState, ServerStatus, SharedState};

use config::{LaunchScript, PropertiesFile, validate_config};
use notify::{TelegramBot, select_notifier};
use server::{AddressResolver, SystemAddressResolver};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;

/// Version shown by the `version` command and the banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs and supervises the Minecraft server
///
/// This struct is the main entry point: it owns the configuration, the
/// shared state, the lifecycle manager and the notifier chosen at startup.
/// All constructors are instrumented with `tracing` spans.
pub struct McRunner {
    /// Configuration
    config: Arc<RunnerConfig>,
    /// Shared server state
    state: SharedState,
    /// Process lifecycle
    lifecycle: LifecycleManager,
    /// Notification channel status for the banner
    notifications: NotificationStatus,
    /// Telegram bot, until spawned
    bot: Mutex<Option<TelegramBot>>,
}

impl McRunner {
    /// Create a new runner from a configuration file path
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = RunnerConfig::from_file(path)?;
        Self::new(config)
    }

    /// Create a new runner from a configuration
    ///
    /// The notifier is selected from the Telegram settings and environment.
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config), fields(server_dir = %config.server_dir.display()))]
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let selection = select_notifier(&config.telegram);
        let mut runner = Self::with_collaborators(
            config,
            selection.notifier,
            Arc::new(SystemAddressResolver),
        )?;
        runner.notifications = selection.status;
        runner.bot = Mutex::new(selection.bot);
        Ok(runner)
    }

    /// Create a runner with an explicit notifier and address resolver
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip_all)]
    pub fn with_collaborators(
        config: RunnerConfig,
        notifier: Arc<dyn Notifier>,
        resolver: Arc<dyn AddressResolver>,
    ) -> Result<Self> {
        validate_config(&config)?;
        tracing::info!("Creating new McRunner");

        let config = Arc::new(config);
        let state = SharedState::new();
        let lifecycle =
            LifecycleManager::new(Arc::clone(&config), state.clone(), notifier, resolver);

        let runner = Self {
            config,
            state,
            lifecycle,
            notifications: NotificationStatus::Off,
            bot: Mutex::new(None),
        };
        runner.refresh_limits();
        Ok(runner)
    }

    /// Configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Shared server state
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Lifecycle manager
    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Notification status for the banner
    pub fn notifications(&self) -> NotificationStatus {
        self.notifications
    }

    /// Re-reads max players and max RAM from disk into the state.
    pub fn refresh_limits(&self) {
        let max_players = PropertiesFile::new(&self.config.properties_file).max_players();
        let max_ram_mb = LaunchScript::new(&self.config.launch_script).max_ram_mb();
        self.state.set_limits(max_players, max_ram_mb);
    }

    /// Starts the Telegram bot's polling task, once.
    ///
    /// Returns `None` when notifications are not active or the bot was
    /// already spawned.
    pub fn spawn_bot(&self) -> Option<JoinHandle<()>> {
        let bot = self
            .bot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        tracing::info!("Spawning Telegram bot");
        Some(tokio::spawn(bot.run(self.state.clone())))
    }
}
