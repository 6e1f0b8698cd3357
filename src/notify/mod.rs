//! Lifecycle notifications.
//!
//! The runner reports lifecycle events through the [`Notifier`] trait. Which
//! implementation is used is decided once at startup by [`select_notifier`]:
//! the Telegram notifier when a bot token is configured, otherwise a
//! [`NoopNotifier`].

pub mod telegram;

use crate::config::TelegramConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub use telegram::{TelegramBot, TelegramNotifier, UserRegistry};

/// Environment variable holding the Telegram bot token.
pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";

/// Events fanned out to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// The server finished starting.
    ServerReady {
        /// Minecraft version
        version: String,
        /// Public address
        public_address: String,
        /// LAN address
        local_address: String,
        /// Bound port
        port: String,
    },
    /// The server was stopped by the operator.
    ServerStopped,
    /// The server was restarted.
    ServerRestarted,
    /// A player joined.
    PlayerJoined(String),
    /// A player left.
    PlayerLeft(String),
}

impl ServerEvent {
    /// Human readable notification text (Telegram Markdown).
    pub fn message(&self) -> String {
        match self {
            ServerEvent::ServerReady {
                version,
                public_address,
                local_address,
                port,
            } => format!(
                "🟢 *Minecraft server started*\n\n\
                 📦 Version Minecraft: {}\n\
                 🌐 IP (Hamachi): `{}:{}`\n\
                 📡 IP (Local): `{}:{}`\n",
                version, public_address, port, local_address, port
            ),
            ServerEvent::ServerStopped => "🔴 *Minecraft server stopped*".to_string(),
            ServerEvent::ServerRestarted => "🔄 *Minecraft server restarting*".to_string(),
            ServerEvent::PlayerJoined(name) => format!("🎮 {} joined the game!", name),
            ServerEvent::PlayerLeft(name) => format!("🔚 {} left the game!", name),
        }
    }
}

/// Receiver of lifecycle events.
///
/// Delivery is best effort. Implementations deal with per-recipient
/// failures themselves; an `Err` means nothing could be delivered at all and
/// callers only log it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one event.
    async fn notify(&self, event: &ServerEvent) -> Result<()>;
}

/// Notifier that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, event: &ServerEvent) -> Result<()> {
        tracing::trace!(?event, "Notifications disabled, dropping event");
        Ok(())
    }
}

/// State of the notification channel, shown in the startup banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    /// Telegram notifications are active.
    Active,
    /// Enabled in the configuration but no usable token.
    Unavailable,
    /// Disabled in the configuration.
    Off,
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationStatus::Active => "true",
            NotificationStatus::Unavailable => "false",
            NotificationStatus::Off => "off",
        })
    }
}

/// Outcome of [`select_notifier`].
pub struct NotifierSelection {
    /// Notifier used by the runner
    pub notifier: Arc<dyn Notifier>,
    /// Telegram bot, present when notifications are active
    pub bot: Option<TelegramBot>,
    /// Banner status
    pub status: NotificationStatus,
}

/// Chooses the notifier from configuration and environment.
///
/// The env file is loaded first (missing files are fine), then
/// `TELEGRAM_TOKEN` decides between Telegram and no-op.
pub fn select_notifier(config: &TelegramConfig) -> NotifierSelection {
    if !config.enabled {
        tracing::info!("Telegram notifications disabled in configuration");
        return noop(NotificationStatus::Off);
    }

    if let Err(e) = dotenvy::from_path(&config.env_file) {
        tracing::debug!(env_file = %config.env_file.display(), error = %e, "No env file loaded");
    }

    let token = match std::env::var(TELEGRAM_TOKEN_VAR) {
        Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
        _ => {
            tracing::warn!("{} not set, Telegram notifications unavailable", TELEGRAM_TOKEN_VAR);
            return noop(NotificationStatus::Unavailable);
        }
    };

    let registry = UserRegistry::new(config.users_file.clone());
    match TelegramNotifier::new(token, registry) {
        Ok(notifier) => {
            tracing::info!("Telegram notifications enabled");
            let bot = notifier.bot();
            NotifierSelection {
                notifier: Arc::new(notifier),
                bot: Some(bot),
                status: NotificationStatus::Active,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up Telegram notifier");
            noop(NotificationStatus::Unavailable)
        }
    }
}

fn noop(status: NotificationStatus) -> NotifierSelection {
    NotifierSelection {
        notifier: Arc::new(NoopNotifier),
        bot: None,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_messages() {
        assert_eq!(
            ServerEvent::PlayerJoined("Alex".to_string()).message(),
            "🎮 Alex joined the game!"
        );
        assert_eq!(
            ServerEvent::PlayerLeft("Alex".to_string()).message(),
            "🔚 Alex left the game!"
        );
    }

    #[test]
    fn test_ready_message_contains_addresses() {
        let message = ServerEvent::ServerReady {
            version: "1.21.1".to_string(),
            public_address: "25.1.2.3".to_string(),
            local_address: "192.168.1.10".to_string(),
            port: "25565".to_string(),
        }
        .message();

        assert!(message.contains("1.21.1"));
        assert!(message.contains("`25.1.2.3:25565`"));
        assert!(message.contains("`192.168.1.10:25565`"));
    }

    #[test]
    fn test_disabled_config_selects_noop() {
        let config = TelegramConfig {
            enabled: false,
            ..TelegramConfig::default()
        };
        let selection = select_notifier(&config);
        assert_eq!(selection.status, NotificationStatus::Off);
        assert!(selection.bot.is_none());
    }

    #[tokio::test]
    async fn test_noop_notifier_accepts_everything() {
        assert!(NoopNotifier.notify(&ServerEvent::ServerStopped).await.is_ok());
    }
}
