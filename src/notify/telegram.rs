//! Telegram notifications and bot commands.
//!
//! Subscribers are Telegram chat ids kept one per line in a plain text
//! file. A chat subscribes by sending `/start` to the bot; every lifecycle
//! event is then broadcast to all subscribers.

use crate::error::{Error, Result};
use crate::notify::{Notifier, ServerEvent};
use crate::server::{ServerStatus, SharedState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const LONG_POLL_SECS: u64 = 30;

/// Chat ids subscribed to notifications.
#[derive(Debug, Clone)]
pub struct UserRegistry {
    path: PathBuf,
}

impl UserRegistry {
    /// Registry stored at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads all chat ids. A missing file means no subscribers.
    pub fn load(&self) -> Result<BTreeSet<String>> {
        if !self.path.exists() {
            return Ok(BTreeSet::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Adds a chat id, returning `false` if it was already registered.
    pub fn register(&self, chat_id: &str) -> Result<bool> {
        let mut users = self.load()?;
        if !users.insert(chat_id.to_string()) {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content: Vec<&str> = users.iter().map(String::as_str).collect();
        std::fs::write(&self.path, content.join("\n"))?;
        tracing::info!(chat_id, "Registered Telegram user");
        Ok(true)
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Thin Telegram Bot API client shared by notifier and bot.
#[derive(Debug)]
struct Api {
    client: reqwest::Client,
    base: String,
}

impl Api {
    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }

    async fn send_message(&self, chat_id: &str, text: &str, markdown: bool) -> Result<()> {
        let body = SendMessage {
            chat_id,
            text,
            parse_mode: markdown.then_some("Markdown"),
        };
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("sendMessage to {} failed: {}", chat_id, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ApiResponse<serde_json::Value>>()
                .await
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_default();
            return Err(Error::Notification(format!(
                "sendMessage to {} returned {}: {}",
                chat_id, status, detail
            )));
        }
        Ok(())
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response: ApiResponse<Vec<Update>> = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&GetUpdates {
                offset,
                timeout: LONG_POLL_SECS,
            })
            .send()
            .await
            .map_err(|e| Error::Notification(format!("getUpdates failed: {}", e)))?
            .json()
            .await
            .map_err(|e| Error::Notification(format!("Malformed getUpdates response: {}", e)))?;

        if !response.ok {
            return Err(Error::Notification(format!(
                "getUpdates rejected: {}",
                response.description.unwrap_or_default()
            )));
        }
        Ok(response.result.unwrap_or_default())
    }
}

/// Broadcasts lifecycle events to every registered chat.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    api: Arc<Api>,
    registry: UserRegistry,
}

impl TelegramNotifier {
    /// Notifier talking to the public Bot API.
    pub fn new(token: String, registry: UserRegistry) -> Result<Self> {
        Self::with_api_base(DEFAULT_API_BASE, &token, registry)
    }

    /// Notifier talking to a custom API endpoint.
    pub fn with_api_base(base: &str, token: &str, registry: UserRegistry) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()
            .map_err(|e| Error::Notification(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api: Arc::new(Api {
                client,
                base: format!("{}/bot{}", base.trim_end_matches('/'), token),
            }),
            registry,
        })
    }

    /// Bot answering commands through the same API client.
    pub fn bot(&self) -> TelegramBot {
        TelegramBot {
            api: Arc::clone(&self.api),
            registry: self.registry.clone(),
        }
    }

    /// Sends `text` to every subscriber and returns how many deliveries succeeded.
    ///
    /// A failing recipient is logged and skipped.
    pub async fn broadcast(&self, text: &str) -> Result<usize> {
        let users = self.registry.load()?;
        let mut delivered = 0;

        for user in &users {
            match self.api.send_message(user, text, true).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!(chat_id = %user, error = %e, "Failed to notify Telegram user"),
            }
        }

        tracing::debug!(delivered, total = users.len(), "Telegram broadcast finished");
        Ok(delivered)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: &ServerEvent) -> Result<()> {
        self.broadcast(&event.message()).await.map(|_| ())
    }
}

/// Answers bot commands sent by Telegram users.
#[derive(Debug, Clone)]
pub struct TelegramBot {
    api: Arc<Api>,
    registry: UserRegistry,
}

impl TelegramBot {
    /// Long-polls for updates until the task is dropped.
    pub async fn run(self, state: SharedState) {
        let mut offset = 0;
        tracing::info!("Telegram bot polling started");

        loop {
            match self.api.get_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message {
                            self.handle_message(message, &state).await;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram polling failed, retrying");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    async fn handle_message(&self, message: Message, state: &SharedState) {
        let chat_id = message.chat.id.to_string();
        let text = message.text.unwrap_or_default();
        let command = text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();

        let reply = match command {
            "/start" => {
                if let Err(e) = self.registry.register(&chat_id) {
                    tracing::error!(chat_id = %chat_id, error = %e, "Failed to register Telegram user");
                }
                "🤖 *MC Runner connected*\n\
                 You are registered in the system.\n\
                 You will receive server notifications.\n\
                 Type /help to see available commands.\n"
                    .to_string()
            }
            "/help" => "📖 *Bot commands*\n\n\
                        /start - subscribe to notifications\n\
                        /info - server info\n\
                        /status - server status (on/off)\n\
                        /help - show this message"
                .to_string(),
            "/info" => info_reply(state),
            "/status" => format!("ℹ️ *Server status*\n\n{}\n", status_line(state.status())),
            _ => "❓ Unknown command.\nType /help to see available commands.".to_string(),
        };

        if let Err(e) = self.api.send_message(&chat_id, &reply, true).await {
            tracing::warn!(chat_id = %chat_id, error = %e, "Failed to answer Telegram command");
        }
    }
}

fn status_line(status: ServerStatus) -> &'static str {
    if status == ServerStatus::Ready {
        "🟢 Server is ON"
    } else {
        "🔴 Server is OFF"
    }
}

fn info_reply(state: &SharedState) -> String {
    let snapshot = state.snapshot();
    let mut text = format!("ℹ️ *Server info*\n\n{}\n", status_line(snapshot.status));
    if snapshot.status == ServerStatus::Ready {
        text.push_str(&format!(
            "📦 Version Minecraft: {}\n\
             🎮 Online players: {} / {}\n\
             🌐 IP (Hamachi): `{}:{}`\n\
             📡 IP (Local): `{}:{}`\n",
            snapshot.mc_version,
            snapshot.online_players,
            snapshot.max_players,
            snapshot.public_address,
            snapshot.port,
            snapshot.local_address,
            snapshot.port
        ));
    }
    text
}
