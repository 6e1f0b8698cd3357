//! `server.properties` access.
//!
//! Lines are matched by the `key=` prefix. Updates rewrite the whole file,
//! keep the order of existing lines and append unknown keys at the end.

use crate::error::{Error, Result};
use std::path::Path;

/// Value of `max-players` when it cannot be read.
pub const DEFAULT_MAX_PLAYERS: u32 = 1;

/// Looks up `key` in properties text.
pub fn lookup(content: &str, key: &str) -> Option<String> {
    let prefix = format!("{}=", key);
    content
        .lines()
        .find(|line| line.starts_with(&prefix))
        .map(|line| line[prefix.len()..].trim().to_string())
}

/// Returns `content` with `key` set to `value`.
pub fn upsert(content: &str, key: &str, value: &str) -> String {
    let prefix = format!("{}=", key);
    let mut found = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|line| {
            if !found && line.starts_with(&prefix) {
                found = true;
                format!("{}{}", prefix, value)
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        lines.push(format!("{}{}", prefix, value));
    }

    let mut updated = lines.join("\n");
    updated.push('\n');
    updated
}

/// A `server.properties` file on disk.
#[derive(Debug, Clone)]
pub struct PropertiesFile<'a> {
    path: &'a Path,
}

impl<'a> PropertiesFile<'a> {
    /// Wraps the properties file at `path`.
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }

    /// Reads a single key. A missing file reads as no value.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(self.path).map_err(|e| {
            Error::ConfigParse(format!("Failed to read {}: {}", self.path.display(), e))
        })?;
        Ok(lookup(&content, key))
    }

    /// Sets a key, creating the file if it does not exist yet.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let content = if self.path.exists() {
            std::fs::read_to_string(self.path).map_err(|e| {
                Error::ConfigParse(format!("Failed to read {}: {}", self.path.display(), e))
            })?
        } else {
            String::new()
        };

        std::fs::write(self.path, upsert(&content, key, value)).map_err(|e| {
            Error::ConfigParse(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        tracing::info!(file = %self.path.display(), key, value, "Updated server property");
        Ok(())
    }

    /// `max-players`, falling back to [`DEFAULT_MAX_PLAYERS`].
    pub fn max_players(&self) -> u32 {
        self.parsed("max-players").unwrap_or(DEFAULT_MAX_PLAYERS)
    }

    /// `server-port`, falling back to `default_port`.
    pub fn server_port(&self, default_port: u16) -> u16 {
        self.parsed("server-port").unwrap_or(default_port)
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        match self.get(key) {
            Ok(Some(raw)) => match raw.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "Malformed server property, using default");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read server property, using default");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROPS: &str = "#Minecraft server properties\nmotd=A Minecraft Server\nmax-players=20\nserver-port=25565\n";

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(PROPS, "max-players").as_deref(), Some("20"));
        assert_eq!(lookup(PROPS, "motd").as_deref(), Some("A Minecraft Server"));
        assert_eq!(lookup(PROPS, "difficulty"), None);
        // prefix match must include the separator
        assert_eq!(lookup("max-players-extra=3\n", "max-players"), None);
    }

    #[test]
    fn test_upsert_existing_key_keeps_order() {
        let updated = upsert(PROPS, "max-players", "50");
        assert_eq!(
            updated,
            "#Minecraft server properties\nmotd=A Minecraft Server\nmax-players=50\nserver-port=25565\n"
        );
    }

    #[test]
    fn test_upsert_appends_missing_key() {
        let updated = upsert(PROPS, "difficulty", "hard");
        assert!(updated.ends_with("server-port=25565\ndifficulty=hard\n"));
    }
}
