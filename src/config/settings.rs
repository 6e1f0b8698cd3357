//! Operator edits of the server configuration (`set <option> <value>`).

use crate::config::launch_script::{LaunchScript, MemoryFlag, MemorySize};
use crate::config::properties::PropertiesFile;
use crate::config::validator::{
    DIFFICULTIES, GAME_MODES, validate_choice, validate_max_players,
};
use crate::config::RunnerConfig;
use crate::error::{Error, Result};

/// Options understood by `set`, in the order shown to the operator.
pub const SETTING_OPTIONS: [&str; 6] = [
    "max-players",
    "motd",
    "gamemode",
    "difficulty",
    "ram-min",
    "ram-max",
];

/// A validated configuration edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingEdit {
    /// `max-players` in `server.properties`
    MaxPlayers(u32),
    /// `motd` in `server.properties`
    Motd(String),
    /// `gamemode` in `server.properties`
    GameMode(String),
    /// `difficulty` in `server.properties`
    Difficulty(String),
    /// `-Xms` in the launch script
    RamMin(MemorySize),
    /// `-Xmx` in the launch script
    RamMax(MemorySize),
}

impl SettingEdit {
    /// Parses and validates an option/value pair.
    ///
    /// This checks the value on its own; the `ram-min` ≤ `ram-max` rule
    /// needs the launch script and is enforced by [`apply_setting`].
    pub fn parse(option: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(Error::ConfigValidation(format!(
                "Missing value for '{}'",
                option
            )));
        }

        match option.to_ascii_lowercase().as_str() {
            "max-players" => Ok(Self::MaxPlayers(validate_max_players(value)?)),
            "motd" => Ok(Self::Motd(value.to_string())),
            "gamemode" => Ok(Self::GameMode(validate_choice(
                "gamemode",
                value,
                &GAME_MODES,
            )?)),
            "difficulty" => Ok(Self::Difficulty(validate_choice(
                "difficulty",
                value,
                &DIFFICULTIES,
            )?)),
            "ram-min" => Ok(Self::RamMin(value.parse()?)),
            "ram-max" => Ok(Self::RamMax(value.parse()?)),
            other => Err(Error::ConfigValidation(format!(
                "Unknown option '{}'. Available: {}",
                other,
                SETTING_OPTIONS.join(", ")
            ))),
        }
    }

    /// The option name as typed by the operator.
    pub fn option(&self) -> &'static str {
        match self {
            Self::MaxPlayers(_) => "max-players",
            Self::Motd(_) => "motd",
            Self::GameMode(_) => "gamemode",
            Self::Difficulty(_) => "difficulty",
            Self::RamMin(_) => "ram-min",
            Self::RamMax(_) => "ram-max",
        }
    }

    /// The new value, rendered the way it is written to disk.
    pub fn value(&self) -> String {
        match self {
            Self::MaxPlayers(n) => n.to_string(),
            Self::Motd(s) | Self::GameMode(s) | Self::Difficulty(s) => s.clone(),
            Self::RamMin(size) | Self::RamMax(size) => size.to_string(),
        }
    }
}

/// Writes a validated edit to `server.properties` or the launch script.
///
/// Memory edits are cross-checked against the other flag currently in the
/// script so that the initial heap never exceeds the maximum.
pub fn apply_setting(config: &RunnerConfig, edit: &SettingEdit) -> Result<()> {
    let properties = PropertiesFile::new(&config.properties_file);
    let script = LaunchScript::new(&config.launch_script);

    match edit {
        SettingEdit::MaxPlayers(_)
        | SettingEdit::Motd(_)
        | SettingEdit::GameMode(_)
        | SettingEdit::Difficulty(_) => properties.set(edit.option(), &edit.value()),
        SettingEdit::RamMin(size) => {
            if let Some(max) = script.read_flag(MemoryFlag::Max)? {
                if size.as_mb() > max.as_mb() {
                    return Err(Error::ConfigValidation(format!(
                        "ram-min {} ({} MB) exceeds ram-max {} ({} MB)",
                        size,
                        size.as_mb(),
                        max,
                        max.as_mb()
                    )));
                }
            }
            script.write_flag(MemoryFlag::Min, *size)
        }
        SettingEdit::RamMax(size) => {
            if let Some(min) = script.read_flag(MemoryFlag::Min)? {
                if size.as_mb() < min.as_mb() {
                    return Err(Error::ConfigValidation(format!(
                        "ram-max {} ({} MB) is below ram-min {} ({} MB)",
                        size,
                        size.as_mb(),
                        min,
                        min.as_mb()
                    )));
                }
            }
            script.write_flag(MemoryFlag::Max, *size)
        }
    }
}
