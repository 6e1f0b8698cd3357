use crate::config::RunnerConfig;
use crate::error::{Error, Result};

/// Game modes accepted by `set gamemode`.
pub const GAME_MODES: [&str; 4] = ["survival", "creative", "adventure", "spectator"];

/// Difficulties accepted by `set difficulty`.
pub const DIFFICULTIES: [&str; 4] = ["peaceful", "easy", "normal", "hard"];

/// Allowed range for `max-players`.
pub const MAX_PLAYERS_RANGE: std::ops::RangeInclusive<u32> = 1..=999;

/// Validates the runner configuration
pub fn validate_config(config: &RunnerConfig) -> Result<()> {
    if config.launch_script.as_os_str().is_empty() {
        return Err(Error::ConfigInvalid("launchScript is empty".to_string()));
    }

    if config.spawn_attempts == 0 {
        return Err(Error::ConfigInvalid(
            "spawnAttempts must be at least 1".to_string(),
        ));
    }

    if config.stop_timeout_secs == 0 {
        return Err(Error::ConfigInvalid(
            "stopTimeoutSecs must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates a `max-players` value
pub fn validate_max_players(value: &str) -> Result<u32> {
    let parsed: u32 = value.parse().map_err(|_| {
        Error::ConfigValidation(format!("max-players must be a number, got '{}'", value))
    })?;

    if !MAX_PLAYERS_RANGE.contains(&parsed) {
        return Err(Error::ConfigValidation(format!(
            "max-players must be between {} and {}",
            MAX_PLAYERS_RANGE.start(),
            MAX_PLAYERS_RANGE.end()
        )));
    }

    Ok(parsed)
}

/// Validates a value against a fixed set, case-insensitively
pub fn validate_choice(option: &str, value: &str, allowed: &[&str]) -> Result<String> {
    let lowered = value.to_ascii_lowercase();
    if allowed.contains(&lowered.as_str()) {
        Ok(lowered)
    } else {
        Err(Error::ConfigValidation(format!(
            "Invalid {} '{}'. Available: {}",
            option,
            value,
            allowed.join(", ")
        )))
    }
}
