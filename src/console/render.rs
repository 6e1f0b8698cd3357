//! Console text for command replies.

use crate::notify::NotificationStatus;
use crate::server::{ServerState, ServerStatus, TickStats};
use colored::{ColoredString, Colorize};

/// Which figures `tps`/`mspt` print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// TPS only
    Tps,
    /// MSPT only
    Mspt,
    /// Both
    All,
}

/// Extra figures for `info` that are not part of the state.
#[derive(Debug, Clone, Default)]
pub struct ResourceUsage {
    /// Resident memory of the server process in MB
    pub used_ram_mb: Option<f64>,
    /// Formatted world size
    pub world_size: Option<String>,
}

/// Colors TPS: ≥ 18 green, ≥ 12 yellow, else red.
pub fn colorize_tps(tps: f64) -> ColoredString {
    let text = format!("{:.2}", tps);
    if tps >= 18.0 {
        text.green()
    } else if tps >= 12.0 {
        text.yellow()
    } else {
        text.red()
    }
}

/// Colors MSPT: ≤ 50 green, ≤ 75 yellow, else red.
pub fn colorize_mspt(mspt: f64) -> ColoredString {
    let text = format!("{:.2} ms", mspt);
    if mspt <= 50.0 {
        text.green()
    } else if mspt <= 75.0 {
        text.yellow()
    } else {
        text.red()
    }
}

/// `tps` / `mspt` reply.
pub fn tick_stats(mode: TickMode, stats: TickStats) -> String {
    match mode {
        TickMode::Tps => format!("⚡ TPS: {}", colorize_tps(stats.tps)),
        TickMode::Mspt => format!("🕓 MSPT: {}", colorize_mspt(stats.mspt)),
        TickMode::All => format!(
            "⚡ TPS: {} | 🕓 MSPT: {}",
            colorize_tps(stats.tps),
            colorize_mspt(stats.mspt)
        ),
    }
}

/// `info` reply.
pub fn info(state: &ServerState, usage: &ResourceUsage) -> String {
    let mut lines = vec!["📋 Server Info:".to_string()];

    if state.status == ServerStatus::Stopped {
        lines.push(format!(" - Status: {}", state.status.to_string().red()));
        lines.push(format!(" - Minecraft version: {}", "Unknown".yellow()));
        lines.push(format!(" - Game mode: {}", "Unknown".yellow()));
        lines.push(format!(
            " - Online players: {}",
            format!("0 / {}", state.max_players).yellow()
        ));
        lines.push(format!(
            " - Used RAM: {}",
            format!("0 MB / {} MB", state.max_ram_mb).yellow()
        ));
    } else {
        let status = match state.status {
            ServerStatus::Ready => state.status.to_string().green(),
            _ => state.status.to_string().yellow(),
        };
        let used_ram = usage
            .used_ram_mb
            .map(|mb| format!("{:.2} MB", mb))
            .unwrap_or_else(|| "Unknown".to_string());

        lines.push(format!(" - Status: {}", status));
        lines.push(format!(" - Minecraft version: {}", state.mc_version.yellow()));
        lines.push(format!(" - Game mode: {}", state.game_mode.yellow()));
        lines.push(format!(
            " - Online players: {}",
            format!("{} / {}", state.online_players, state.max_players).green()
        ));
        lines.push(format!(
            " - Used RAM: {}",
            format!("{} / {} MB", used_ram, state.max_ram_mb).yellow()
        ));
    }

    lines.push(format!(
        " - World size: {}",
        usage.world_size.as_deref().unwrap_or("Unknown").yellow()
    ));
    lines.join("\n")
}

/// `get-ip` reply.
pub fn addresses(state: &ServerState) -> String {
    format!(
        "🌐 IP (Hamachi): {}\n📡 IP (Local): {}",
        format!("{}:{}", state.public_address, state.port).cyan(),
        format!("{}:{}", state.local_address, state.port).cyan()
    )
}

/// `help` reply.
pub fn help() -> String {
    [
        "Commands:",
        "  info                 server status and resources",
        "  start [--hard]       start the server (--hard frees the port first)",
        "  stop                 stop the server",
        "  restart              restart the server",
        "  tps | mspt | perf    tick performance",
        "  get-ip               public and local address",
        "  set <option> <value> edit max-players, motd, gamemode, difficulty, ram-min, ram-max",
        "  version              utility version",
        "  clear                clear the terminal",
        "  exit                 stop the server and quit",
        "Anything else is sent to the server console.",
    ]
    .join("\n")
}

/// Startup banner.
pub fn banner(version: &str, notifications: NotificationStatus) -> String {
    let status = match notifications {
        NotificationStatus::Active => notifications.to_string().green(),
        NotificationStatus::Unavailable => notifications.to_string().red(),
        NotificationStatus::Off => notifications.to_string().yellow(),
    };
    let info_line = format!("Version: {}", version.yellow());
    let status_line = format!("Telegram notifications: {}", status);

    let width = "Telegram notifications: false".len() + 4;
    let rule = "─".repeat(width);
    let mut lines = vec![
        "  __  __  ____   ____                              ".red().to_string(),
        " |  \\/  |/ ___| |  _ \\ _   _ _ __  _ __   ___ _ __ ".red().to_string(),
        " | |\\/| | |     | |_) | | | | '_ \\| '_ \\ / _ \\ '__|".to_string(),
        " | |  | | |___  |  _ <| |_| | | | | | | |  __/ |   ".to_string(),
        " |_|  |_|\\____| |_| \\_\\\\__,_|_| |_|_| |_|\\___|_|   ".red().to_string(),
        String::new(),
        format!("┌{}┐", rule),
        format!("  {}", info_line),
        format!("  {}", status_line),
        format!("└{}┘", rule),
    ];
    if notifications != NotificationStatus::Active {
        lines.push(
            "🔕 Telegram notifications disabled (no bot token configured)"
                .red()
                .to_string(),
        );
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_for_stopped_server() {
        colored::control::set_override(false);
        let state = ServerState {
            max_players: 20,
            max_ram_mb: 4096,
            ..ServerState::default()
        };
        let text = info(&state, &ResourceUsage::default());

        assert!(text.contains(" - Status: Not running"));
        assert!(text.contains(" - Online players: 0 / 20"));
        assert!(text.contains(" - Used RAM: 0 MB / 4096 MB"));
        assert!(text.contains(" - World size: Unknown"));
    }

    #[test]
    fn test_info_for_ready_server() {
        colored::control::set_override(false);
        let state = ServerState {
            status: ServerStatus::Ready,
            mc_version: "1.21.1".to_string(),
            game_mode: "SURVIVAL".to_string(),
            online_players: 2,
            max_players: 10,
            ..ServerState::default()
        };
        let usage = ResourceUsage {
            used_ram_mb: Some(1536.0),
            world_size: Some("1.50 GB".to_string()),
        };
        let text = info(&state, &usage);

        assert!(text.contains("Running (ready)"));
        assert!(text.contains("1.21.1"));
        assert!(text.contains("2 / 10"));
        assert!(text.contains("1536.00 MB / 4096 MB"));
        assert!(text.contains("1.50 GB"));
    }

    #[test]
    fn test_tick_stats_modes() {
        colored::control::set_override(false);
        let stats = TickStats::from_mspt(25.0);
        assert_eq!(tick_stats(TickMode::Tps, stats), "⚡ TPS: 20.00");
        assert_eq!(tick_stats(TickMode::Mspt, stats), "🕓 MSPT: 25.00 ms");
        assert_eq!(
            tick_stats(TickMode::All, stats),
            "⚡ TPS: 20.00 | 🕓 MSPT: 25.00 ms"
        );
    }
}
