#![allow(dead_code)]

use async_trait::async_trait;
use mc_runner::config::RunnerConfig;
use mc_runner::error::Result;
use mc_runner::notify::{Notifier, ServerEvent};
use mc_runner::server::{AddressResolver, ServerState, SharedState};
use mockall::mock;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

// Define a mock for the AddressResolver trait
mock! {
    pub Resolver {}

    #[async_trait]
    impl AddressResolver for Resolver {
        async fn public_address(&self) -> Result<String>;
        async fn local_address(&self) -> Result<String>;
    }
}

/// Resolver answering with fixed addresses.
pub fn fixed_resolver() -> MockResolver {
    let mut resolver = MockResolver::new();
    resolver
        .expect_public_address()
        .returning(|| Ok("25.1.2.3".to_string()));
    resolver
        .expect_local_address()
        .returning(|| Ok("192.168.1.10".to_string()));
    resolver
}

/// Notifier remembering every event in order.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ServerEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<ServerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: impl Fn(&ServerEvent) -> bool) -> usize {
        self.events().iter().filter(|event| wanted(event)).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &ServerEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Mock server: prints the usual startup lines, then reacts to stdin.
///
/// `join <name>` / `leave <name>` print player lines, `tick query` prints
/// the tick answer, `crash` exits with an error, `stop` exits cleanly
/// unless the script was created with `ignore_stop`.
fn server_script(ignore_stop: bool) -> String {
    let stop_branch = if ignore_stop {
        r#"stop) echo "[12:00:09] [Server thread/INFO]: Ignoring stop" ;;"#
    } else {
        r#"stop) echo "[12:00:09] [Server thread/INFO]: Stopping the server"; exit 0 ;;"#
    };

    format!(
        r#"#!/bin/bash
# java -Xms1G -Xmx4G -jar server.jar nogui
echo "[12:00:00] [Server thread/INFO]: Starting minecraft server version 1.21.1"
echo "[12:00:00] [Server thread/INFO]: Default game type: SURVIVAL"
echo "[12:00:00] [Server thread/INFO]: Starting Minecraft server on *:25565"
echo "[12:00:01] [Server thread/INFO]: Done (1.234s)! For help, type \"help\""
while read -r line; do
  case "$line" in
    {stop_branch}
    "tick query")
      echo "[12:00:05] [Server thread/INFO]: Target tick rate: 20.0 per second."
      echo "[12:00:05] [Server thread/INFO]: Average time per tick: 25.0ms (Target: 50.0ms)" ;;
    join\ *) echo "[12:00:02] [Server thread/INFO]: ${{line#join }} joined the game" ;;
    leave\ *) echo "[12:00:03] [Server thread/INFO]: ${{line#leave }} left the game" ;;
    crash) echo "[12:00:04] [Server thread/ERROR]: Crashing"; exit 1 ;;
    *) echo "[12:00:06] [Server thread/INFO]: Unknown command: $line" ;;
  esac
done
"#
    )
}

fn write_executable(path: &Path, content: &str) {
    let mut file = File::create(path).unwrap();
    file.write_all(content.as_bytes()).unwrap();

    // Make the script executable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = std::fs::metadata(path).unwrap().permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions).unwrap();
    }
}

/// A server directory with a mock launch script and `server.properties`.
///
/// Keep the fixture alive for the whole test; dropping it removes the
/// directory.
pub struct Fixture {
    pub dir: TempDir,
    pub config: RunnerConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(false)
    }

    /// A server that ignores `stop`.
    pub fn stubborn() -> Self {
        Self::build(true)
    }

    fn build(ignore_stop: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run_server.sh");
        write_executable(&script, &server_script(ignore_stop));

        let properties = dir.path().join("server.properties");
        std::fs::write(&properties, "motd=A Minecraft Server\nmax-players=20\nserver-port=25565\n")
            .unwrap();

        let config = RunnerConfig {
            server_dir: dir.path().to_path_buf(),
            launch_script: script,
            properties_file: properties,
            stop_timeout_secs: 5,
            spawn_attempts: 1,
            tick_query_timeout_secs: 5,
            echo_server_output: false,
            log_dir: dir.path().join("logs"),
            ..RunnerConfig::default()
        };

        Self { dir, config }
    }
}

/// Polls the state until `condition` holds, panicking after ten seconds.
pub async fn wait_for(state: &SharedState, condition: impl Fn(&ServerState) -> bool) -> ServerState {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let snapshot = state.snapshot();
            if condition(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("state condition not reached in time")
}
