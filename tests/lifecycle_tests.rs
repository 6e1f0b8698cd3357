#![cfg(unix)]

mod common;

use common::{Fixture, RecordingNotifier, fixed_resolver, wait_for};
use mc_runner::error::{Error, Result};
use mc_runner::notify::ServerEvent;
use mc_runner::server::{
    LifecycleManager, ServerStatus, SharedState, StartOutcome, StopOutcome, StopResult,
};
use std::sync::Arc;
use std::time::Duration;

fn manager(fixture: &Fixture) -> (LifecycleManager, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let manager = LifecycleManager::new(
        Arc::new(fixture.config.clone()),
        SharedState::new(),
        notifier.clone(),
        Arc::new(fixed_resolver()),
    );
    (manager, notifier)
}

#[tokio::test]
async fn test_start_reaches_ready_and_stop_resets_state() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, notifier) = manager(&fixture);

    let outcome = manager.start(false).await?;
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    assert!(manager.state().status().is_running());

    let ready = wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;
    assert_eq!(ready.mc_version, "1.21.1");
    assert_eq!(ready.game_mode, "SURVIVAL");
    assert_eq!(ready.port, "25565");
    assert_eq!(ready.public_address, "25.1.2.3");
    assert_eq!(ready.local_address, "192.168.1.10");
    assert_eq!(ready.max_players, 20);
    assert_eq!(ready.max_ram_mb, 4096);

    let result = manager.stop(false).await?;
    assert!(matches!(result, StopResult::Stopped(StopOutcome::Graceful(_))));

    let stopped = manager.state().snapshot();
    assert_eq!(stopped.status, ServerStatus::Stopped);
    assert_eq!(stopped.mc_version, "UNKNOWN");
    assert_eq!(stopped.game_mode, "UNKNOWN");
    assert_eq!(stopped.port, "Unknown");
    assert_eq!(stopped.public_address, "Unknown");
    assert_eq!(stopped.local_address, "Unknown");
    assert_eq!(stopped.online_players, 0);
    assert!(!manager.is_running().await);

    let events = notifier.events();
    assert_eq!(
        events.first(),
        Some(&ServerEvent::ServerReady {
            version: "1.21.1".to_string(),
            public_address: "25.1.2.3".to_string(),
            local_address: "192.168.1.10".to_string(),
            port: "25565".to_string(),
        })
    );
    assert_eq!(events.last(), Some(&ServerEvent::ServerStopped));

    Ok(())
}

#[tokio::test]
async fn test_second_start_does_not_spawn() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, _notifier) = manager(&fixture);

    let first = manager.start(false).await?;
    let StartOutcome::Started { pid, .. } = first else {
        panic!("expected a new process, got {:?}", first);
    };

    assert_eq!(manager.start(false).await?, StartOutcome::AlreadyRunning);
    assert_eq!(manager.pid().await, Some(pid));

    manager.stop(true).await?;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_spawn_one_process() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, _notifier) = manager(&fixture);

    let (a, b) = tokio::join!(manager.start(false), manager.start(false));
    let started = [a?, b?]
        .iter()
        .filter(|outcome| matches!(outcome, StartOutcome::Started { .. }))
        .count();
    assert_eq!(started, 1);

    manager.stop(true).await?;
    Ok(())
}

#[tokio::test]
async fn test_ready_is_reported_once() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, notifier) = manager(&fixture);

    manager.start(false).await?;
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;

    // another "Done (" line from the same process
    manager.send_command("Done (again)").await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    manager.stop(true).await?;
    assert_eq!(
        notifier.count(|e| matches!(e, ServerEvent::ServerReady { .. })),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_player_count_follows_log() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, notifier) = manager(&fixture);

    manager.start(false).await?;
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;

    manager.send_command("join Steve").await?;
    manager.send_command("join Alex").await?;
    wait_for(manager.state(), |s| s.online_players == 2).await;

    manager.send_command("leave Steve").await?;
    wait_for(manager.state(), |s| s.online_players == 1).await;

    manager.stop(true).await?;
    assert_eq!(manager.state().snapshot().online_players, 0);

    let players: Vec<_> = notifier
        .events()
        .into_iter()
        .filter(|e| matches!(e, ServerEvent::PlayerJoined(_) | ServerEvent::PlayerLeft(_)))
        .collect();
    assert_eq!(
        players,
        vec![
            ServerEvent::PlayerJoined("Steve".to_string()),
            ServerEvent::PlayerJoined("Alex".to_string()),
            ServerEvent::PlayerLeft("Steve".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_restart_is_silent_about_stop() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, notifier) = manager(&fixture);

    manager.start(false).await?;
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;
    manager.send_command("join Steve").await?;
    wait_for(manager.state(), |s| s.online_players == 1).await;

    let outcome = manager.restart().await?;
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    assert_eq!(manager.state().snapshot().online_players, 0);

    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;
    manager.stop(true).await?;

    assert_eq!(notifier.count(|e| *e == ServerEvent::ServerStopped), 0);
    assert_eq!(notifier.count(|e| *e == ServerEvent::ServerRestarted), 1);
    assert_eq!(
        notifier.count(|e| matches!(e, ServerEvent::ServerReady { .. })),
        2
    );
    Ok(())
}

#[tokio::test]
async fn test_restart_when_stopped_starts() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, notifier) = manager(&fixture);

    let outcome = manager.restart().await?;
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    manager.stop(true).await?;

    assert_eq!(notifier.count(|e| *e == ServerEvent::ServerRestarted), 0);
    Ok(())
}

#[tokio::test]
async fn test_stop_when_not_running() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, notifier) = manager(&fixture);

    assert_eq!(manager.stop(false).await?, StopResult::NotRunning);
    assert!(notifier.events().is_empty());
    assert!(matches!(
        manager.send_command("say hi").await,
        Err(Error::NotRunning)
    ));
    Ok(())
}

#[tokio::test]
async fn test_tick_stats() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, _notifier) = manager(&fixture);

    manager.start(false).await?;
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;

    let stats = manager.tick_stats().await?;
    assert_eq!(stats.mspt, 25.0);
    assert_eq!(stats.tps, 20.0);

    manager.stop(true).await?;
    assert!(matches!(manager.tick_stats().await, Err(Error::NotRunning)));
    Ok(())
}

#[tokio::test]
async fn test_crash_is_detected() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, _notifier) = manager(&fixture);

    manager.start(false).await?;
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;
    manager.send_command("join Steve").await?;
    wait_for(manager.state(), |s| s.online_players == 1).await;
    manager.send_command("crash").await?;

    // nothing polls the manager here; the state must follow the exit
    let stopped = wait_for(manager.state(), |s| s.status == ServerStatus::Stopped).await;
    assert_eq!(stopped.online_players, 0);
    assert_eq!(stopped.mc_version, "UNKNOWN");
    assert_eq!(stopped.public_address, "Unknown");

    assert!(!manager.is_running().await);
    assert_eq!(manager.pid().await, None);
    assert!(matches!(
        manager.send_command("say hi").await,
        Err(Error::NotRunning)
    ));

    // a fresh start works after the crash
    assert!(matches!(
        manager.start(false).await?,
        StartOutcome::Started { .. }
    ));
    manager.stop(true).await?;
    Ok(())
}

#[tokio::test]
async fn test_stopped_run_is_not_torn_down_twice() -> Result<()> {
    let fixture = Fixture::new();
    let (manager, _notifier) = manager(&fixture);

    manager.start(false).await?;
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;
    manager.restart().await?;
    let ready = wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;

    // the first run's exit must not reset the second one
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(manager.state().status(), ServerStatus::Ready);
    assert_eq!(manager.state().snapshot().mc_version, ready.mc_version);
    assert!(manager.is_running().await);

    manager.stop(true).await?;
    Ok(())
}

#[tokio::test]
async fn test_hard_start_on_free_port() -> Result<()> {
    let fixture = Fixture::new();
    // a port nothing listens on, so the reclaim finds no process
    let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    std::fs::write(
        &fixture.config.properties_file,
        format!("motd=A Minecraft Server\nmax-players=20\nserver-port={}\n", port),
    )?;
    let (manager, _notifier) = manager(&fixture);

    let outcome = manager.start(true).await?;
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;

    // a hard start while running still does not spawn a second process
    assert_eq!(manager.start(true).await?, StartOutcome::AlreadyRunning);

    manager.stop(true).await?;
    assert_eq!(manager.state().status(), ServerStatus::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_unresponsive_server_is_killed() -> Result<()> {
    let mut fixture = Fixture::stubborn();
    fixture.config.stop_timeout_secs = 1;
    let (manager, notifier) = manager(&fixture);

    manager.start(false).await?;
    wait_for(manager.state(), |s| s.status == ServerStatus::Ready).await;

    assert_eq!(
        manager.stop(false).await?,
        StopResult::Stopped(StopOutcome::Killed)
    );
    assert_eq!(manager.state().status(), ServerStatus::Stopped);
    assert_eq!(notifier.events().last(), Some(&ServerEvent::ServerStopped));
    Ok(())
}

#[tokio::test]
async fn test_missing_launch_script() {
    let mut fixture = Fixture::new();
    fixture.config.launch_script = fixture.dir.path().join("missing.sh");
    let (manager, notifier) = manager(&fixture);

    let result = manager.start(false).await;
    assert!(matches!(result, Err(Error::Spawn(_))));
    assert_eq!(manager.state().status(), ServerStatus::Stopped);
    assert!(!manager.is_running().await);
    assert!(notifier.events().is_empty());
}
