/// Server management module for MC Runner.
///
/// This module supervises the single Minecraft server process: spawning and
/// stopping it, following its log output and keeping the shared
/// [`ServerState`] up to date. All lifecycle operations are instrumented
/// with `tracing` spans.
///
/// # Components
///
/// * `state` - Shared, generation-aware server state
/// * `process` - The child process and its stdin/stdout pipes
/// * `classifier` - Turns log lines into structured events
/// * `reader` - Consumes the output of one process generation
/// * `lifecycle` - Start, hard start, stop and restart
/// * `address` - Public and local address lookup
/// * `port` - Port reclaim for hard starts
/// * `metrics` - TPS/MSPT, memory and world size figures
///
/// # Examples
///
/// Classifying a log line without a running server:
///
/// ```
/// use mc_runner::server::{LogEvent, classify};
///
/// let event = classify("[12:00:00] [Server thread/INFO]: Done (3.2s)! For help, type \"help\"").unwrap();
/// assert_eq!(event, LogEvent::Ready);
/// ```
///
/// Driving the lifecycle:
///
/// ```no_run
/// use mc_runner::config::RunnerConfig;
/// use mc_runner::notify::NoopNotifier;
/// use mc_runner::server::{LifecycleManager, SharedState, SystemAddressResolver};
/// use std::sync::Arc;
///
/// # async fn run() -> mc_runner::Result<()> {
/// let manager = LifecycleManager::new(
///     Arc::new(RunnerConfig::default()),
///     SharedState::new(),
///     Arc::new(NoopNotifier),
///     Arc::new(SystemAddressResolver),
/// );
/// manager.start(false).await?;
/// manager.stop(false).await?;
/// # Ok(())
/// # }
/// ```
pub mod address;
pub mod classifier;
pub mod lifecycle;
pub mod metrics;
pub mod port;
mod process;
pub mod reader;
pub mod state;

pub use address::{AddressResolver, SystemAddressResolver};
pub use classifier::{LogEvent, classify};
pub use lifecycle::{LifecycleManager, StartOutcome, StopResult};
pub use metrics::TickStats;
pub use process::{LaunchSpec, OutputLines, ServerProcess, StdinHandle, StopOutcome};
pub use reader::LogReader;
pub use state::{Generation, ServerState, ServerStatus, SharedState};
