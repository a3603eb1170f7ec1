//! Controller binary for the Crossroads intersection.
//!
//! Wires the scheduling core to an occupancy source, the log renderer,
//! and the Observer API, then runs the control loop until a termination
//! condition is met.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `crossroads-config.yaml` (or the path given
//!    as the first argument)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the intersection and build the scheduler
//! 4. Create the occupancy source
//! 5. Create operator state from run bounds
//! 6. Start the Observer API server
//! 7. Run the control loop
//! 8. Log the result
//! 9. Keep the Observer serving the final state until Ctrl-C

mod error;
mod observer_renderer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossroads_core::clock::MonotonicClock;
use crossroads_core::config::ControllerConfig;
use crossroads_core::occupancy;
use crossroads_core::operator::OperatorState;
use crossroads_core::render::{LogRenderer, SignalRenderer};
use crossroads_core::runner;
use crossroads_core::tick::Scheduler;
use crossroads_observer::{AppState, ServerConfig};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ControllerError;
use crate::observer_renderer::ObserverRenderer;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "crossroads-config.yaml";

/// Application entry point for the controller.
///
/// # Errors
///
/// Returns an error if configuration is unreadable or invalid, or the
/// Observer server cannot bind. No tick runs in either case.
#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    // 1. Load configuration. Logging is not up yet, so remember whether the
    //    file was found and report it afterwards.
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, loaded_from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("crossroads-controller starting");
    if loaded_from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }

    // 3. Build the scheduler. An invalid layout or timing is fatal.
    let mut scheduler = Scheduler::from_config(&config)?;
    info!(
        intersection = config.intersection.name,
        pair_a = ?scheduler.layout().pair(crossroads_types::PairId::A),
        pair_b = ?scheduler.layout().pair(crossroads_types::PairId::B),
        green = ?scheduler.timing().green,
        yellow = ?scheduler.timing().yellow,
        "Scheduler initialized"
    );

    // 4. Occupancy source.
    let mut source = occupancy::from_config(&config.occupancy)?;

    // 5. Operator state.
    let operator = Arc::new(OperatorState::new(
        config.timing.poll_interval_ms,
        &config.simulation,
    ));
    info!(
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        poll_interval_ms = operator.poll_interval_ms(),
        "Operator state initialized"
    );

    // 6. Observer API server.
    let app_state = Arc::new(AppState::with_operator(
        config.intersection.name.clone(),
        Arc::clone(&operator),
    ));
    let observer_handle = if config.observer.enabled {
        let server_config = ServerConfig::from(&config.observer);
        let handle =
            crossroads_observer::spawn_observer(&server_config, Arc::clone(&app_state)).await?;
        info!(port = server_config.port, "Observer API server started");
        Some(handle)
    } else {
        info!("Observer API server disabled");
        None
    };

    // 7. Run the control loop.
    let mut renderers: Vec<Box<dyn SignalRenderer>> = vec![
        Box::new(LogRenderer),
        Box::new(ObserverRenderer::new(app_state)),
    ];
    let clock = MonotonicClock::start();

    let result = runner::run_controller(
        &mut scheduler,
        source.as_mut(),
        &clock,
        &operator,
        &mut renderers,
    )
    .await;

    // 8. Log results.
    runner::log_controller_end(&result);

    // 9. The final state stays readable until the process is interrupted.
    if let Some(handle) = observer_handle {
        info!("Control loop ended; observer still serving, press Ctrl-C to exit");
        serve_until(handle, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await;
    }

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "crossroads-controller shutdown complete"
    );

    Ok(())
}

/// Load the controller configuration, falling back to defaults when the
/// file does not exist.
///
/// Returns the configuration and whether it came from the file.
fn load_config(path: &Path) -> Result<(ControllerConfig, bool), ControllerError> {
    if path.exists() {
        Ok((ControllerConfig::from_file(path)?, true))
    } else {
        let mut config = ControllerConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

/// Keep the Observer task running until `shutdown` completes, then abort it
/// and wait for it to wind down.
///
/// Returns early if the server task exits on its own.
async fn serve_until(mut handle: JoinHandle<()>, shutdown: impl Future<Output = ()>) {
    tokio::select! {
        _ = &mut handle => {}
        () = shutdown => {
            handle.abort();
            handle.await.ok();
        }
    }
}
