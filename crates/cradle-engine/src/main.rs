//! Engine binary for the Cradle carrying simulation.
//!
//! Wires the tick cycle to a seeded demo population and a demo command
//! source, and runs until the tick bound or Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `cradle-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Spawn the demo population from `world.seed`
//! 4. Restore the carry snapshot, if one exists
//! 5. Run the simulation loop
//! 6. Save a final snapshot and end the session

mod callback;
mod demo;
mod error;
mod spawner;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cradle_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use cradle_core::persist;
use cradle_core::runner;
use cradle_core::tick::SimulationState;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::callback::EngineCallback;
use crate::demo::{DemoCommandSource, SharedBoard};
use crate::error::EngineError;
use crate::spawner::SpawnerConfig;

/// Configuration file, relative to the working directory.
const CONFIG_PATH: &str = "cradle-config.yaml";

/// Status line cadence, in ticks.
const REPORT_EVERY_TICKS: u64 = 50;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step, the simulation, or the
/// shutdown save fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("cradle-engine starting");
    info!(
        world_name = %config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        max_ticks = config.simulation.max_ticks,
        presentation = ?config.presentation.backend,
        from_file,
        "Configuration loaded"
    );

    // 3. Spawn the demo population.
    let spawner_config = load_spawner_config()?;
    let spawned = spawner::spawn_population(&spawner_config, &config.life_stages, config.world.seed)?;
    info!(
        factions = spawned.factions.len(),
        adults = spawned.adults.len(),
        dependents = spawned.dependents.len(),
        "Population ready"
    );

    let seed = config.world.seed;
    let snapshot_path = PathBuf::from(&config.persistence.snapshot_path);
    let mut state = SimulationState::new(config, spawned.world);

    // 4. Restore the previous session's carry state.
    match persist::load_snapshot(&snapshot_path).map_err(EngineError::from)? {
        Some(snapshot) => {
            let report = state.restore(&snapshot);
            info!(
                path = %snapshot_path.display(),
                restored = report.relationships_restored,
                dropped = report.relationships_dropped,
                "Resumed from snapshot"
            );
        }
        None => info!(path = %snapshot_path.display(), "No snapshot found, starting fresh"),
    }

    // 5. Run the simulation.
    let board: SharedBoard = Arc::new(Mutex::new(Vec::new()));
    let mut commands = DemoCommandSource::new(
        seed,
        spawner_config.command_interval_ticks,
        Arc::clone(&board),
    );
    let mut callback = EngineCallback::new(board, REPORT_EVERY_TICKS);

    let (stop_tx, mut stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current tick");
            if stop_tx.send(true).is_err() {
                warn!("Simulation already finished");
            }
        }
    });

    let result = runner::run_simulation(&mut state, &mut commands, &mut callback, &mut stop_rx)
        .await
        .map_err(EngineError::from)?;
    runner::log_simulation_end(&result);

    // 6. Final save.
    persist::save_snapshot(&snapshot_path, &state.snapshot()).map_err(EngineError::from)?;
    state.end_session();

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "cradle-engine shutdown complete"
    );
    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Load the simulation configuration from `cradle-config.yaml`, falling
/// back to defaults when the file is absent. Also reports whether the file
/// was found, for logging once tracing is up.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((SimulationConfig::from_file(config_path)?, true))
    } else {
        Ok((SimulationConfig::parse("")?, false))
    }
}

/// Load spawner configuration from the `agents` section of
/// `cradle-config.yaml`. Defaults are used if the file or the section is
/// missing.
fn load_spawner_config() -> Result<SpawnerConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if !config_path.exists() {
        return Ok(SpawnerConfig::default());
    }

    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Spawner {
        message: format!("failed to read config file: {e}"),
    })?;
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Spawner {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    match raw.get("agents") {
        Some(agents_value) => serde_yml::from_value(agents_value.clone()).map_err(|e| {
            EngineError::Spawner {
                message: format!("failed to parse agents config: {e}"),
            }
        }),
        None => Ok(SpawnerConfig::default()),
    }
}
