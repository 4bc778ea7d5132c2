//! Simulation loop runner.
//!
//! [`run_simulation`] drives [`run_tick`] on a fixed real-time interval
//! until the tick bound is reached or a stop is requested. Stopping is
//! cooperative: the loop checks the stop channel between ticks and while
//! sleeping, so a tick is never cut in half.
//!
//! [`run_tick`]: crate::tick::run_tick

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::command::CommandSource;
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },
}

/// Why the run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// `simulation.max_ticks` ticks were executed.
    MaxTicksReached,
    /// A stop was requested on the stop channel.
    StopRequested,
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Ticks executed by this run.
    pub total_ticks: u64,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub ended_at: DateTime<Utc>,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run the simulation loop until a termination condition is met.
///
/// The run stops after `simulation.max_ticks` ticks (0 means unbounded),
/// or as soon as `true` is sent on `stop`. The loop sleeps
/// `world.tick_interval_ms` between ticks.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick execution fails.
pub async fn run_simulation(
    state: &mut SimulationState,
    commands: &mut dyn CommandSource,
    callback: &mut dyn TickCallback,
    stop: &mut watch::Receiver<bool>,
) -> Result<SimulationResult, RunnerError> {
    let started_at = Utc::now();
    let max_ticks = state.config.simulation.max_ticks;
    let interval = Duration::from_millis(state.config.world.tick_interval_ms);
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    info!(
        world = %state.config.world.name,
        start_tick = state.clock.tick(),
        max_ticks,
        tick_interval_ms = state.config.world.tick_interval_ms,
        "Simulation starting"
    );

    let end_reason = loop {
        if *stop.borrow() {
            info!("Stop requested");
            break SimulationEndReason::StopRequested;
        }

        let summary = tick::run_tick(state, commands)?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, state);
        last_summary = Some(summary);

        if max_ticks > 0 && total_ticks >= max_ticks {
            info!(total_ticks, max_ticks, "Tick limit reached");
            break SimulationEndReason::MaxTicksReached;
        }

        if !interval.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                changed = stop.changed() => {
                    // Sender gone: nobody can stop us early any more.
                    if changed.is_err() {
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        }
    };

    Ok(SimulationResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
        started_at,
        ended_at: Utc::now(),
    })
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult) {
    let elapsed_ms = result
        .ended_at
        .signed_duration_since(result.started_at)
        .num_milliseconds();
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        elapsed_ms,
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            tick = summary.tick,
            carried = summary.carried,
            pending_pickups = summary.pending_pickups,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
