//! Tick callback that logs carry activity and refreshes the demo board.

use cradle_core::runner::TickCallback;
use cradle_core::tick::{SimulationState, TickSummary};
use cradle_types::CarryEvent;
use tracing::{debug, info, warn};

use crate::demo::SharedBoard;

/// Callback that bridges the tick cycle to the engine's logs and the demo
/// command source.
pub struct EngineCallback {
    board: SharedBoard,
    report_every: u64,
}

impl EngineCallback {
    /// Create a callback writing to `board`, with a status line every
    /// `report_every` ticks (0 disables the status line).
    pub const fn new(board: SharedBoard, report_every: u64) -> Self {
        Self {
            board,
            report_every,
        }
    }
}

impl TickCallback for EngineCallback {
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState) {
        for event in &summary.events {
            match event {
                CarryEvent::Attached {
                    carrier_id,
                    carried_id,
                } => info!(tick = summary.tick, carrier = %carrier_id, carried = %carried_id, "Now carrying"),
                CarryEvent::Detached {
                    carrier_id,
                    carried_id,
                    reason,
                } => info!(tick = summary.tick, carrier = %carrier_id, carried = %carried_id, %reason, "Put down"),
                other => debug!(tick = summary.tick, event = ?other, "Carry event"),
            }
        }

        for rejected in &summary.rejected {
            info!(
                tick = summary.tick,
                carrier = %rejected.command.carrier_id(),
                reason = rejected.error.short_reason(),
                error = %rejected.error,
                "Command refused"
            );
        }

        match self.board.lock() {
            Ok(mut board) => {
                board.clear();
                board.extend(state.store.relationships().copied());
            }
            Err(err) => warn!(error = %err, "Demo board unavailable"),
        }

        if self.report_every > 0 && summary.tick.checked_rem(self.report_every) == Some(0) {
            info!(
                tick = summary.tick,
                carried = summary.carried,
                pending_pickups = summary.pending_pickups,
                reservations = state.reservations.len(),
                autosaved = summary.autosaved,
                "Status"
            );
        }
    }
}
