//! Demo command source standing in for a player.
//!
//! Every `command_interval_ticks` ticks it picks one active relationship
//! from the shared board and either plays with the toddler (random
//! interaction kind) or puts it down. Many interaction requests land on a
//! toddler that is still cooling down; those rejections are expected and
//! show up in the logs with their reason.

use std::sync::{Arc, Mutex};

use cradle_core::command::{CarryCommand, CommandError, CommandSource};
use cradle_types::{CarryRelationship, InteractionKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Relationships as of the end of the previous tick, shared between the
/// engine callback (writer) and the demo command source (reader).
pub type SharedBoard = Arc<Mutex<Vec<CarryRelationship>>>;

/// Percent of demo commands that are drops rather than interactions.
const DROP_PERCENT: u32 = 20;

/// Random player-like commands.
pub struct DemoCommandSource {
    rng: StdRng,
    interval: u64,
    board: SharedBoard,
}

impl DemoCommandSource {
    /// Create a source seeded with `seed`, acting every `interval` ticks.
    pub fn new(seed: u64, interval: u64, board: SharedBoard) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            interval,
            board,
        }
    }

    fn random_kind(&mut self) -> InteractionKind {
        match self.rng.random_range(0..3_u8) {
            0 => InteractionKind::TossUp,
            1 => InteractionKind::Tickle,
            _ => InteractionKind::Spin,
        }
    }
}

impl CommandSource for DemoCommandSource {
    fn collect_commands(&mut self, tick: u64) -> Result<Vec<CarryCommand>, CommandError> {
        if self.interval == 0 || tick.checked_rem(self.interval) != Some(0) {
            return Ok(Vec::new());
        }

        let picked = {
            let board = self.board.lock().map_err(|err| CommandError::Internal {
                message: format!("demo board unavailable: {err}"),
            })?;
            if board.is_empty() {
                return Ok(Vec::new());
            }
            let index = self.rng.random_range(0..board.len());
            board.get(index).copied()
        };
        let Some(rel) = picked else {
            return Ok(Vec::new());
        };

        let command = if self.rng.random_range(0..100) < DROP_PERCENT {
            CarryCommand::Drop {
                carrier_id: rel.carrier_id,
                toddler_id: Some(rel.carried_id),
            }
        } else {
            CarryCommand::Interact {
                carrier_id: rel.carrier_id,
                toddler_id: rel.carried_id,
                kind: self.random_kind(),
            }
        };
        Ok(vec![command])
    }
}
