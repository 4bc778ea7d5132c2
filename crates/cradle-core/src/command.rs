//! Player and AI commands, and host lifecycle events.
//!
//! During the Commands phase the tick loop asks a [`CommandSource`] for the
//! explicit carry commands issued this tick. Lifecycle events (death,
//! drafting, faction change, ...) are queued on the simulation state by
//! whatever detects them and applied at the start of the next tick.

use std::collections::BTreeMap;

use cradle_types::{AgentId, FactionId, InteractionKind};

/// Errors that can occur while collecting commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// An internal error in the command source.
    #[error("command source error: {message}")]
    Internal {
        /// Description of the error.
        message: String,
    },
}

/// An explicit carry command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryCommand {
    /// Walk to and pick up a specific dependent.
    PickUp {
        /// The carrier.
        carrier_id: AgentId,
        /// The dependent to pick up.
        toddler_id: AgentId,
    },
    /// Put down one carried dependent, or all of them.
    Drop {
        /// The carrier.
        carrier_id: AgentId,
        /// The dependent to put down; `None` puts down everyone.
        toddler_id: Option<AgentId>,
    },
    /// Perform an interaction with a carried toddler.
    Interact {
        /// The carrier.
        carrier_id: AgentId,
        /// The carried toddler.
        toddler_id: AgentId,
        /// Which interaction.
        kind: InteractionKind,
    },
}

impl CarryCommand {
    /// The carrier the command is addressed to.
    pub const fn carrier_id(&self) -> AgentId {
        match self {
            Self::PickUp { carrier_id, .. }
            | Self::Drop { carrier_id, .. }
            | Self::Interact { carrier_id, .. } => *carrier_id,
        }
    }
}

/// A change in an agent's lifecycle that the carrying subsystem must react
/// to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The agent died.
    Died {
        /// The agent.
        agent_id: AgentId,
    },
    /// The agent left the map.
    Despawned {
        /// The agent.
        agent_id: AgentId,
    },
    /// The agent joined another faction.
    FactionChanged {
        /// The agent.
        agent_id: AgentId,
        /// Its new faction.
        faction: FactionId,
    },
    /// The player drafted the agent.
    Drafted {
        /// The agent.
        agent_id: AgentId,
    },
    /// The player released the agent from the draft.
    Undrafted {
        /// The agent.
        agent_id: AgentId,
    },
    /// The agent was incapacitated.
    Downed {
        /// The agent.
        agent_id: AgentId,
    },
    /// The agent got back up.
    Recovered {
        /// The agent.
        agent_id: AgentId,
    },
    /// The agent was ordered to a job that cannot be done while carrying.
    JobPreempted {
        /// The agent.
        agent_id: AgentId,
    },
}

/// A source of carry commands.
///
/// The engine calls [`collect_commands`] once per tick during the Commands
/// phase.
///
/// [`collect_commands`]: CommandSource::collect_commands
pub trait CommandSource {
    /// Commands issued for `tick`, in the order they should be applied.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the source fails entirely.
    fn collect_commands(&mut self, tick: u64) -> Result<Vec<CarryCommand>, CommandError>;
}

/// A command source that never issues commands; carriers act on their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubCommandSource;

impl StubCommandSource {
    /// Create a new stub command source.
    pub const fn new() -> Self {
        Self
    }
}

impl CommandSource for StubCommandSource {
    fn collect_commands(&mut self, _tick: u64) -> Result<Vec<CarryCommand>, CommandError> {
        Ok(Vec::new())
    }
}

/// A command source that replays a fixed per-tick script.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommandSource {
    script: BTreeMap<u64, Vec<CarryCommand>>,
}

impl ScriptedCommandSource {
    /// Create an empty script.
    pub const fn new() -> Self {
        Self {
            script: BTreeMap::new(),
        }
    }

    /// Schedule `command` for `tick`.
    #[must_use]
    pub fn at(mut self, tick: u64, command: CarryCommand) -> Self {
        self.push(tick, command);
        self
    }

    /// Schedule `command` for `tick`.
    pub fn push(&mut self, tick: u64, command: CarryCommand) {
        self.script.entry(tick).or_default().push(command);
    }

    /// Number of commands not yet issued.
    pub fn remaining(&self) -> usize {
        self.script.values().map(Vec::len).sum()
    }
}

impl CommandSource for ScriptedCommandSource {
    fn collect_commands(&mut self, tick: u64) -> Result<Vec<CarryCommand>, CommandError> {
        Ok(self.script.remove(&tick).unwrap_or_default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn stub_issues_nothing() {
        let mut source = StubCommandSource::new();
        assert!(source.collect_commands(1).unwrap().is_empty());
    }

    #[test]
    fn script_replays_once_per_tick() {
        let carrier = AgentId::new();
        let toddler = AgentId::new();
        let mut source = ScriptedCommandSource::new()
            .at(
                3,
                CarryCommand::PickUp {
                    carrier_id: carrier,
                    toddler_id: toddler,
                },
            )
            .at(
                3,
                CarryCommand::Drop {
                    carrier_id: carrier,
                    toddler_id: None,
                },
            );
        assert_eq!(source.remaining(), 2);
        assert!(source.collect_commands(2).unwrap().is_empty());

        let issued = source.collect_commands(3).unwrap();
        assert_eq!(issued.len(), 2);
        assert!(issued.iter().all(|c| c.carrier_id() == carrier));
        assert!(source.collect_commands(3).unwrap().is_empty());
        assert_eq!(source.remaining(), 0);
    }
}
