//! Core value structs shared across the carrying subsystem.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Facing, LifeStage};
use crate::ids::{AgentId, FactionId};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A cell on the host map grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Position {
    /// Create a position from grid coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// Computed in `i64` so no pair of `i32` coordinates can overflow.
    pub fn distance_squared(self, other: Self) -> u64 {
        let dx = i64::from(self.x).abs_diff(i64::from(other.x));
        let dy = i64::from(self.y).abs_diff(i64::from(other.y));
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Whether `other` is this cell or one of its eight neighbours.
    pub fn is_adjacent(self, other: Self) -> bool {
        let dx = i64::from(self.x).abs_diff(i64::from(other.x));
        let dy = i64::from(self.y).abs_diff(i64::from(other.y));
        dx <= 1 && dy <= 1
    }
}

// ---------------------------------------------------------------------------
// AgentView
// ---------------------------------------------------------------------------

/// Read-only view of the host agent attributes this subsystem consumes.
///
/// Views are rebuilt from host state on every query and never cached across
/// ticks, because life stage, health and faction change continuously.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentView {
    /// Stable agent identity.
    pub id: AgentId,
    /// Current life stage.
    pub life_stage: LifeStage,
    /// Faction (travel group) the agent belongs to.
    pub faction: FactionId,
    /// Species key, looked up in the capacity override table.
    pub species: String,
    /// Trait keys, looked up in the capacity modifier table.
    pub traits: BTreeSet<String>,
    /// Whether the agent is alive.
    pub alive: bool,
    /// Whether the agent is spawned on the map.
    pub spawned: bool,
    /// Whether the agent is downed (incapacitated).
    pub downed: bool,
    /// Whether the agent is drafted by the player.
    pub drafted: bool,
    /// Whether the agent can manipulate objects.
    pub can_manipulate: bool,
    /// Current map cell.
    pub position: Position,
    /// Current facing.
    pub facing: Facing,
}

// ---------------------------------------------------------------------------
// Relationship and cooldown records
// ---------------------------------------------------------------------------

/// An active carrier-to-carried relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CarryRelationship {
    /// The agent doing the carrying.
    pub carrier_id: AgentId,
    /// The dependent being carried.
    pub carried_id: AgentId,
    /// Simulation tick at which the relationship was created.
    pub attached_at_tick: u64,
}

/// A per-toddler interaction cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CooldownRecord {
    /// The toddler the cooldown applies to.
    pub toddler_id: AgentId,
    /// First tick at which a new interaction is allowed again.
    pub cooldown_expires_at_tick: u64,
}

impl CooldownRecord {
    /// Whether the cooldown still blocks interactions at tick `now`.
    pub const fn is_active(&self, now: u64) -> bool {
        self.cooldown_expires_at_tick > now
    }
}

// ---------------------------------------------------------------------------
// Persisted snapshot
// ---------------------------------------------------------------------------

/// The persisted state of the carrying subsystem.
///
/// Written on save and read back on load; entries referencing agents that
/// no longer exist are dropped during restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CarrySnapshot {
    /// Simulation tick at which the snapshot was taken.
    pub saved_at_tick: u64,
    /// Real-world time at which the snapshot was taken.
    pub saved_at: DateTime<Utc>,
    /// Active relationships, in store order.
    pub relationships: Vec<CarryRelationship>,
    /// Live cooldown records.
    pub cooldowns: Vec<CooldownRecord>,
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Per-frame presentation override for a carried agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PresentationFrame {
    /// The carried agent whose presentation is overridden.
    pub carried_id: AgentId,
    /// The carrier it is attached to.
    pub carrier_id: AgentId,
    /// Facing the carried agent is locked to (the carrier's facing).
    pub facing: Facing,
    /// Whether the carried agent's own animation must be suppressed.
    pub suppress_animation: bool,
}
