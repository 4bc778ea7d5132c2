//! Enumeration types for the carrying subsystem.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Life stages
// ---------------------------------------------------------------------------

/// Developmental stage of an agent, derived by the host from its age.
///
/// Variants are declared youngest first so `Ord` follows growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum LifeStage {
    /// Just born, cannot move on its own.
    Newborn,
    /// Crawling infant.
    Baby,
    /// Walking but still dependent.
    Toddler,
    /// Independent but not yet adult.
    Child,
    /// Fully grown.
    Adult,
}

impl LifeStage {
    /// Whether this stage is inside the dependent range (newborn, baby,
    /// toddler). Only dependents can be carried.
    pub const fn is_dependent(self) -> bool {
        matches!(self, Self::Newborn | Self::Baby | Self::Toddler)
    }

    /// Whether this stage counts as adult-equivalent for carrying others.
    pub const fn is_adult(self) -> bool {
        matches!(self, Self::Adult)
    }
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// A special interaction a carrier can perform with a carried toddler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum InteractionKind {
    /// Throw the toddler gently into the air and catch it.
    TossUp,
    /// Tickle the toddler.
    Tickle,
    /// Spin around holding the toddler.
    Spin,
}

impl InteractionKind {
    /// All interaction kinds, in declaration order.
    pub const ALL: [Self; 3] = [Self::TossUp, Self::Tickle, Self::Spin];

    /// Short label used in logs and action menus.
    pub const fn label(self) -> &'static str {
        match self {
            Self::TossUp => "toss up",
            Self::Tickle => "tickle",
            Self::Spin => "spin",
        }
    }
}

impl core::fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Carry lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a carry relationship, seen from either party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CarryState {
    /// No relationship and no pickup in flight.
    Idle,
    /// A pickup job has been issued but the carrier has not arrived yet.
    PendingPickup,
    /// The relationship exists in the store.
    Attached,
    /// A carried interaction is running on the relationship.
    Interacting,
}

/// Why a carry relationship ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum DetachReason {
    /// The carrier or the player chose to put the dependent down.
    Dropped,
    /// The carrier was drafted.
    Drafted,
    /// The carrier was downed.
    Downed,
    /// The carrier was ordered onto a job incompatible with carrying.
    JobPreempted,
    /// The carried agent grew past the dependent life stages.
    Outgrown,
    /// The carrier no longer qualifies as a carrier.
    CarrierIneligible,
    /// One of the two agents died, despawned, or changed faction.
    Invalidated,
}

impl core::fmt::Display for DetachReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Self::Dropped => "dropped",
            Self::Drafted => "drafted",
            Self::Downed => "downed",
            Self::JobPreempted => "job_preempted",
            Self::Outgrown => "outgrown",
            Self::CarrierIneligible => "carrier_ineligible",
            Self::Invalidated => "invalidated",
        };
        f.write_str(text)
    }
}

/// Why an agent cannot take part in a carry operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum InvalidReason {
    /// The agent is dead.
    Dead,
    /// The agent is not spawned on the map.
    Despawned,
    /// The agent is downed.
    Downed,
    /// The agent's faction differs from the other party's, e.g. after a
    /// faction change.
    FactionChanged,
    /// The agent is not in a dependent life stage.
    NotDependent,
    /// The agent is not adult or cannot manipulate.
    NotCarrier,
    /// The carrier and the carried agent are the same agent.
    SelfCarry,
    /// The would-be carrier is itself being carried.
    CarrierIsCarried,
    /// The would-be carried agent is currently carrying others.
    CarriedIsCarrying,
    /// The agent is unknown to the host.
    Unknown,
}

impl InvalidReason {
    /// Short human-readable reason for a greyed-out action.
    pub const fn short_reason(self) -> &'static str {
        match self {
            Self::Dead => "dead",
            Self::Despawned => "not on the map",
            Self::Downed => "downed",
            Self::FactionChanged => "from another faction",
            Self::NotDependent => "too old to be carried",
            Self::NotCarrier => "cannot carry",
            Self::SelfCarry => "cannot carry self",
            Self::CarrierIsCarried => "is being carried",
            Self::CarriedIsCarrying => "is carrying someone",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Orientation
// ---------------------------------------------------------------------------

/// Cardinal facing of an agent on the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Facing {
    /// Towards +y.
    North,
    /// Towards +x.
    East,
    /// Towards -y.
    #[default]
    South,
    /// Towards -x.
    West,
}

impl Facing {
    /// Facing for a single movement step, or `None` for a zero step.
    ///
    /// Horizontal movement wins on diagonals, matching how sprites are
    /// usually drawn side-on while walking diagonally.
    pub const fn from_step(dx: i32, dy: i32) -> Option<Self> {
        if dx > 0 {
            Some(Self::East)
        } else if dx < 0 {
            Some(Self::West)
        } else if dy > 0 {
            Some(Self::North)
        } else if dy < 0 {
            Some(Self::South)
        } else {
            None
        }
    }
}
