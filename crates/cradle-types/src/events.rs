//! Observable events emitted by the carrying subsystem each tick.
//!
//! Events are produced after the fact from the relationship store's change
//! journal and the state machine; nothing inside the subsystem consumes
//! them. Observers (logs, dashboards, UI toasts) do.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{DetachReason, InteractionKind};
use crate::ids::AgentId;

/// Something that happened to a carry relationship during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum CarryEvent {
    /// A pickup job was issued.
    PickupIssued {
        /// The carrier walking to the target.
        carrier_id: AgentId,
        /// The dependent being picked up.
        target_id: AgentId,
    },
    /// A pickup job ended without creating a relationship.
    PickupFailed {
        /// The carrier whose job failed.
        carrier_id: AgentId,
        /// The dependent it was walking to.
        target_id: AgentId,
    },
    /// A relationship was created.
    Attached {
        /// The carrier.
        carrier_id: AgentId,
        /// The carried dependent.
        carried_id: AgentId,
    },
    /// A relationship was removed.
    Detached {
        /// The former carrier.
        carrier_id: AgentId,
        /// The formerly carried dependent.
        carried_id: AgentId,
        /// Why it ended.
        reason: DetachReason,
    },
    /// A carried interaction started.
    InteractionStarted {
        /// The carrier performing it.
        carrier_id: AgentId,
        /// The toddler receiving it.
        toddler_id: AgentId,
        /// The interaction performed.
        kind: InteractionKind,
    },
    /// A carried interaction ran to completion and a cooldown began.
    InteractionCompleted {
        /// The carrier that performed it.
        carrier_id: AgentId,
        /// The toddler that received it.
        toddler_id: AgentId,
        /// The interaction performed.
        kind: InteractionKind,
        /// First tick at which the toddler can be interacted with again.
        cooldown_expires_at_tick: u64,
    },
    /// A carried interaction was cut short by a detach.
    InteractionInterrupted {
        /// The carrier that was performing it.
        carrier_id: AgentId,
        /// The toddler that was receiving it.
        toddler_id: AgentId,
        /// The interaction that was interrupted.
        kind: InteractionKind,
    },
}
