//! Error types for the cradle-carry crate.
//!
//! Every variant is a recoverable, local condition. A failed attach or
//! interaction request ends the requesting job without effect; interactive
//! callers show [`CarryError::short_reason`] on a disabled action instead.

use cradle_types::{AgentId, InteractionKind, InvalidReason};

/// Errors returned by carry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CarryError {
    /// The dependent already has an active relationship.
    #[error("{carried_id} is already carried by {carrier_id}")]
    AlreadyCarried {
        /// The dependent that was requested.
        carried_id: AgentId,
        /// The carrier currently holding it.
        carrier_id: AgentId,
    },

    /// The carrier already holds as many dependents as it may.
    #[error("{carrier_id} is at carry capacity ({capacity})")]
    CapacityExceeded {
        /// The carrier at capacity.
        carrier_id: AgentId,
        /// The carrier's capacity at the time of the request.
        capacity: u32,
    },

    /// The toddler is not carried by the requesting carrier.
    #[error("{toddler_id} is not carried by {requester_id}")]
    NotCarried {
        /// The toddler named in the request.
        toddler_id: AgentId,
        /// The carrier that made the request.
        requester_id: AgentId,
    },

    /// The toddler's interaction cooldown has not expired yet.
    #[error("{toddler_id} is on cooldown until tick {expires_at_tick}")]
    OnCooldown {
        /// The toddler on cooldown.
        toddler_id: AgentId,
        /// First tick at which interactions are allowed again.
        expires_at_tick: u64,
    },

    /// The toddler is already receiving an interaction.
    #[error("{toddler_id} is already in a {kind} interaction")]
    InteractionInProgress {
        /// The toddler being interacted with.
        toddler_id: AgentId,
        /// The running interaction.
        kind: InteractionKind,
    },

    /// Another carrier holds the reservation on the target.
    #[error("{target_id} is reserved by {holder_id}")]
    Reserved {
        /// The reserved target.
        target_id: AgentId,
        /// The carrier holding the reservation.
        holder_id: AgentId,
    },

    /// The carrier is already running a carry job.
    #[error("{carrier_id} is busy with another carry job")]
    CarrierBusy {
        /// The busy carrier.
        carrier_id: AgentId,
    },

    /// The carrier has no pickup job for the given target.
    #[error("{carrier_id} has no pending pickup of {target_id}")]
    NoPendingPickup {
        /// The carrier named in the completion callback.
        carrier_id: AgentId,
        /// The target named in the completion callback.
        target_id: AgentId,
    },

    /// The target cannot be reached from the carrier's position.
    #[error("{target_id} cannot be reached by {carrier_id}")]
    Unreachable {
        /// The carrier.
        carrier_id: AgentId,
        /// The unreachable target.
        target_id: AgentId,
    },

    /// One of the agents is not in a state that allows the operation.
    #[error("agent {agent_id} is not valid for carrying: {reason:?}")]
    InvalidAgent {
        /// The offending agent.
        agent_id: AgentId,
        /// What is wrong with it.
        reason: InvalidReason,
    },
}

impl CarryError {
    /// Short human-readable reason for a greyed-out action.
    pub const fn short_reason(&self) -> &'static str {
        match self {
            Self::AlreadyCarried { .. } => "already being carried",
            Self::CapacityExceeded { .. } => "hands are full",
            Self::NotCarried { .. } => "not carrying them",
            Self::OnCooldown { .. } => "needs a break",
            Self::InteractionInProgress { .. } => "already playing",
            Self::Reserved { .. } => "someone else is on the way",
            Self::CarrierBusy { .. } => "busy",
            Self::NoPendingPickup { .. } => "not picking them up",
            Self::Unreachable { .. } => "cannot reach",
            Self::InvalidAgent { reason, .. } => reason.short_reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_agent_uses_reason_text() {
        let err = CarryError::InvalidAgent {
            agent_id: AgentId::new(),
            reason: InvalidReason::NotDependent,
        };
        assert_eq!(err.short_reason(), "too old to be carried");
    }

    #[test]
    fn display_names_both_parties() {
        let carried_id = AgentId::new();
        let carrier_id = AgentId::new();
        let text = CarryError::AlreadyCarried {
            carried_id,
            carrier_id,
        }
        .to_string();
        assert!(text.contains(&carried_id.to_string()));
        assert!(text.contains(&carrier_id.to_string()));
    }
}
