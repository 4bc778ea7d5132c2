//! The authoritative carrier-to-carried relationship store.
//!
//! [`CarryStore`] owns the only canonical mapping of who carries whom. It is
//! created at session start, passed by reference to every component that
//! needs it, and cleared at session end. All other components hold
//! transient lookups only.
//!
//! # Invariants
//!
//! - A carried agent maps to at most one relationship.
//! - A carrier holds at most the capacity passed to [`CarryStore::attach`].
//! - An agent is never both carrier and carried.
//!
//! Mutations are serialized by `&mut self`. Under the cooperative tick model
//! that is the whole story; a multi-threaded host wraps the store in one
//! mutex rather than locking per agent.
//!
//! The store has no side effects beyond its own maps. Each mutation is
//! appended to a change journal that observers drain after the fact.

use std::collections::BTreeMap;

use cradle_types::{AgentId, CarryEvent, CarryRelationship, DetachReason, InvalidReason};
use tracing::debug;

use crate::error::CarryError;

/// One entry in the store's change journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    /// A relationship was inserted.
    Attached(CarryRelationship),
    /// A relationship was removed.
    Detached {
        /// The removed relationship.
        relationship: CarryRelationship,
        /// Why it was removed.
        reason: DetachReason,
    },
}

impl From<StoreChange> for CarryEvent {
    fn from(change: StoreChange) -> Self {
        match change {
            StoreChange::Attached(rel) => Self::Attached {
                carrier_id: rel.carrier_id,
                carried_id: rel.carried_id,
            },
            StoreChange::Detached {
                relationship,
                reason,
            } => Self::Detached {
                carrier_id: relationship.carrier_id,
                carried_id: relationship.carried_id,
                reason,
            },
        }
    }
}

/// Process-wide map of active carry relationships.
#[derive(Debug, Clone, Default)]
pub struct CarryStore {
    /// Canonical relationships keyed by the carried agent.
    by_carried: BTreeMap<AgentId, CarryRelationship>,
    /// Carried agents per carrier, in attach order.
    by_carrier: BTreeMap<AgentId, Vec<AgentId>>,
    /// Mutations since the last [`CarryStore::drain_changes`].
    journal: Vec<StoreChange>,
}

impl CarryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            by_carried: BTreeMap::new(),
            by_carrier: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    /// Create a relationship between `carrier_id` and `carried_id`.
    ///
    /// `capacity` is the carrier's capacity as computed by the policy at
    /// call time. The carried agent's state is re-checked here regardless of
    /// what the caller validated earlier in the tick.
    ///
    /// # Errors
    ///
    /// - [`CarryError::AlreadyCarried`] if `carried_id` already has a carrier.
    /// - [`CarryError::CapacityExceeded`] if the carrier holds `capacity`
    ///   dependents already.
    /// - [`CarryError::InvalidAgent`] for self-carry, a carried carrier, or a
    ///   carried agent that is itself carrying.
    pub fn attach(
        &mut self,
        carrier_id: AgentId,
        carried_id: AgentId,
        capacity: u32,
        tick: u64,
    ) -> Result<CarryRelationship, CarryError> {
        if carrier_id == carried_id {
            return Err(CarryError::InvalidAgent {
                agent_id: carrier_id,
                reason: InvalidReason::SelfCarry,
            });
        }
        if let Some(existing) = self.by_carried.get(&carried_id) {
            return Err(CarryError::AlreadyCarried {
                carried_id,
                carrier_id: existing.carrier_id,
            });
        }
        if self.by_carried.contains_key(&carrier_id) {
            return Err(CarryError::InvalidAgent {
                agent_id: carrier_id,
                reason: InvalidReason::CarrierIsCarried,
            });
        }
        if !self.carried_by(carried_id).is_empty() {
            return Err(CarryError::InvalidAgent {
                agent_id: carried_id,
                reason: InvalidReason::CarriedIsCarrying,
            });
        }
        let held = u32::try_from(self.count_carried_by(carrier_id)).unwrap_or(u32::MAX);
        if held >= capacity {
            return Err(CarryError::CapacityExceeded {
                carrier_id,
                capacity,
            });
        }

        let relationship = CarryRelationship {
            carrier_id,
            carried_id,
            attached_at_tick: tick,
        };
        self.by_carried.insert(carried_id, relationship);
        self.by_carrier
            .entry(carrier_id)
            .or_default()
            .push(carried_id);
        self.journal.push(StoreChange::Attached(relationship));

        debug!(carrier = %carrier_id, carried = %carried_id, tick, "Relationship attached");
        Ok(relationship)
    }

    /// Remove the relationship of `carried_id` as a voluntary drop.
    ///
    /// Returns the removed relationship, or `None` if there was none.
    /// Calling it again for the same id is a no-op.
    pub fn detach(&mut self, carried_id: AgentId) -> Option<CarryRelationship> {
        self.detach_with_reason(carried_id, DetachReason::Dropped)
    }

    /// Remove the relationship of `carried_id`, recording `reason`.
    pub fn detach_with_reason(
        &mut self,
        carried_id: AgentId,
        reason: DetachReason,
    ) -> Option<CarryRelationship> {
        let relationship = self.by_carried.remove(&carried_id)?;
        if let Some(held) = self.by_carrier.get_mut(&relationship.carrier_id) {
            held.retain(|id| *id != carried_id);
            if held.is_empty() {
                self.by_carrier.remove(&relationship.carrier_id);
            }
        }
        self.journal.push(StoreChange::Detached {
            relationship,
            reason,
        });

        debug!(
            carrier = %relationship.carrier_id,
            carried = %carried_id,
            %reason,
            "Relationship detached"
        );
        Some(relationship)
    }

    /// Remove every relationship held by `carrier_id`, recording `reason`.
    ///
    /// Returns the removed relationships in attach order.
    pub fn detach_all_from(
        &mut self,
        carrier_id: AgentId,
        reason: DetachReason,
    ) -> Vec<CarryRelationship> {
        let held = self.carried_by(carrier_id).to_vec();
        held.into_iter()
            .filter_map(|carried_id| self.detach_with_reason(carried_id, reason))
            .collect()
    }

    /// Remove any relationship in which `agent_id` is either party.
    ///
    /// Called by lifecycle hooks when an agent dies, despawns, or changes
    /// faction. Never fails; unknown ids are a no-op.
    pub fn invalidate(&mut self, agent_id: AgentId) -> Vec<CarryRelationship> {
        let mut removed = Vec::new();
        if let Some(rel) = self.detach_with_reason(agent_id, DetachReason::Invalidated) {
            removed.push(rel);
        }
        removed.extend(self.detach_all_from(agent_id, DetachReason::Invalidated));
        removed
    }

    /// Whether `agent_id` is currently carried.
    pub fn is_carried(&self, agent_id: AgentId) -> bool {
        self.by_carried.contains_key(&agent_id)
    }

    /// The carrier of `agent_id`, if it is carried.
    pub fn carrier_of(&self, agent_id: AgentId) -> Option<AgentId> {
        self.by_carried.get(&agent_id).map(|rel| rel.carrier_id)
    }

    /// The relationship in which `agent_id` is carried, if any.
    pub fn relationship_of(&self, agent_id: AgentId) -> Option<&CarryRelationship> {
        self.by_carried.get(&agent_id)
    }

    /// Agents carried by `carrier_id`, in attach order.
    pub fn carried_by(&self, carrier_id: AgentId) -> &[AgentId] {
        self.by_carrier
            .get(&carrier_id)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Number of agents carried by `carrier_id`.
    pub fn count_carried_by(&self, carrier_id: AgentId) -> usize {
        self.carried_by(carrier_id).len()
    }

    /// Whether `agent_id` is carrying anyone.
    pub fn is_carrying(&self, agent_id: AgentId) -> bool {
        self.by_carrier.contains_key(&agent_id)
    }

    /// All relationships, grouped by carrier in id order and in attach
    /// order within each carrier.
    pub fn relationships(&self) -> impl Iterator<Item = &CarryRelationship> {
        self.by_carrier
            .values()
            .flat_map(|held| held.iter())
            .filter_map(|carried_id| self.by_carried.get(carried_id))
    }

    /// Carriers currently holding at least one dependent, in id order.
    pub fn carriers(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.by_carrier.keys().copied()
    }

    /// Number of active relationships.
    pub fn len(&self) -> usize {
        self.by_carried.len()
    }

    /// Whether there are no active relationships.
    pub fn is_empty(&self) -> bool {
        self.by_carried.is_empty()
    }

    /// Take the change journal accumulated since the last drain.
    pub fn drain_changes(&mut self) -> Vec<StoreChange> {
        core::mem::take(&mut self.journal)
    }

    /// Drop every relationship and the journal (session end).
    pub fn clear(&mut self) {
        self.by_carried.clear();
        self.by_carrier.clear();
        self.journal.clear();
    }
}
