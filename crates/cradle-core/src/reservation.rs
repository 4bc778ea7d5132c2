//! Reservation book: short-lived exclusive claims on pickup targets.
//!
//! A claim is taken during selection and held while the claimant's pickup
//! job runs. The tick loop releases every claim whose job has ended, so a
//! claim never outlives the job it protects.

use std::collections::BTreeMap;

use cradle_carry::ReservationOracle;
use cradle_types::AgentId;
use tracing::debug;

/// Target to claimant map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationBook {
    claims: BTreeMap<AgentId, AgentId>,
}

impl ReservationBook {
    /// Create an empty book.
    pub const fn new() -> Self {
        Self {
            claims: BTreeMap::new(),
        }
    }

    /// The agent holding the claim on `target`, if any.
    pub fn holder_of(&self, target: AgentId) -> Option<AgentId> {
        self.claims.get(&target).copied()
    }

    /// Release the claim on `target`.
    pub fn release(&mut self, target: AgentId) -> Option<AgentId> {
        self.claims.remove(&target)
    }

    /// Keep only the claims for which `keep(claimant, target)` holds.
    /// Returns how many were released.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(AgentId, AgentId) -> bool,
    {
        let before = self.claims.len();
        self.claims.retain(|target, claimant| keep(*claimant, *target));
        before.saturating_sub(self.claims.len())
    }

    /// Number of claims held.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether no claims are held.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Drop every claim (session end).
    pub fn clear(&mut self) {
        self.claims.clear();
    }
}

impl ReservationOracle for ReservationBook {
    fn try_reserve(&mut self, claimant: AgentId, target: AgentId) -> bool {
        match self.claims.get(&target) {
            Some(holder) => *holder == claimant,
            None => {
                self.claims.insert(target, claimant);
                debug!(claimant = %claimant, target = %target, "Target reserved");
                true
            }
        }
    }
}
