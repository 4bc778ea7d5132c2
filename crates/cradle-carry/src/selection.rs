//! Toddler selection for an idle carrier.
//!
//! Given a carrier and a bounded candidate pool (usually the carrier's own
//! faction), pick the nearest dependent that is not carried, reachable, and
//! exclusively reservable. Ties on distance go to the lowest agent id.
//!
//! Several carriers are evaluated in the same tick before any of them
//! mutates the store, so the store alone cannot stop two carriers from
//! choosing the same toddler. The reservation oracle is what does: only the
//! first carrier to reserve a target gets it. Reservation is attempted in
//! distance order and stops at the first success, so a carrier never holds
//! more than one claim from a single evaluation.
//!
//! Selection keeps no memory between calls.

use cradle_types::{AgentId, AgentView};
use tracing::debug;

use crate::eligibility::{CarryPolicy, has_spare_capacity};
use crate::store::CarryStore;

/// Answers whether one agent can physically get to another.
pub trait ReachabilityOracle {
    /// Whether `agent` can reach `target` from its current position.
    fn can_reach(&self, agent: &AgentView, target: &AgentView) -> bool;
}

/// Grants short-lived exclusive claims on targets.
pub trait ReservationOracle {
    /// Try to claim `target` for `claimant`.
    ///
    /// Returns `true` if the claim is now held by `claimant` (including when
    /// it already was), `false` if someone else holds it.
    fn try_reserve(&mut self, claimant: AgentId, target: AgentId) -> bool;
}

/// Pick at most one dependent for `carrier` to pick up.
///
/// Returns `None` when the carrier is not a valid carrier, has no spare
/// capacity, or no candidate survives filtering.
pub fn select_target<'a, I>(
    carrier: &AgentView,
    candidates: I,
    store: &CarryStore,
    policy: &CarryPolicy,
    reach: &dyn ReachabilityOracle,
    reservations: &mut dyn ReservationOracle,
) -> Option<AgentId>
where
    I: IntoIterator<Item = &'a AgentView>,
{
    if !policy.is_valid_carrier(carrier) || store.is_carried(carrier.id) {
        return None;
    }
    if !has_spare_capacity(policy, carrier, store) {
        return None;
    }

    let mut ranked: Vec<(u64, AgentId)> = candidates
        .into_iter()
        .filter(|c| c.id != carrier.id)
        .filter(|c| policy.can_be_carried(c))
        .filter(|c| !store.is_carried(c.id))
        .filter(|c| reach.can_reach(carrier, c))
        .map(|c| (carrier.position.distance_squared(c.position), c.id))
        .collect();
    ranked.sort_unstable();

    let chosen = ranked
        .into_iter()
        .map(|(_, id)| id)
        .find(|id| reservations.try_reserve(carrier.id, *id));

    if let Some(target) = chosen {
        debug!(carrier = %carrier.id, target = %target, "Selected pickup target");
    }
    chosen
}
