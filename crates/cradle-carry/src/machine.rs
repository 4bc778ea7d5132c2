//! The carry state machine.
//!
//! Tracks the carry-specific job each carrier is running and drives every
//! transition that touches the [`CarryStore`]:
//!
//! ```text
//! Idle --select--> PendingPickup --complete_pickup--> Attached
//!                      |                                 |  ^
//!               abandon/invalidate           start_interaction | finish_interaction
//!                      v                                 v  |
//!                    Idle  <------ drop/interrupt ----- Interacting
//! ```
//!
//! The store is never mutated while a pickup is pending. A pickup that
//! fails at completion time ends with no partial state. Forced
//! interruption detaches everything a carrier holds before its next job
//! starts.

use std::collections::BTreeMap;

use cradle_types::{
    AgentId, AgentView, CarryEvent, CarryRelationship, CarryState, DetachReason, InteractionKind,
};
use tracing::{debug, info};

use crate::eligibility::{CarryPolicy, carried_problem, faction_problem};
use crate::error::CarryError;
use crate::selection::ReachabilityOracle;
use crate::store::CarryStore;

/// The carry job a carrier is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierJob {
    /// Walking to a reserved dependent.
    PendingPickup {
        /// The dependent being picked up.
        target_id: AgentId,
        /// Tick the job was issued.
        issued_at_tick: u64,
    },
    /// Performing a carried interaction.
    Interacting {
        /// The carried toddler.
        toddler_id: AgentId,
        /// The interaction being performed.
        kind: InteractionKind,
        /// Tick the interaction started.
        started_at_tick: u64,
        /// Tick at which the interaction finishes naturally.
        completes_at_tick: u64,
    },
}

/// An interaction that has run its full duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueInteraction {
    /// The carrier performing it.
    pub carrier_id: AgentId,
    /// The toddler receiving it.
    pub toddler_id: AgentId,
    /// The interaction.
    pub kind: InteractionKind,
}

/// Per-carrier carry jobs and the events produced by their transitions.
#[derive(Debug, Clone, Default)]
pub struct CarryMachine {
    /// Active carry job per carrier.
    jobs: BTreeMap<AgentId, CarrierJob>,
    /// Events since the last drain.
    events: Vec<CarryEvent>,
}

impl CarryMachine {
    /// Create a machine with no jobs.
    pub const fn new() -> Self {
        Self {
            jobs: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// The job `carrier_id` is running, if any.
    pub fn job_of(&self, carrier_id: AgentId) -> Option<&CarrierJob> {
        self.jobs.get(&carrier_id)
    }

    /// Whether `carrier_id` has no carry job running.
    pub fn is_idle(&self, carrier_id: AgentId) -> bool {
        !self.jobs.contains_key(&carrier_id)
    }

    /// The dependent `carrier_id` is walking to, if it has a pending pickup.
    pub fn pending_target(&self, carrier_id: AgentId) -> Option<AgentId> {
        match self.jobs.get(&carrier_id) {
            Some(CarrierJob::PendingPickup { target_id, .. }) => Some(*target_id),
            _ => None,
        }
    }

    /// All pending pickups as `(carrier, target)` pairs, in carrier order.
    pub fn pending_pickups(&self) -> impl Iterator<Item = (AgentId, AgentId)> + '_ {
        self.jobs.iter().filter_map(|(carrier, job)| match job {
            CarrierJob::PendingPickup { target_id, .. } => Some((*carrier, *target_id)),
            CarrierJob::Interacting { .. } => None,
        })
    }

    /// The running interaction on `toddler_id`, as `(carrier, kind)`.
    pub fn interaction_on(&self, toddler_id: AgentId) -> Option<(AgentId, InteractionKind)> {
        self.jobs.iter().find_map(|(carrier, job)| match job {
            CarrierJob::Interacting {
                toddler_id: t,
                kind,
                ..
            } if *t == toddler_id => Some((*carrier, *kind)),
            _ => None,
        })
    }

    /// The lifecycle state of `agent_id`, from either side of a
    /// relationship.
    pub fn state_of(&self, store: &CarryStore, agent_id: AgentId) -> CarryState {
        match self.jobs.get(&agent_id) {
            Some(CarrierJob::Interacting { .. }) => return CarryState::Interacting,
            Some(CarrierJob::PendingPickup { .. }) => return CarryState::PendingPickup,
            None => {}
        }
        if self.interaction_on(agent_id).is_some() {
            return CarryState::Interacting;
        }
        if store.is_carried(agent_id) || store.is_carrying(agent_id) {
            return CarryState::Attached;
        }
        if self.pending_pickups().any(|(_, target)| target == agent_id) {
            return CarryState::PendingPickup;
        }
        CarryState::Idle
    }

    // -----------------------------------------------------------------------
    // Pickup
    // -----------------------------------------------------------------------

    /// Issue a pickup job for `carrier_id` against `target_id`.
    ///
    /// Called after selection produced a target. Does not touch the store.
    ///
    /// # Errors
    ///
    /// Returns [`CarryError::CarrierBusy`] if the carrier already runs a
    /// carry job.
    pub fn begin_pickup(
        &mut self,
        carrier_id: AgentId,
        target_id: AgentId,
        tick: u64,
    ) -> Result<(), CarryError> {
        if self.jobs.contains_key(&carrier_id) {
            return Err(CarryError::CarrierBusy { carrier_id });
        }
        self.jobs.insert(
            carrier_id,
            CarrierJob::PendingPickup {
                target_id,
                issued_at_tick: tick,
            },
        );
        self.events.push(CarryEvent::PickupIssued {
            carrier_id,
            target_id,
        });
        debug!(carrier = %carrier_id, target = %target_id, tick, "Pickup issued");
        Ok(())
    }

    /// Finish the pickup job of `carrier` on arrival next to `target`.
    ///
    /// The job ends whatever the outcome. On success the relationship is
    /// created in the store; on failure nothing changes.
    ///
    /// # Errors
    ///
    /// - [`CarryError::NoPendingPickup`] if the carrier is not picking up
    ///   `target`.
    /// - [`CarryError::InvalidAgent`] if either agent stopped qualifying.
    /// - [`CarryError::Unreachable`] if the carrier is not adjacent to or
    ///   cannot reach the target.
    /// - Any error from [`CarryStore::attach`].
    pub fn complete_pickup(
        &mut self,
        store: &mut CarryStore,
        policy: &CarryPolicy,
        reach: &dyn ReachabilityOracle,
        carrier: &AgentView,
        target: &AgentView,
        tick: u64,
    ) -> Result<CarryRelationship, CarryError> {
        if self.pending_target(carrier.id) != Some(target.id) {
            return Err(CarryError::NoPendingPickup {
                carrier_id: carrier.id,
                target_id: target.id,
            });
        }
        self.jobs.remove(&carrier.id);

        let result = Self::validate_arrival(policy, reach, carrier, target).and_then(|()| {
            store.attach(
                carrier.id,
                target.id,
                policy.max_carry_capacity(carrier),
                tick,
            )
        });

        match &result {
            Ok(_) => info!(carrier = %carrier.id, carried = %target.id, tick, "Picked up"),
            Err(err) => {
                self.events.push(CarryEvent::PickupFailed {
                    carrier_id: carrier.id,
                    target_id: target.id,
                });
                debug!(carrier = %carrier.id, target = %target.id, error = %err, "Pickup failed");
            }
        }
        result
    }

    fn validate_arrival(
        policy: &CarryPolicy,
        reach: &dyn ReachabilityOracle,
        carrier: &AgentView,
        target: &AgentView,
    ) -> Result<(), CarryError> {
        if let Some(reason) = policy.carrier_problem(carrier) {
            return Err(CarryError::InvalidAgent {
                agent_id: carrier.id,
                reason,
            });
        }
        if let Some(reason) = carried_problem(target).or_else(|| faction_problem(carrier, target)) {
            return Err(CarryError::InvalidAgent {
                agent_id: target.id,
                reason,
            });
        }
        if !carrier.position.is_adjacent(target.position) || !reach.can_reach(carrier, target) {
            return Err(CarryError::Unreachable {
                carrier_id: carrier.id,
                target_id: target.id,
            });
        }
        Ok(())
    }

    /// End the pending pickup of `carrier_id` without effect.
    ///
    /// Returns the abandoned target, or `None` if there was no pickup.
    pub fn abandon_pickup(&mut self, carrier_id: AgentId) -> Option<AgentId> {
        let target_id = self.pending_target(carrier_id)?;
        self.jobs.remove(&carrier_id);
        self.events.push(CarryEvent::PickupFailed {
            carrier_id,
            target_id,
        });
        debug!(carrier = %carrier_id, target = %target_id, "Pickup abandoned");
        Some(target_id)
    }

    // -----------------------------------------------------------------------
    // Interactions
    // -----------------------------------------------------------------------

    /// Enter the interacting state. Gating (carried-by, cooldown) is done
    /// by the cooldown manager before this is called.
    pub(crate) fn begin_interaction(
        &mut self,
        carrier_id: AgentId,
        toddler_id: AgentId,
        kind: InteractionKind,
        started_at_tick: u64,
        completes_at_tick: u64,
    ) {
        self.jobs.insert(
            carrier_id,
            CarrierJob::Interacting {
                toddler_id,
                kind,
                started_at_tick,
                completes_at_tick,
            },
        );
        self.events.push(CarryEvent::InteractionStarted {
            carrier_id,
            toddler_id,
            kind,
        });
    }

    /// Leave the interacting state of `carrier_id`, returning what it was
    /// doing.
    pub(crate) fn end_interaction(
        &mut self,
        carrier_id: AgentId,
    ) -> Option<(AgentId, InteractionKind)> {
        match self.jobs.get(&carrier_id) {
            Some(CarrierJob::Interacting {
                toddler_id, kind, ..
            }) => {
                let ended = (*toddler_id, *kind);
                self.jobs.remove(&carrier_id);
                Some(ended)
            }
            _ => None,
        }
    }

    /// Record an event produced on behalf of the machine.
    pub(crate) fn push_event(&mut self, event: CarryEvent) {
        self.events.push(event);
    }

    /// Interactions whose duration has elapsed at tick `now`.
    pub fn due_interactions(&self, now: u64) -> Vec<DueInteraction> {
        self.jobs
            .iter()
            .filter_map(|(carrier, job)| match job {
                CarrierJob::Interacting {
                    toddler_id,
                    kind,
                    completes_at_tick,
                    ..
                } if *completes_at_tick <= now => Some(DueInteraction {
                    carrier_id: *carrier,
                    toddler_id: *toddler_id,
                    kind: *kind,
                }),
                _ => None,
            })
            .collect()
    }

    fn interrupt_interaction(&mut self, carrier_id: AgentId) {
        if let Some((toddler_id, kind)) = self.end_interaction(carrier_id) {
            self.events.push(CarryEvent::InteractionInterrupted {
                carrier_id,
                toddler_id,
                kind,
            });
            debug!(carrier = %carrier_id, toddler = %toddler_id, %kind, "Interaction interrupted");
        }
    }

    // -----------------------------------------------------------------------
    // Detach
    // -----------------------------------------------------------------------

    /// Voluntarily put down `toddler_id`, or everything if `None`.
    ///
    /// An interaction on a dropped toddler is interrupted.
    pub fn drop_carried(
        &mut self,
        store: &mut CarryStore,
        carrier_id: AgentId,
        toddler_id: Option<AgentId>,
    ) -> Vec<CarryRelationship> {
        let targets: Vec<AgentId> = match toddler_id {
            Some(id) if store.carrier_of(id) == Some(carrier_id) => vec![id],
            Some(_) => Vec::new(),
            None => store.carried_by(carrier_id).to_vec(),
        };

        let mut dropped = Vec::with_capacity(targets.len());
        for id in targets {
            if self.interaction_on(id).map(|(c, _)| c) == Some(carrier_id) {
                self.interrupt_interaction(carrier_id);
            }
            if let Some(rel) = store.detach_with_reason(id, DetachReason::Dropped) {
                dropped.push(rel);
            }
        }
        dropped
    }

    /// Forcibly end every carry activity of `carrier_id`.
    ///
    /// Used when the carrier is drafted, downed, or preempted by an
    /// incompatible job. A pending pickup is abandoned, a running
    /// interaction is interrupted, and every relationship is detached, all
    /// before this returns.
    pub fn interrupt(
        &mut self,
        store: &mut CarryStore,
        carrier_id: AgentId,
        reason: DetachReason,
    ) -> Vec<CarryRelationship> {
        self.abandon_pickup(carrier_id);
        self.interrupt_interaction(carrier_id);
        let detached = store.detach_all_from(carrier_id, reason);
        if !detached.is_empty() {
            info!(
                carrier = %carrier_id,
                count = detached.len(),
                %reason,
                "Carrier interrupted, dependents put down"
            );
        }
        detached
    }

    /// Remove `agent_id` from every relationship and job it takes part in.
    ///
    /// Called by lifecycle hooks (death, despawn, faction change). Never
    /// fails.
    pub fn invalidate(&mut self, store: &mut CarryStore, agent_id: AgentId) -> Vec<CarryRelationship> {
        // As a carrier.
        self.abandon_pickup(agent_id);
        self.interrupt_interaction(agent_id);

        // As a target or a carried toddler.
        let chasing: Vec<AgentId> = self
            .pending_pickups()
            .filter(|(_, target)| *target == agent_id)
            .map(|(carrier, _)| carrier)
            .collect();
        for carrier in chasing {
            self.abandon_pickup(carrier);
        }
        if let Some((carrier, _)) = self.interaction_on(agent_id) {
            self.interrupt_interaction(carrier);
        }

        store.invalidate(agent_id)
    }

    /// Re-check every relationship against current agent state.
    ///
    /// `lookup` returns the current view of an agent, or `None` if the host
    /// no longer knows it. Detaches:
    /// - relationships with an unknown party ([`DetachReason::Invalidated`]),
    /// - dependents that stopped qualifying, e.g. grew past toddler
    ///   ([`DetachReason::Outgrown`]),
    /// - pairs whose factions no longer match ([`DetachReason::Invalidated`]),
    /// - everything held by a downed carrier ([`DetachReason::Downed`]) or
    ///   one that otherwise stopped qualifying
    ///   ([`DetachReason::CarrierIneligible`]),
    /// - the most recently attached dependents of a carrier whose capacity
    ///   dropped below what it holds.
    pub fn revalidate<F>(
        &mut self,
        store: &mut CarryStore,
        policy: &CarryPolicy,
        lookup: F,
    ) -> Vec<CarryRelationship>
    where
        F: Fn(AgentId) -> Option<AgentView>,
    {
        let mut detached = Vec::new();
        let carriers: Vec<AgentId> = store.carriers().collect();

        for carrier_id in carriers {
            let Some(carrier) = lookup(carrier_id) else {
                detached.extend(self.interrupt(store, carrier_id, DetachReason::Invalidated));
                continue;
            };
            if let Some(reason) = policy.carrier_problem(&carrier) {
                let why = if carrier.downed {
                    DetachReason::Downed
                } else {
                    DetachReason::CarrierIneligible
                };
                debug!(carrier = %carrier_id, ?reason, "Carrier no longer qualifies");
                detached.extend(self.interrupt(store, carrier_id, why));
                continue;
            }

            for carried_id in store.carried_by(carrier_id).to_vec() {
                let why = match lookup(carried_id) {
                    None => Some(DetachReason::Invalidated),
                    Some(view) if !policy.can_be_carried(&view) => Some(DetachReason::Outgrown),
                    Some(view) if faction_problem(&carrier, &view).is_some() => {
                        Some(DetachReason::Invalidated)
                    }
                    Some(_) => None,
                };
                if let Some(why) = why {
                    if self.interaction_on(carried_id).is_some() {
                        self.interrupt_interaction(carrier_id);
                    }
                    detached.extend(store.detach_with_reason(carried_id, why));
                }
            }

            let capacity = usize::try_from(policy.max_carry_capacity(&carrier)).unwrap_or(0);
            let held = store.carried_by(carrier_id).to_vec();
            for carried_id in held.iter().skip(capacity).copied() {
                if self.interaction_on(carried_id).is_some() {
                    self.interrupt_interaction(carrier_id);
                }
                detached.extend(
                    store.detach_with_reason(carried_id, DetachReason::CarrierIneligible),
                );
            }
        }
        detached
    }

    /// Take the events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<CarryEvent> {
        core::mem::take(&mut self.events)
    }

    /// Drop every job and event (session end).
    pub fn clear(&mut self) {
        self.jobs.clear();
        self.events.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cradle_types::{LifeStage, Position};

    use super::*;
    use crate::eligibility::tests::view;

    struct Everywhere;

    impl ReachabilityOracle for Everywhere {
        fn can_reach(&self, _agent: &AgentView, _target: &AgentView) -> bool {
            true
        }
    }

    struct Nowhere;

    impl ReachabilityOracle for Nowhere {
        fn can_reach(&self, _agent: &AgentView, _target: &AgentView) -> bool {
            false
        }
    }

    fn pair() -> (AgentView, AgentView) {
        let carrier = view(LifeStage::Adult);
        let mut toddler = view(LifeStage::Toddler);
        toddler.position = Position::new(1, 0);
        (carrier, toddler)
    }

    #[test]
    fn pending_pickup_does_not_touch_store() {
        let (carrier, toddler) = pair();
        let store = CarryStore::new();
        let mut machine = CarryMachine::new();

        machine.begin_pickup(carrier.id, toddler.id, 1).unwrap();
        assert!(store.is_empty());
        assert_eq!(machine.state_of(&store, carrier.id), CarryState::PendingPickup);
        assert_eq!(machine.state_of(&store, toddler.id), CarryState::PendingPickup);
        assert!(matches!(
            machine.begin_pickup(carrier.id, AgentId::new(), 1),
            Err(CarryError::CarrierBusy { .. })
        ));
    }

    #[test]
    fn completed_pickup_attaches() {
        let (carrier, toddler) = pair();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        let policy = CarryPolicy::default();

        machine.begin_pickup(carrier.id, toddler.id, 1).unwrap();
        let rel = machine
            .complete_pickup(&mut store, &policy, &Everywhere, &carrier, &toddler, 4)
            .unwrap();
        assert_eq!(rel.attached_at_tick, 4);
        assert_eq!(store.carrier_of(toddler.id), Some(carrier.id));
        assert!(machine.is_idle(carrier.id));
        assert_eq!(machine.state_of(&store, toddler.id), CarryState::Attached);
    }

    #[test]
    fn pickup_of_claimed_target_ends_without_effect() {
        let (carrier, toddler) = pair();
        let rival = AgentId::new();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();

        machine.begin_pickup(carrier.id, toddler.id, 1).unwrap();
        store.attach(rival, toddler.id, 1, 2).unwrap();

        let result = machine.complete_pickup(
            &mut store,
            &CarryPolicy::default(),
            &Everywhere,
            &carrier,
            &toddler,
            3,
        );
        assert!(matches!(result, Err(CarryError::AlreadyCarried { .. })));
        assert_eq!(store.carrier_of(toddler.id), Some(rival));
        assert_eq!(store.count_carried_by(carrier.id), 0);
        assert!(machine.is_idle(carrier.id));
        assert!(machine
            .drain_events()
            .contains(&CarryEvent::PickupFailed {
                carrier_id: carrier.id,
                target_id: toddler.id,
            }));
    }

    #[test]
    fn pickup_requires_adjacency_and_reachability() {
        let (carrier, mut toddler) = pair();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        let policy = CarryPolicy::default();

        toddler.position = Position::new(5, 5);
        machine.begin_pickup(carrier.id, toddler.id, 1).unwrap();
        let result =
            machine.complete_pickup(&mut store, &policy, &Everywhere, &carrier, &toddler, 2);
        assert!(matches!(result, Err(CarryError::Unreachable { .. })));

        toddler.position = Position::new(1, 1);
        machine.begin_pickup(carrier.id, toddler.id, 3).unwrap();
        let result = machine.complete_pickup(&mut store, &policy, &Nowhere, &carrier, &toddler, 4);
        assert!(matches!(result, Err(CarryError::Unreachable { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn arrival_rejects_a_dependent_of_another_faction() {
        let (carrier, mut toddler) = pair();
        toddler.faction = cradle_types::FactionId::from(uuid::Uuid::from_u128(200));
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();

        machine.begin_pickup(carrier.id, toddler.id, 1).unwrap();
        let result = machine.complete_pickup(
            &mut store,
            &CarryPolicy::default(),
            &Everywhere,
            &carrier,
            &toddler,
            2,
        );
        assert_eq!(
            result,
            Err(CarryError::InvalidAgent {
                agent_id: toddler.id,
                reason: cradle_types::InvalidReason::FactionChanged,
            })
        );
        assert!(store.is_empty());
        assert!(machine.is_idle(carrier.id));
    }

    #[test]
    fn completion_without_pending_job_is_rejected() {
        let (carrier, toddler) = pair();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        let result = machine.complete_pickup(
            &mut store,
            &CarryPolicy::default(),
            &Everywhere,
            &carrier,
            &toddler,
            1,
        );
        assert!(matches!(result, Err(CarryError::NoPendingPickup { .. })));
    }

    #[test]
    fn forced_interrupt_detaches_everything() {
        let (carrier, toddler) = pair();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        store.attach(carrier.id, toddler.id, 1, 0).unwrap();

        let detached = machine.interrupt(&mut store, carrier.id, DetachReason::Drafted);
        assert_eq!(detached.len(), 1);
        assert_eq!(store.carrier_of(toddler.id), None);
        assert_eq!(machine.state_of(&store, carrier.id), CarryState::Idle);
    }

    #[test]
    fn interrupt_abandons_pending_pickup() {
        let (carrier, toddler) = pair();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        machine.begin_pickup(carrier.id, toddler.id, 0).unwrap();

        machine.interrupt(&mut store, carrier.id, DetachReason::JobPreempted);
        assert!(machine.is_idle(carrier.id));
        assert_eq!(machine.pending_pickups().count(), 0);
    }

    #[test]
    fn invalidating_a_target_cancels_pickups_on_it() {
        let (carrier, toddler) = pair();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        machine.begin_pickup(carrier.id, toddler.id, 0).unwrap();

        machine.invalidate(&mut store, toddler.id);
        assert!(machine.is_idle(carrier.id));
    }

    #[test]
    fn drop_specific_toddler_keeps_others() {
        let carrier = view(LifeStage::Adult);
        let t1 = view(LifeStage::Toddler);
        let t2 = view(LifeStage::Baby);
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        store.attach(carrier.id, t1.id, 2, 0).unwrap();
        store.attach(carrier.id, t2.id, 2, 0).unwrap();

        let dropped = machine.drop_carried(&mut store, carrier.id, Some(t1.id));
        assert_eq!(dropped.len(), 1);
        assert_eq!(store.carried_by(carrier.id), &[t2.id]);

        // Dropping someone you do not hold does nothing.
        assert!(machine.drop_carried(&mut store, carrier.id, Some(t1.id)).is_empty());

        let dropped = machine.drop_carried(&mut store, carrier.id, None);
        assert_eq!(dropped.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn revalidate_detaches_outgrown_and_downed() {
        let carrier = view(LifeStage::Adult);
        let mut grown = view(LifeStage::Toddler);
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        let policy = CarryPolicy::default();
        store.attach(carrier.id, grown.id, 1, 0).unwrap();

        grown.life_stage = LifeStage::Child;
        let views = [carrier.clone(), grown.clone()];
        let detached = machine.revalidate(&mut store, &policy, |id| {
            views.iter().find(|v| v.id == id).cloned()
        });
        assert_eq!(detached.len(), 1);
        assert!(store.is_empty());
        let changes = store.drain_changes();
        assert!(changes.iter().any(|c| matches!(
            c,
            crate::store::StoreChange::Detached {
                reason: DetachReason::Outgrown,
                ..
            }
        )));

        let toddler = view(LifeStage::Toddler);
        let mut downed = carrier;
        store.attach(downed.id, toddler.id, 1, 0).unwrap();
        downed.downed = true;
        let views = [downed.clone(), toddler.clone()];
        machine.revalidate(&mut store, &policy, |id| views.iter().find(|v| v.id == id).cloned());
        assert!(!store.is_carried(toddler.id));
    }

    #[test]
    fn revalidate_detaches_pairs_split_across_factions() {
        let (carrier, mut toddler) = pair();
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        store.attach(carrier.id, toddler.id, 1, 0).unwrap();
        store.drain_changes();

        toddler.faction = cradle_types::FactionId::from(uuid::Uuid::from_u128(200));
        let views = [carrier.clone(), toddler.clone()];
        let detached = machine.revalidate(&mut store, &CarryPolicy::default(), |id| {
            views.iter().find(|v| v.id == id).cloned()
        });

        assert_eq!(detached.len(), 1);
        assert_eq!(store.carrier_of(toddler.id), None);
        let changes = store.drain_changes();
        assert!(matches!(
            changes.as_slice(),
            [crate::store::StoreChange::Detached {
                reason: DetachReason::Invalidated,
                ..
            }]
        ));
    }

    #[test]
    fn revalidate_trims_to_reduced_capacity() {
        let mut policy = CarryPolicy::default();
        policy.trait_modifiers.insert(String::from("strong"), 1);
        let mut carrier = view(LifeStage::Adult);
        carrier.traits.insert(String::from("strong"));
        let first = view(LifeStage::Toddler);
        let second = view(LifeStage::Toddler);
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();

        store.attach(carrier.id, first.id, 2, 0).unwrap();
        store.attach(carrier.id, second.id, 2, 1).unwrap();

        carrier.traits.clear();
        let views = [carrier.clone(), first.clone(), second.clone()];
        machine.revalidate(&mut store, &policy, |id| views.iter().find(|v| v.id == id).cloned());

        assert_eq!(store.carried_by(carrier.id), &[first.id]);
        assert!(!store.is_carried(second.id));
    }
}
