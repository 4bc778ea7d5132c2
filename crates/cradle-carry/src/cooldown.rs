//! Cooldown gating for carried interactions (toss-up, tickle, spin).
//!
//! Cooldowns are per toddler and lazy: a record is just an expiry tick,
//! compared against the current tick whenever someone asks. Nothing runs in
//! the background and expired records need no cleanup to stop blocking.

use std::collections::BTreeMap;

use cradle_types::{AgentId, CarryEvent, CooldownRecord, InteractionKind};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::CarryError;
use crate::machine::CarryMachine;
use crate::store::CarryStore;

/// Timing of one interaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InteractionTiming {
    /// How many ticks the interaction job runs.
    pub duration_ticks: u64,
    /// How many ticks after completion the toddler is on cooldown.
    pub cooldown_ticks: u64,
}

/// Timings for every interaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct InteractionTable {
    /// Toss-up timing.
    #[serde(default = "default_toss_up")]
    pub toss_up: InteractionTiming,
    /// Tickle timing.
    #[serde(default = "default_tickle")]
    pub tickle: InteractionTiming,
    /// Spin timing.
    #[serde(default = "default_spin")]
    pub spin: InteractionTiming,
}

impl Default for InteractionTable {
    fn default() -> Self {
        Self {
            toss_up: default_toss_up(),
            tickle: default_tickle(),
            spin: default_spin(),
        }
    }
}

const fn default_toss_up() -> InteractionTiming {
    InteractionTiming {
        duration_ticks: 6,
        cooldown_ticks: 120,
    }
}

const fn default_tickle() -> InteractionTiming {
    InteractionTiming {
        duration_ticks: 4,
        cooldown_ticks: 90,
    }
}

const fn default_spin() -> InteractionTiming {
    InteractionTiming {
        duration_ticks: 5,
        cooldown_ticks: 100,
    }
}

impl InteractionTable {
    /// The timing configured for `kind`.
    pub const fn timing(&self, kind: InteractionKind) -> InteractionTiming {
        match kind {
            InteractionKind::TossUp => self.toss_up,
            InteractionKind::Tickle => self.tickle,
            InteractionKind::Spin => self.spin,
        }
    }
}

/// Per-toddler cooldown records and the interaction gate.
#[derive(Debug, Clone, Default)]
pub struct CooldownManager {
    table: InteractionTable,
    records: BTreeMap<AgentId, CooldownRecord>,
}

impl CooldownManager {
    /// Create a manager with the given interaction timings.
    pub const fn new(table: InteractionTable) -> Self {
        Self {
            table,
            records: BTreeMap::new(),
        }
    }

    /// The configured interaction timings.
    pub const fn table(&self) -> &InteractionTable {
        &self.table
    }

    /// Whether `toddler_id` is on cooldown at tick `now`.
    pub fn is_on_cooldown(&self, toddler_id: AgentId, now: u64) -> bool {
        self.records
            .get(&toddler_id)
            .is_some_and(|record| record.is_active(now))
    }

    /// Ticks left on the cooldown of `toddler_id` at `now` (0 if none).
    pub fn remaining(&self, toddler_id: AgentId, now: u64) -> u64 {
        self.records
            .get(&toddler_id)
            .map_or(0, |record| record.cooldown_expires_at_tick.saturating_sub(now))
    }

    /// Start a `kind` interaction of `carrier_id` with `toddler_id`.
    ///
    /// On success the machine moves the carrier into the interacting state;
    /// the cooldown itself is recorded when the interaction completes.
    ///
    /// # Errors
    ///
    /// - [`CarryError::NotCarried`] unless `carrier_id` carries `toddler_id`.
    /// - [`CarryError::OnCooldown`] if the toddler's cooldown is active.
    /// - [`CarryError::InteractionInProgress`] if the toddler is already in
    ///   an interaction.
    /// - [`CarryError::CarrierBusy`] if the carrier runs another carry job.
    pub fn start_interaction(
        &self,
        store: &CarryStore,
        machine: &mut CarryMachine,
        carrier_id: AgentId,
        toddler_id: AgentId,
        kind: InteractionKind,
        now: u64,
    ) -> Result<(), CarryError> {
        if store.carrier_of(toddler_id) != Some(carrier_id) {
            return Err(CarryError::NotCarried {
                toddler_id,
                requester_id: carrier_id,
            });
        }
        if let Some(record) = self.records.get(&toddler_id).filter(|r| r.is_active(now)) {
            debug!(toddler = %toddler_id, expires = record.cooldown_expires_at_tick, "Interaction refused, on cooldown");
            return Err(CarryError::OnCooldown {
                toddler_id,
                expires_at_tick: record.cooldown_expires_at_tick,
            });
        }
        if let Some((_, running)) = machine.interaction_on(toddler_id) {
            return Err(CarryError::InteractionInProgress {
                toddler_id,
                kind: running,
            });
        }
        if !machine.is_idle(carrier_id) {
            return Err(CarryError::CarrierBusy { carrier_id });
        }

        let duration = self.table.timing(kind).duration_ticks;
        machine.begin_interaction(
            carrier_id,
            toddler_id,
            kind,
            now,
            now.saturating_add(duration),
        );
        info!(carrier = %carrier_id, toddler = %toddler_id, %kind, now, "Interaction started");
        Ok(())
    }

    /// Complete the running interaction of `carrier_id` at tick `now`.
    ///
    /// Returns the new cooldown record, or `None` if the carrier was not
    /// interacting.
    pub fn finish_interaction(
        &mut self,
        machine: &mut CarryMachine,
        carrier_id: AgentId,
        now: u64,
    ) -> Option<CooldownRecord> {
        let (toddler_id, kind) = machine.end_interaction(carrier_id)?;
        let cooldown = self.table.timing(kind).cooldown_ticks;
        let record = CooldownRecord {
            toddler_id,
            cooldown_expires_at_tick: now.saturating_add(cooldown),
        };
        self.records.insert(toddler_id, record);
        machine.push_event(CarryEvent::InteractionCompleted {
            carrier_id,
            toddler_id,
            kind,
            cooldown_expires_at_tick: record.cooldown_expires_at_tick,
        });
        info!(
            carrier = %carrier_id,
            toddler = %toddler_id,
            %kind,
            expires = record.cooldown_expires_at_tick,
            "Interaction completed"
        );
        Some(record)
    }

    /// Finish every interaction whose duration has elapsed at `now`.
    pub fn finish_due(&mut self, machine: &mut CarryMachine, now: u64) -> Vec<CooldownRecord> {
        let mut finished = Vec::new();
        for due in machine.due_interactions(now) {
            finished.extend(self.finish_interaction(machine, due.carrier_id, now));
        }
        finished
    }

    /// Insert a record directly (used when restoring a snapshot).
    pub fn insert_record(&mut self, record: CooldownRecord) {
        self.records.insert(record.toddler_id, record);
    }

    /// Remove the record of `toddler_id`, if any.
    pub fn forget(&mut self, toddler_id: AgentId) -> Option<CooldownRecord> {
        self.records.remove(&toddler_id)
    }

    /// Drop records that no longer block at `now`. Returns how many.
    pub fn prune(&mut self, now: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.is_active(now));
        before.saturating_sub(self.records.len())
    }

    /// Records still active at `now`, in toddler id order.
    pub fn live_records(&self, now: u64) -> impl Iterator<Item = &CooldownRecord> {
        self.records.values().filter(move |record| record.is_active(now))
    }

    /// Drop every record (session end).
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cradle_types::{CarryState, DetachReason};

    use super::*;

    fn attached() -> (CarryStore, CarryMachine, AgentId, AgentId) {
        let mut store = CarryStore::new();
        let carrier = AgentId::new();
        let toddler = AgentId::new();
        store.attach(carrier, toddler, 1, 0).unwrap();
        (store, CarryMachine::new(), carrier, toddler)
    }

    #[test]
    fn tickle_cooldown_blocks_until_expiry() {
        let (store, mut machine, carrier, toddler) = attached();
        let mut cooldowns = CooldownManager::default();
        let timing = cooldowns.table().timing(InteractionKind::Tickle);

        cooldowns
            .start_interaction(&store, &mut machine, carrier, toddler, InteractionKind::Tickle, 10)
            .unwrap();
        assert_eq!(machine.state_of(&store, toddler), CarryState::Interacting);

        let done_at = 10 + timing.duration_ticks;
        let finished = cooldowns.finish_due(&mut machine, done_at);
        assert_eq!(finished.len(), 1);
        assert_eq!(machine.state_of(&store, toddler), CarryState::Attached);

        let retry = cooldowns.start_interaction(
            &store,
            &mut machine,
            carrier,
            toddler,
            InteractionKind::Tickle,
            done_at + timing.cooldown_ticks - 1,
        );
        assert!(matches!(retry, Err(CarryError::OnCooldown { .. })));
        assert_eq!(cooldowns.remaining(toddler, done_at + timing.cooldown_ticks - 1), 1);

        let retry = cooldowns.start_interaction(
            &store,
            &mut machine,
            carrier,
            toddler,
            InteractionKind::Tickle,
            done_at + timing.cooldown_ticks,
        );
        assert!(retry.is_ok());
    }

    #[test]
    fn cooldown_applies_across_kinds() {
        let (store, mut machine, carrier, toddler) = attached();
        let mut cooldowns = CooldownManager::default();

        cooldowns
            .start_interaction(&store, &mut machine, carrier, toddler, InteractionKind::Spin, 0)
            .unwrap();
        cooldowns.finish_interaction(&mut machine, carrier, 5);

        let other = cooldowns.start_interaction(
            &store,
            &mut machine,
            carrier,
            toddler,
            InteractionKind::TossUp,
            6,
        );
        assert!(matches!(other, Err(CarryError::OnCooldown { .. })));
    }

    #[test]
    fn requester_must_be_the_carrier() {
        let (store, mut machine, _carrier, toddler) = attached();
        let cooldowns = CooldownManager::default();
        let stranger = AgentId::new();

        let result = cooldowns.start_interaction(
            &store,
            &mut machine,
            stranger,
            toddler,
            InteractionKind::Tickle,
            0,
        );
        assert_eq!(
            result,
            Err(CarryError::NotCarried {
                toddler_id: toddler,
                requester_id: stranger,
            })
        );
    }

    #[test]
    fn one_interaction_at_a_time_per_toddler() {
        let (store, mut machine, carrier, toddler) = attached();
        let cooldowns = CooldownManager::default();

        cooldowns
            .start_interaction(&store, &mut machine, carrier, toddler, InteractionKind::TossUp, 0)
            .unwrap();
        let second = cooldowns.start_interaction(
            &store,
            &mut machine,
            carrier,
            toddler,
            InteractionKind::Tickle,
            1,
        );
        assert_eq!(
            second,
            Err(CarryError::InteractionInProgress {
                toddler_id: toddler,
                kind: InteractionKind::TossUp,
            })
        );
    }

    #[test]
    fn different_toddlers_interact_concurrently() {
        let mut store = CarryStore::new();
        let mut machine = CarryMachine::new();
        let cooldowns = CooldownManager::default();
        let (a, b) = (AgentId::new(), AgentId::new());
        let (ta, tb) = (AgentId::new(), AgentId::new());
        store.attach(a, ta, 1, 0).unwrap();
        store.attach(b, tb, 1, 0).unwrap();

        assert!(cooldowns
            .start_interaction(&store, &mut machine, a, ta, InteractionKind::Spin, 0)
            .is_ok());
        assert!(cooldowns
            .start_interaction(&store, &mut machine, b, tb, InteractionKind::Spin, 0)
            .is_ok());
        assert_eq!(machine.state_of(&store, a), CarryState::Interacting);
        assert_eq!(machine.state_of(&store, b), CarryState::Interacting);
    }

    #[test]
    fn interrupted_interaction_sets_no_cooldown() {
        let (mut store, mut machine, carrier, toddler) = attached();
        let mut cooldowns = CooldownManager::default();

        cooldowns
            .start_interaction(&store, &mut machine, carrier, toddler, InteractionKind::Tickle, 0)
            .unwrap();
        machine.interrupt(&mut store, carrier, DetachReason::Drafted);

        assert!(cooldowns.finish_due(&mut machine, 100).is_empty());
        assert!(!cooldowns.is_on_cooldown(toddler, 1));
    }

    #[test]
    fn prune_drops_only_expired() {
        let mut cooldowns = CooldownManager::default();
        let (old, fresh) = (AgentId::new(), AgentId::new());
        cooldowns.insert_record(CooldownRecord {
            toddler_id: old,
            cooldown_expires_at_tick: 5,
        });
        cooldowns.insert_record(CooldownRecord {
            toddler_id: fresh,
            cooldown_expires_at_tick: 50,
        });

        assert_eq!(cooldowns.live_records(10).count(), 1);
        assert_eq!(cooldowns.prune(10), 1);
        assert!(cooldowns.is_on_cooldown(fresh, 10));
        assert!(!cooldowns.is_on_cooldown(old, 10));
    }
}
