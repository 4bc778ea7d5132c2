//! Save and restore of the carrying subsystem's state.
//!
//! A snapshot holds the active relationships and the cooldown records that
//! are still live. Restoring is lenient: the world may have changed since
//! the save, so every entry is re-validated against current agent state and
//! anything that no longer holds is dropped and counted, never fatal.

use chrono::Utc;
use cradle_types::{AgentId, AgentView, CarrySnapshot};
use tracing::{debug, info};

use crate::cooldown::CooldownManager;
use crate::eligibility::{CarryPolicy, carried_problem, faction_problem};
use crate::store::CarryStore;

/// Counts of what a restore kept and dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Relationships re-created in the store.
    pub relationships_restored: usize,
    /// Relationships discarded (unknown or ineligible agent, duplicate,
    /// over capacity).
    pub relationships_dropped: usize,
    /// Cooldown records re-inserted.
    pub cooldowns_restored: usize,
    /// Cooldown records discarded (unknown, dead or despawned agent, or
    /// already expired).
    pub cooldowns_dropped: usize,
}

/// Capture the store and the live cooldowns at tick `now`.
pub fn take_snapshot(store: &CarryStore, cooldowns: &CooldownManager, now: u64) -> CarrySnapshot {
    CarrySnapshot {
        saved_at_tick: now,
        saved_at: Utc::now(),
        relationships: store.relationships().copied().collect(),
        cooldowns: cooldowns.live_records(now).copied().collect(),
    }
}

/// Replace the contents of `store` and `cooldowns` with `snapshot`.
///
/// `lookup` returns the current view of an agent, or `None` if it no longer
/// exists. Relationships are re-attached through the store so its
/// invariants hold for restored data exactly as for live data. Attach
/// ticks are kept from the snapshot. The store's change journal is drained
/// afterwards so restored relationships are not reported as new attaches.
pub fn restore<F>(
    snapshot: &CarrySnapshot,
    store: &mut CarryStore,
    cooldowns: &mut CooldownManager,
    policy: &CarryPolicy,
    lookup: F,
    now: u64,
) -> RestoreReport
where
    F: Fn(AgentId) -> Option<AgentView>,
{
    store.clear();
    cooldowns.clear();
    let mut report = RestoreReport::default();

    for rel in &snapshot.relationships {
        let kept = match (lookup(rel.carrier_id), lookup(rel.carried_id)) {
            (Some(carrier), Some(carried)) => {
                if policy.carrier_problem(&carrier).is_some()
                    || carried_problem(&carried).is_some()
                    || faction_problem(&carrier, &carried).is_some()
                {
                    false
                } else {
                    match store.attach(
                        rel.carrier_id,
                        rel.carried_id,
                        policy.max_carry_capacity(&carrier),
                        rel.attached_at_tick,
                    ) {
                        Ok(_) => true,
                        Err(err) => {
                            debug!(carried = %rel.carried_id, error = %err, "Restore rejected relationship");
                            false
                        }
                    }
                }
            }
            _ => false,
        };
        if kept {
            report.relationships_restored = report.relationships_restored.saturating_add(1);
        } else {
            debug!(carrier = %rel.carrier_id, carried = %rel.carried_id, "Dropped relationship on restore");
            report.relationships_dropped = report.relationships_dropped.saturating_add(1);
        }
    }
    store.drain_changes();

    for record in &snapshot.cooldowns {
        let present = lookup(record.toddler_id).is_some_and(|v| v.alive && v.spawned);
        if record.is_active(now) && present {
            cooldowns.insert_record(*record);
            report.cooldowns_restored = report.cooldowns_restored.saturating_add(1);
        } else {
            report.cooldowns_dropped = report.cooldowns_dropped.saturating_add(1);
        }
    }

    info!(
        saved_at_tick = snapshot.saved_at_tick,
        relationships = report.relationships_restored,
        relationships_dropped = report.relationships_dropped,
        cooldowns = report.cooldowns_restored,
        cooldowns_dropped = report.cooldowns_dropped,
        "Carry state restored"
    );
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cradle_types::{CarryRelationship, CooldownRecord, LifeStage};

    use super::*;
    use crate::eligibility::tests::view;

    fn lookup_in(views: &[AgentView]) -> impl Fn(AgentId) -> Option<AgentView> + '_ {
        move |id| views.iter().find(|v| v.id == id).cloned()
    }

    #[test]
    fn snapshot_survives_json() {
        let carrier = view(LifeStage::Adult);
        let toddler = view(LifeStage::Toddler);
        let mut store = CarryStore::new();
        store.attach(carrier.id, toddler.id, 1, 7).unwrap();
        let mut cooldowns = CooldownManager::default();
        cooldowns.insert_record(CooldownRecord {
            toddler_id: toddler.id,
            cooldown_expires_at_tick: 40,
        });

        let snapshot = take_snapshot(&store, &cooldowns, 10);
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: CarrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);

        let views = [carrier.clone(), toddler.clone()];
        let mut restored = CarryStore::new();
        let mut restored_cooldowns = CooldownManager::default();
        let report = restore(
            &back,
            &mut restored,
            &mut restored_cooldowns,
            &CarryPolicy::default(),
            lookup_in(&views),
            10,
        );
        assert_eq!(report.relationships_restored, 1);
        assert_eq!(report.cooldowns_restored, 1);
        assert_eq!(
            restored.relationship_of(toddler.id).unwrap().attached_at_tick,
            7
        );
        assert!(restored_cooldowns.is_on_cooldown(toddler.id, 39));
        assert!(restored.drain_changes().is_empty());
    }

    #[test]
    fn expired_cooldowns_are_not_saved() {
        let mut cooldowns = CooldownManager::default();
        cooldowns.insert_record(CooldownRecord {
            toddler_id: AgentId::new(),
            cooldown_expires_at_tick: 5,
        });
        let snapshot = take_snapshot(&CarryStore::new(), &cooldowns, 5);
        assert!(snapshot.cooldowns.is_empty());
    }

    #[test]
    fn restore_drops_dead_duplicate_and_grown_entries() {
        let carrier = view(LifeStage::Adult);
        let other = view(LifeStage::Adult);
        let toddler = view(LifeStage::Toddler);
        let mut grown = view(LifeStage::Toddler);
        let gone = AgentId::new();

        let snapshot = CarrySnapshot {
            saved_at_tick: 100,
            saved_at: Utc::now(),
            relationships: vec![
                CarryRelationship {
                    carrier_id: carrier.id,
                    carried_id: toddler.id,
                    attached_at_tick: 1,
                },
                // Same toddler claimed twice.
                CarryRelationship {
                    carrier_id: other.id,
                    carried_id: toddler.id,
                    attached_at_tick: 2,
                },
                CarryRelationship {
                    carrier_id: gone,
                    carried_id: grown.id,
                    attached_at_tick: 3,
                },
                CarryRelationship {
                    carrier_id: other.id,
                    carried_id: grown.id,
                    attached_at_tick: 4,
                },
            ],
            cooldowns: vec![
                CooldownRecord {
                    toddler_id: toddler.id,
                    cooldown_expires_at_tick: 90,
                },
                CooldownRecord {
                    toddler_id: gone,
                    cooldown_expires_at_tick: 500,
                },
            ],
        };

        grown.life_stage = LifeStage::Child;
        let views = [carrier.clone(), other.clone(), toddler.clone(), grown.clone()];
        let mut store = CarryStore::new();
        let mut cooldowns = CooldownManager::default();
        let report = restore(
            &snapshot,
            &mut store,
            &mut cooldowns,
            &CarryPolicy::default(),
            lookup_in(&views),
            100,
        );

        assert_eq!(
            report,
            RestoreReport {
                relationships_restored: 1,
                relationships_dropped: 3,
                cooldowns_restored: 0,
                cooldowns_dropped: 2,
            }
        );
        assert_eq!(store.carrier_of(toddler.id), Some(carrier.id));
        assert!(!store.is_carried(grown.id));
    }

    #[test]
    fn restore_drops_cooldowns_of_dead_and_despawned_toddlers() {
        let mut dead = view(LifeStage::Toddler);
        dead.alive = false;
        let mut away = view(LifeStage::Baby);
        away.spawned = false;
        let live = view(LifeStage::Toddler);
        let record = |toddler_id| CooldownRecord {
            toddler_id,
            cooldown_expires_at_tick: 500,
        };
        let snapshot = CarrySnapshot {
            saved_at_tick: 10,
            saved_at: Utc::now(),
            relationships: Vec::new(),
            cooldowns: vec![record(dead.id), record(away.id), record(live.id)],
        };

        let views = [dead.clone(), away.clone(), live.clone()];
        let mut cooldowns = CooldownManager::default();
        let report = restore(
            &snapshot,
            &mut CarryStore::new(),
            &mut cooldowns,
            &CarryPolicy::default(),
            lookup_in(&views),
            10,
        );

        assert_eq!(report.cooldowns_restored, 1);
        assert_eq!(report.cooldowns_dropped, 2);
        assert!(!cooldowns.is_on_cooldown(dead.id, 11));
        assert!(!cooldowns.is_on_cooldown(away.id, 11));
        assert!(cooldowns.is_on_cooldown(live.id, 11));
    }

    #[test]
    fn restore_replaces_existing_state() {
        let mut store = CarryStore::new();
        store.attach(AgentId::new(), AgentId::new(), 1, 0).unwrap();
        let snapshot = take_snapshot(&CarryStore::new(), &CooldownManager::default(), 0);

        let report = restore(
            &snapshot,
            &mut store,
            &mut CooldownManager::default(),
            &CarryPolicy::default(),
            |_| None,
            0,
        );
        assert_eq!(report, RestoreReport::default());
        assert!(store.is_empty());
    }
}
