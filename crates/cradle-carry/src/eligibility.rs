//! Carrier eligibility and capacity policy.
//!
//! Pure predicates over an [`AgentView`]. Nothing here is memoized: life
//! stage, health and faction change every tick, so callers re-evaluate on
//! every query.
//!
//! Capacity starts from a default (1), can be replaced per species and
//! adjusted per trait. Both tables are injected configuration; the result
//! is clamped to `[0, capacity_ceiling]`.

use std::collections::BTreeMap;

use cradle_types::{AgentView, InvalidReason};
use serde::Deserialize;

use crate::error::CarryError;
use crate::store::CarryStore;

/// Capacity configuration for carriers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CarryPolicy {
    /// Capacity of a carrier with no species override (default: 1).
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,

    /// Upper bound on any carrier's capacity (default: 3).
    #[serde(default = "default_capacity_ceiling")]
    pub capacity_ceiling: u32,

    /// Species key to base capacity, replacing `default_capacity`.
    #[serde(default)]
    pub species_overrides: BTreeMap<String, u32>,

    /// Trait key to signed capacity delta, summed over the agent's traits.
    #[serde(default)]
    pub trait_modifiers: BTreeMap<String, i32>,
}

impl Default for CarryPolicy {
    fn default() -> Self {
        Self {
            default_capacity: default_capacity(),
            capacity_ceiling: default_capacity_ceiling(),
            species_overrides: BTreeMap::new(),
            trait_modifiers: BTreeMap::new(),
        }
    }
}

const fn default_capacity() -> u32 {
    1
}

const fn default_capacity_ceiling() -> u32 {
    3
}

impl CarryPolicy {
    /// Whether `agent` may act as a carrier right now.
    pub fn is_valid_carrier(&self, agent: &AgentView) -> bool {
        self.carrier_problem(agent).is_none()
    }

    /// The reason `agent` may not act as a carrier, or `None` if it may.
    pub fn carrier_problem(&self, agent: &AgentView) -> Option<InvalidReason> {
        if !agent.alive {
            return Some(InvalidReason::Dead);
        }
        if !agent.spawned {
            return Some(InvalidReason::Despawned);
        }
        if agent.downed {
            return Some(InvalidReason::Downed);
        }
        if !agent.life_stage.is_adult() || !agent.can_manipulate {
            return Some(InvalidReason::NotCarrier);
        }
        None
    }

    /// How many dependents `agent` may hold at once.
    ///
    /// Never negative and never above `capacity_ceiling`. An agent that is
    /// not a valid carrier has capacity 0.
    pub fn max_carry_capacity(&self, agent: &AgentView) -> u32 {
        if !self.is_valid_carrier(agent) {
            return 0;
        }

        let base = self
            .species_overrides
            .get(&agent.species)
            .copied()
            .unwrap_or(self.default_capacity);

        let modifier: i64 = agent
            .traits
            .iter()
            .filter_map(|t| self.trait_modifiers.get(t))
            .fold(0_i64, |acc, delta| acc.saturating_add(i64::from(*delta)));

        let raw = i64::from(base).saturating_add(modifier);
        let clamped = raw.clamp(0, i64::from(self.capacity_ceiling));
        u32::try_from(clamped).unwrap_or(0)
    }

    /// Whether `agent` may be picked up right now.
    pub fn can_be_carried(&self, agent: &AgentView) -> bool {
        carried_problem(agent).is_none()
    }

    /// Check whether `carrier` could be offered a pickup of `target` from
    /// an action menu.
    ///
    /// Reachability and reservation are the host's concern and are not
    /// checked here.
    ///
    /// # Errors
    ///
    /// Returns the first [`CarryError`] that would make the pickup fail.
    pub fn can_offer_pickup(
        &self,
        carrier: &AgentView,
        target: &AgentView,
        store: &CarryStore,
    ) -> Result<(), CarryError> {
        if carrier.id == target.id {
            return Err(CarryError::InvalidAgent {
                agent_id: carrier.id,
                reason: InvalidReason::SelfCarry,
            });
        }
        if let Some(reason) = self.carrier_problem(carrier) {
            return Err(CarryError::InvalidAgent {
                agent_id: carrier.id,
                reason,
            });
        }
        if store.is_carried(carrier.id) {
            return Err(CarryError::InvalidAgent {
                agent_id: carrier.id,
                reason: InvalidReason::CarrierIsCarried,
            });
        }
        if let Some(reason) = carried_problem(target) {
            return Err(CarryError::InvalidAgent {
                agent_id: target.id,
                reason,
            });
        }
        if let Some(reason) = faction_problem(carrier, target) {
            return Err(CarryError::InvalidAgent {
                agent_id: target.id,
                reason,
            });
        }
        if let Some(holder) = store.carrier_of(target.id) {
            return Err(CarryError::AlreadyCarried {
                carried_id: target.id,
                carrier_id: holder,
            });
        }
        if !has_spare_capacity(self, carrier, store) {
            return Err(CarryError::CapacityExceeded {
                carrier_id: carrier.id,
                capacity: self.max_carry_capacity(carrier),
            });
        }
        Ok(())
    }
}

/// The reason `agent` may not be carried, or `None` if it may.
pub fn carried_problem(agent: &AgentView) -> Option<InvalidReason> {
    if !agent.alive {
        return Some(InvalidReason::Dead);
    }
    if !agent.spawned {
        return Some(InvalidReason::Despawned);
    }
    if !agent.life_stage.is_dependent() {
        return Some(InvalidReason::NotDependent);
    }
    None
}

/// The reason `carrier` may not hold `target` across factions, or `None`
/// if both belong to the same faction.
pub fn faction_problem(carrier: &AgentView, target: &AgentView) -> Option<InvalidReason> {
    (carrier.faction != target.faction).then_some(InvalidReason::FactionChanged)
}

/// Whether `carrier` holds fewer dependents than its current capacity.
pub fn has_spare_capacity(policy: &CarryPolicy, carrier: &AgentView, store: &CarryStore) -> bool {
    let held = u32::try_from(store.count_carried_by(carrier.id)).unwrap_or(u32::MAX);
    held < policy.max_carry_capacity(carrier)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use cradle_types::{AgentId, Facing, FactionId, LifeStage, Position};

    use super::*;

    pub(crate) fn view(stage: LifeStage) -> AgentView {
        AgentView {
            id: AgentId::new(),
            life_stage: stage,
            faction: FactionId::from(uuid::Uuid::nil()),
            species: String::from("human"),
            traits: BTreeSet::new(),
            alive: true,
            spawned: true,
            downed: false,
            drafted: false,
            can_manipulate: true,
            position: Position::new(0, 0),
            facing: Facing::South,
        }
    }

    #[test]
    fn adult_is_valid_carrier() {
        let policy = CarryPolicy::default();
        assert!(policy.is_valid_carrier(&view(LifeStage::Adult)));
        assert_eq!(policy.max_carry_capacity(&view(LifeStage::Adult)), 1);
    }

    #[test]
    fn dependents_and_children_cannot_carry() {
        let policy = CarryPolicy::default();
        for stage in [
            LifeStage::Newborn,
            LifeStage::Baby,
            LifeStage::Toddler,
            LifeStage::Child,
        ] {
            assert!(!policy.is_valid_carrier(&view(stage)));
            assert_eq!(policy.max_carry_capacity(&view(stage)), 0);
        }
    }

    #[test]
    fn dead_downed_despawned_or_armless_cannot_carry() {
        let policy = CarryPolicy::default();

        let mut dead = view(LifeStage::Adult);
        dead.alive = false;
        assert_eq!(policy.carrier_problem(&dead), Some(InvalidReason::Dead));

        let mut gone = view(LifeStage::Adult);
        gone.spawned = false;
        assert_eq!(policy.carrier_problem(&gone), Some(InvalidReason::Despawned));

        let mut downed = view(LifeStage::Adult);
        downed.downed = true;
        assert_eq!(policy.carrier_problem(&downed), Some(InvalidReason::Downed));

        let mut armless = view(LifeStage::Adult);
        armless.can_manipulate = false;
        assert_eq!(policy.carrier_problem(&armless), Some(InvalidReason::NotCarrier));
    }

    #[test]
    fn species_override_and_traits_adjust_capacity() {
        let mut policy = CarryPolicy::default();
        policy.species_overrides.insert(String::from("ogre"), 2);
        policy.trait_modifiers.insert(String::from("strong"), 1);
        policy.trait_modifiers.insert(String::from("frail"), -5);

        let mut ogre = view(LifeStage::Adult);
        ogre.species = String::from("ogre");
        assert_eq!(policy.max_carry_capacity(&ogre), 2);

        ogre.traits.insert(String::from("strong"));
        assert_eq!(policy.max_carry_capacity(&ogre), 3);

        // Ceiling caps the total.
        policy.capacity_ceiling = 2;
        assert_eq!(policy.max_carry_capacity(&ogre), 2);

        // Large negative modifiers clamp at zero rather than going negative.
        let mut frail = view(LifeStage::Adult);
        frail.traits.insert(String::from("frail"));
        assert_eq!(policy.max_carry_capacity(&frail), 0);
    }

    #[test]
    fn only_dependents_can_be_carried() {
        let policy = CarryPolicy::default();
        assert!(policy.can_be_carried(&view(LifeStage::Newborn)));
        assert!(policy.can_be_carried(&view(LifeStage::Toddler)));
        assert!(!policy.can_be_carried(&view(LifeStage::Child)));
        assert!(!policy.can_be_carried(&view(LifeStage::Adult)));

        let mut dead = view(LifeStage::Toddler);
        dead.alive = false;
        assert!(!policy.can_be_carried(&dead));
    }

    #[test]
    fn growing_past_toddler_ends_eligibility() {
        let policy = CarryPolicy::default();
        let mut agent = view(LifeStage::Toddler);
        assert!(policy.can_be_carried(&agent));
        agent.life_stage = LifeStage::Child;
        assert!(!policy.can_be_carried(&agent));
        assert_eq!(carried_problem(&agent), Some(InvalidReason::NotDependent));
    }

    #[test]
    fn offer_pickup_reports_first_problem() {
        let policy = CarryPolicy::default();
        let mut store = CarryStore::new();
        let carrier = view(LifeStage::Adult);
        let toddler = view(LifeStage::Toddler);
        let second = view(LifeStage::Baby);

        assert!(policy.can_offer_pickup(&carrier, &toddler, &store).is_ok());

        store.attach(carrier.id, toddler.id, 1, 0).unwrap();
        let err = policy.can_offer_pickup(&carrier, &second, &store).unwrap_err();
        assert_eq!(err.short_reason(), "hands are full");

        let other = view(LifeStage::Adult);
        let err = policy.can_offer_pickup(&other, &toddler, &store).unwrap_err();
        assert!(matches!(err, CarryError::AlreadyCarried { .. }));

        let child = view(LifeStage::Child);
        let err = policy.can_offer_pickup(&other, &child, &store).unwrap_err();
        assert_eq!(err.short_reason(), "too old to be carried");
    }

    #[test]
    fn other_faction_cannot_be_offered() {
        let policy = CarryPolicy::default();
        let store = CarryStore::new();
        let carrier = view(LifeStage::Adult);
        let mut stranger = view(LifeStage::Toddler);
        stranger.faction = FactionId::from(uuid::Uuid::from_u128(200));

        let err = policy.can_offer_pickup(&carrier, &stranger, &store).unwrap_err();
        assert_eq!(
            err,
            CarryError::InvalidAgent {
                agent_id: stranger.id,
                reason: InvalidReason::FactionChanged,
            }
        );
        assert_eq!(err.short_reason(), "from another faction");
        assert_eq!(faction_problem(&carrier, &view(LifeStage::Toddler)), None);
    }
}
