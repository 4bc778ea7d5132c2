//! Demo population spawner.
//!
//! Creates a handful of factions, each on its own region, with a few
//! adults and a few dependents of mixed ages scattered around the origin.
//! All randomness, ids included, comes from one `StdRng` seeded with
//! `world.seed`, so the same seed rebuilds the same population and a save
//! from a previous run restores onto it.

use std::collections::BTreeSet;

use cradle_core::config::LifeStageConfig;
use cradle_core::world::{RegionId, SimAgent, World};
use cradle_types::{AgentId, FactionId, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;

/// Upper bound on the demo population.
const MAX_POPULATION: u32 = 10_000;

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for the demo spawner, loaded from the `agents` section of
/// `cradle-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpawnerConfig {
    /// Number of factions, one region each.
    #[serde(default = "default_factions")]
    pub factions: u32,

    /// Adults spawned per faction.
    #[serde(default = "default_adults_per_faction")]
    pub adults_per_faction: u32,

    /// Dependents (newborn to toddler) spawned per faction.
    #[serde(default = "default_dependents_per_faction")]
    pub dependents_per_faction: u32,

    /// Agents are placed within this many cells of the origin.
    #[serde(default = "default_spread")]
    pub spread: i32,

    /// Chance, in percent, that an adult gets the `strong` trait.
    #[serde(default = "default_strong_percent")]
    pub strong_percent: u32,

    /// The demo command source acts every this many ticks (0 = never).
    #[serde(default = "default_command_interval")]
    pub command_interval_ticks: u64,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            factions: default_factions(),
            adults_per_faction: default_adults_per_faction(),
            dependents_per_faction: default_dependents_per_faction(),
            spread: default_spread(),
            strong_percent: default_strong_percent(),
            command_interval_ticks: default_command_interval(),
        }
    }
}

const fn default_factions() -> u32 {
    2
}

const fn default_adults_per_faction() -> u32 {
    2
}

const fn default_dependents_per_faction() -> u32 {
    3
}

const fn default_spread() -> i32 {
    6
}

const fn default_strong_percent() -> u32 {
    25
}

const fn default_command_interval() -> u64 {
    7
}

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of agent names. Names repeat across a large population;
/// identity is the id.
const NAME_POOL: &[&str] = &[
    "Alder", "Birch", "Cedar", "Dusk", "Ember", "Fern", "Grove", "Haze",
    "Iris", "Juniper", "Kestrel", "Lark", "Moss", "Nettle", "Oak", "Pine",
    "Quill", "Reed", "Sage", "Thorn", "Umber", "Vale", "Wren", "Yarrow",
];

// -----------------------------------------------------------------------
// Spawning
// -----------------------------------------------------------------------

/// The spawned population.
#[derive(Debug)]
pub struct SpawnResult {
    /// The populated world.
    pub world: World,
    /// Faction ids, in region order.
    pub factions: Vec<FactionId>,
    /// Every adult, in spawn order.
    pub adults: Vec<AgentId>,
    /// Every dependent, in spawn order.
    pub dependents: Vec<AgentId>,
}

/// Spawn the demo population.
///
/// # Errors
///
/// Returns [`EngineError::Spawner`] if the requested population is larger
/// than the spawner supports, and [`EngineError::World`] if two agents draw
/// the same id.
pub fn spawn_population(
    config: &SpawnerConfig,
    stages: &LifeStageConfig,
    seed: u64,
) -> Result<SpawnResult, EngineError> {
    let per_faction = config
        .adults_per_faction
        .checked_add(config.dependents_per_faction)
        .and_then(|n| n.checked_mul(config.factions))
        .filter(|total| *total <= MAX_POPULATION)
        .ok_or_else(|| EngineError::Spawner {
            message: format!(
                "population of {} factions x ({} adults + {} dependents) exceeds {MAX_POPULATION}",
                config.factions, config.adults_per_faction, config.dependents_per_faction
            ),
        })?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut result = SpawnResult {
        world: World::new(),
        factions: Vec::new(),
        adults: Vec::new(),
        dependents: Vec::new(),
    };

    for region in 0..config.factions {
        let faction = FactionId::from(seeded_uuid(&mut rng));
        result.factions.push(faction);

        for _ in 0..config.adults_per_faction {
            let age = rng.random_range(stages.adult_at..=stages.adult_at.saturating_mul(2));
            let mut agent = seeded_agent(&mut rng, config, faction, region, age);
            if rng.random_range(0..100) < config.strong_percent {
                agent.traits = BTreeSet::from([String::from("strong")]);
            }
            result.adults.push(result.world.add_agent(agent)?);
        }

        for _ in 0..config.dependents_per_faction {
            let age = rng.random_range(0..stages.child_at);
            let agent = seeded_agent(&mut rng, config, faction, region, age);
            result.dependents.push(result.world.add_agent(agent)?);
        }

        info!(
            faction = %faction,
            region,
            adults = config.adults_per_faction,
            dependents = config.dependents_per_faction,
            "Faction spawned"
        );
    }

    info!(
        population = per_faction,
        factions = config.factions,
        seed,
        "Demo population spawned"
    );
    Ok(result)
}

/// A UUID drawn from `rng`, so ids are reproducible for a given seed.
fn seeded_uuid(rng: &mut StdRng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}

fn seeded_agent(
    rng: &mut StdRng,
    config: &SpawnerConfig,
    faction: FactionId,
    region: RegionId,
    age: u64,
) -> SimAgent {
    let spread = config.spread.max(0);
    let position = Position::new(
        rng.random_range(-spread..=spread),
        rng.random_range(-spread..=spread),
    );
    let name = NAME_POOL
        .get(rng.random_range(0..NAME_POOL.len()))
        .copied()
        .unwrap_or("Nameless");
    let mut agent = SimAgent::new(name, faction, age, region, position);
    agent.id = AgentId::from(seeded_uuid(rng));
    agent
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cradle_types::LifeStage;

    use super::*;

    #[test]
    fn spawns_requested_population() {
        let stages = LifeStageConfig::default();
        let config = SpawnerConfig::default();
        let spawned = spawn_population(&config, &stages, 42).unwrap();

        assert_eq!(spawned.factions.len(), 2);
        assert_eq!(spawned.adults.len(), 4);
        assert_eq!(spawned.dependents.len(), 6);
        assert_eq!(spawned.world.len(), 10);

        for id in &spawned.adults {
            let view = spawned.world.view(*id, &stages).unwrap();
            assert_eq!(view.life_stage, LifeStage::Adult);
        }
        for id in &spawned.dependents {
            let view = spawned.world.view(*id, &stages).unwrap();
            assert!(view.life_stage.is_dependent());
        }
    }

    #[test]
    fn same_seed_same_ids() {
        let stages = LifeStageConfig::default();
        let config = SpawnerConfig::default();
        let a = spawn_population(&config, &stages, 7).unwrap();
        let b = spawn_population(&config, &stages, 7).unwrap();
        let c = spawn_population(&config, &stages, 8).unwrap();

        assert_eq!(a.adults, b.adults);
        assert_eq!(a.dependents, b.dependents);
        assert_ne!(a.adults, c.adults);
    }

    #[test]
    fn each_faction_gets_its_own_region() {
        let stages = LifeStageConfig::default();
        let spawned = spawn_population(&SpawnerConfig::default(), &stages, 1).unwrap();
        for agent in spawned.world.agents() {
            let index = spawned
                .factions
                .iter()
                .position(|f| *f == agent.faction)
                .unwrap();
            assert_eq!(usize::try_from(agent.region).unwrap(), index);
        }
    }

    #[test]
    fn oversized_population_is_rejected() {
        let config = SpawnerConfig {
            factions: u32::MAX,
            ..SpawnerConfig::default()
        };
        assert!(matches!(
            spawn_population(&config, &LifeStageConfig::default(), 0),
            Err(EngineError::Spawner { .. })
        ));
    }

    #[test]
    fn parses_from_yaml() {
        let yaml = "factions: 3\nadults_per_faction: 1\n";
        let config: SpawnerConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.factions, 3);
        assert_eq!(config.adults_per_faction, 1);
        assert_eq!(config.dependents_per_faction, 3);
    }
}
