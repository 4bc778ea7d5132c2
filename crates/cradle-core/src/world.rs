//! Host-side agent model: the state the carrying subsystem reads through
//! [`AgentView`].
//!
//! Agents live on an integer grid split into regions. Two agents can reach
//! each other iff both are spawned and stand in the same region; there is
//! no pathfinding. Movement is a straight-line walk of up to `speed` cells
//! per tick, stopping next to the target.

use std::collections::{BTreeMap, BTreeSet};

use cradle_carry::ReachabilityOracle;
use cradle_types::{AgentId, AgentView, Facing, FactionId, LifeStage, Position};

use crate::config::LifeStageConfig;

/// Errors from world bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An agent with this id is already registered.
    #[error("agent {0} already exists")]
    DuplicateAgent(AgentId),
}

/// A map region. Agents in different regions cannot reach each other.
pub type RegionId = u32;

/// Full host state of one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimAgent {
    /// Stable identity.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Faction (travel group).
    pub faction: FactionId,
    /// Species key.
    pub species: String,
    /// Trait keys.
    pub traits: BTreeSet<String>,
    /// Age in ticks; life stage is derived from it.
    pub age_ticks: u64,
    /// Region the agent stands in.
    pub region: RegionId,
    /// Grid cell.
    pub position: Position,
    /// Facing, updated on every movement step.
    pub facing: Facing,
    /// Alive flag.
    pub alive: bool,
    /// Spawned flag.
    pub spawned: bool,
    /// Downed flag.
    pub downed: bool,
    /// Drafted flag.
    pub drafted: bool,
    /// Manipulation capability.
    pub can_manipulate: bool,
}

impl SimAgent {
    /// A healthy, spawned agent aged `age_ticks`.
    pub fn new(
        name: impl Into<String>,
        faction: FactionId,
        age_ticks: u64,
        region: RegionId,
        position: Position,
    ) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            faction,
            species: String::from("human"),
            traits: BTreeSet::new(),
            age_ticks,
            region,
            position,
            facing: Facing::default(),
            alive: true,
            spawned: true,
            downed: false,
            drafted: false,
            can_manipulate: true,
        }
    }

    /// Build the read-only view consumed by the carry policy.
    pub fn view(&self, stages: &LifeStageConfig) -> AgentView {
        AgentView {
            id: self.id,
            life_stage: stages.stage_for_age(self.age_ticks),
            faction: self.faction,
            species: self.species.clone(),
            traits: self.traits.clone(),
            alive: self.alive,
            spawned: self.spawned,
            downed: self.downed,
            drafted: self.drafted,
            can_manipulate: self.can_manipulate,
            position: self.position,
            facing: self.facing,
        }
    }
}

/// All agents known to the host, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct World {
    agents: BTreeMap<AgentId, SimAgent>,
}

impl World {
    /// Create an empty world.
    pub const fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
        }
    }

    /// Register an agent.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateAgent`] if the id is taken.
    pub fn add_agent(&mut self, agent: SimAgent) -> Result<AgentId, WorldError> {
        let id = agent.id;
        if self.agents.contains_key(&id) {
            return Err(WorldError::DuplicateAgent(id));
        }
        self.agents.insert(id, agent);
        Ok(id)
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&SimAgent> {
        self.agents.get(&id)
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut SimAgent> {
        self.agents.get_mut(&id)
    }

    /// Number of registered agents (alive or not).
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agents are registered.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// All agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &SimAgent> {
        self.agents.values()
    }

    /// The current view of `id`, or `None` if unknown.
    pub fn view(&self, id: AgentId, stages: &LifeStageConfig) -> Option<AgentView> {
        self.agents.get(&id).map(|agent| agent.view(stages))
    }

    /// Current views of every agent, keyed by id.
    pub fn views(&self, stages: &LifeStageConfig) -> BTreeMap<AgentId, AgentView> {
        self.agents
            .iter()
            .map(|(id, agent)| (*id, agent.view(stages)))
            .collect()
    }

    /// Age every living agent by one tick. Returns the agents that entered
    /// a new life stage, with that stage.
    pub fn age_all(&mut self, stages: &LifeStageConfig) -> Vec<(AgentId, LifeStage)> {
        let mut grown = Vec::new();
        for agent in self.agents.values_mut().filter(|a| a.alive) {
            let before = stages.stage_for_age(agent.age_ticks);
            agent.age_ticks = agent.age_ticks.saturating_add(1);
            let after = stages.stage_for_age(agent.age_ticks);
            if after != before {
                grown.push((agent.id, after));
            }
        }
        grown
    }

    /// Walk `id` up to `speed` cells toward `target`, stopping once
    /// adjacent. Returns whether the agent ends adjacent to `target`.
    pub fn step_toward(&mut self, id: AgentId, target: Position, speed: u32) -> bool {
        let Some(agent) = self.agents.get_mut(&id) else {
            return false;
        };
        for _ in 0..speed {
            if agent.position.is_adjacent(target) {
                break;
            }
            let dx = target.x.saturating_sub(agent.position.x).signum();
            let dy = target.y.saturating_sub(agent.position.y).signum();
            agent.position = Position::new(
                agent.position.x.saturating_add(dx),
                agent.position.y.saturating_add(dy),
            );
            if let Some(facing) = Facing::from_step(dx, dy) {
                agent.facing = facing;
            }
        }
        agent.position.is_adjacent(target)
    }

    /// Put `id` on `position` in `region`, facing `facing`. Used to keep
    /// carried agents on their carrier's cell.
    pub fn place_at(&mut self, id: AgentId, region: RegionId, position: Position, facing: Facing) {
        if let Some(agent) = self.agents.get_mut(&id) {
            agent.region = region;
            agent.position = position;
            agent.facing = facing;
        }
    }
}

impl ReachabilityOracle for World {
    fn can_reach(&self, agent: &AgentView, target: &AgentView) -> bool {
        match (self.agents.get(&agent.id), self.agents.get(&target.id)) {
            (Some(a), Some(t)) => a.spawned && t.spawned && a.region == t.region,
            _ => false,
        }
    }
}
