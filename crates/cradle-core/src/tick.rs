//! Tick cycle: the phase loop that drives the carrying subsystem.
//!
//! Each tick runs these phases in order:
//!
//! 1. **Wake** -- advance the clock, age agents, apply queued lifecycle
//!    events (death, draft, faction change, ...), then re-check every
//!    relationship so outgrown or invalid carries end before anything else
//!    runs.
//!
//! 2. **Commands** -- apply explicit pickup, drop, and interaction commands
//!    from the [`CommandSource`]. Rejected commands are reported in the
//!    summary with the reason; they never fail the tick.
//!
//! 3. **Selection** -- every idle carrier with spare capacity picks at most
//!    one same-faction dependent. Carriers are visited in id order so the
//!    reservation race between carriers is deterministic. A carrier that
//!    put someone down or was pulled off its carry job sits out selection
//!    for `jobs.repickup_delay_ticks`, starting with the tick it happened.
//!
//! 4. **Jobs** -- carriers with a pending pickup walk toward their target
//!    and attach on arrival; interactions whose duration elapsed complete
//!    and start their cooldown. Carried agents are moved onto their
//!    carrier's cell.
//!
//! 5. **Presentation** -- carried agents get render overrides; agents that
//!    stopped being carried get theirs released.
//!
//! 6. **Persist** -- on the autosave interval, expired cooldowns are pruned
//!    and a snapshot is written.
//!
//! The cycle is deterministic given the same initial state and command
//! source outputs.

use std::collections::BTreeMap;
use std::path::Path;

use cradle_carry::{
    CarryError, CarryMachine, CarryStore, CooldownManager, PresentationBackend, PresentationSync,
    ReachabilityOracle, ReservationOracle, RestoreReport, select_target,
};
use cradle_types::{
    AgentId, AgentView, CarryEvent, CarrySnapshot, DetachReason, FactionId, InvalidReason,
    PresentationFrame,
};
use tracing::{debug, info};

use crate::clock::{ClockError, SimClock};
use crate::command::{CarryCommand, CommandError, CommandSource, LifecycleEvent};
use crate::config::SimulationConfig;
use crate::persist::{self, PersistError};
use crate::reservation::ReservationBook;
use crate::world::World;

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The command source failed.
    #[error("command error: {source}")]
    Command {
        /// The underlying command error.
        #[from]
        source: CommandError,
    },

    /// The autosave could not be written.
    #[error("persist error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },
}

/// A command that was not applied, with the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedCommand {
    /// The command as issued.
    pub command: CarryCommand,
    /// Why it was rejected.
    pub error: CarryError,
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Everything that happened to carry relationships and jobs this tick:
    /// machine events first, then store changes, each in occurrence order.
    pub events: Vec<CarryEvent>,
    /// Commands that were rejected.
    pub rejected: Vec<RejectedCommand>,
    /// Pickups issued by autonomous selection.
    pub selected: usize,
    /// Active relationships at end of tick.
    pub carried: usize,
    /// Pickup jobs still walking at end of tick.
    pub pending_pickups: usize,
    /// Presentation frames pushed this tick.
    pub frames: Vec<PresentationFrame>,
    /// Whether a snapshot was written this tick.
    pub autosaved: bool,
}

/// The mutable simulation state passed through the tick cycle.
///
/// Owns the one [`CarryStore`] of the session; every component receives it
/// by reference from here.
#[derive(Debug)]
pub struct SimulationState {
    /// The simulation clock.
    pub clock: SimClock,
    /// Host agents.
    pub world: World,
    /// Carry relationships.
    pub store: CarryStore,
    /// Carrier jobs.
    pub machine: CarryMachine,
    /// Interaction cooldowns.
    pub cooldowns: CooldownManager,
    /// Pickup target claims.
    pub reservations: ReservationBook,
    /// Render override bookkeeping.
    pub presentation: PresentationSync,
    /// Configuration the session was started with.
    pub config: SimulationConfig,
    /// Lifecycle events waiting for the next Wake phase.
    lifecycle: Vec<LifecycleEvent>,
    /// Carrier to the last tick it sits out autonomous selection.
    selection_holds: BTreeMap<AgentId, u64>,
}

impl SimulationState {
    /// Start a session over `world`, with the presentation backend named in
    /// the configuration.
    pub fn new(config: SimulationConfig, world: World) -> Self {
        let backend = config.presentation.backend.build();
        Self::with_backend(config, world, backend)
    }

    /// Start a session over `world` with an explicit presentation backend.
    pub fn with_backend(
        config: SimulationConfig,
        world: World,
        backend: Box<dyn PresentationBackend>,
    ) -> Self {
        Self {
            clock: SimClock::new(),
            world,
            store: CarryStore::new(),
            machine: CarryMachine::new(),
            cooldowns: CooldownManager::new(config.interactions),
            reservations: ReservationBook::new(),
            presentation: PresentationSync::new(backend),
            config,
            lifecycle: Vec::new(),
            selection_holds: BTreeMap::new(),
        }
    }

    /// Queue a lifecycle event for the next tick.
    pub fn queue_lifecycle(&mut self, event: LifecycleEvent) {
        self.lifecycle.push(event);
    }

    /// Whether `carrier_id` sits out autonomous selection at `tick`.
    pub fn is_selection_held(&self, carrier_id: AgentId, tick: u64) -> bool {
        self.selection_holds
            .get(&carrier_id)
            .is_some_and(|last| tick <= *last)
    }

    fn hold_selection(&mut self, carrier_id: AgentId, tick: u64) {
        let last = tick.saturating_add(self.config.jobs.repickup_delay_ticks);
        self.selection_holds.insert(carrier_id, last);
        debug!(tick, carrier = %carrier_id, until = last, "Selection held");
    }

    /// The current view of `id`.
    pub fn view_of(&self, id: AgentId) -> Option<AgentView> {
        self.world.view(id, &self.config.life_stages)
    }

    /// Capture the carry state at the current tick.
    pub fn snapshot(&self) -> CarrySnapshot {
        cradle_carry::take_snapshot(&self.store, &self.cooldowns, self.clock.tick())
    }

    /// Replace the carry state with `snapshot`.
    ///
    /// The clock resumes at the snapshot's tick if it is behind it, so
    /// cooldown expiries keep their meaning. Running jobs and reservations
    /// are dropped; entries that no longer validate against the world are
    /// dropped too.
    pub fn restore(&mut self, snapshot: &CarrySnapshot) -> RestoreReport {
        if self.clock.tick() < snapshot.saved_at_tick {
            self.clock = SimClock::from_tick(snapshot.saved_at_tick);
        }
        self.machine.clear();
        self.reservations.clear();
        self.selection_holds.clear();
        let now = self.clock.tick();
        let world = &self.world;
        let stages = &self.config.life_stages;
        cradle_carry::restore(
            snapshot,
            &mut self.store,
            &mut self.cooldowns,
            &self.config.carry,
            |id| world.view(id, stages),
            now,
        )
    }

    /// Tear the carry state down at session end, releasing every render
    /// override.
    pub fn end_session(&mut self) {
        self.store.clear();
        self.machine.clear();
        self.cooldowns.clear();
        self.reservations.clear();
        self.lifecycle.clear();
        self.selection_holds.clear();
        let world = &self.world;
        self.presentation
            .sync(&self.store, |id| world.get(id).map(|a| a.facing));
        info!(tick = self.clock.tick(), "Carry session ended");
    }
}

/// Execute one complete tick of the simulation.
///
/// # Errors
///
/// - [`TickError::Clock`] if the clock overflows.
/// - [`TickError::Command`] if the command source fails.
/// - [`TickError::Persist`] if a due autosave cannot be written.
pub fn run_tick(
    state: &mut SimulationState,
    commands: &mut dyn CommandSource,
) -> Result<TickSummary, TickError> {
    // --- Phase 1: Wake ---
    let tick = phase_wake(state)?;

    // --- Phase 2: Commands ---
    let issued = commands.collect_commands(tick)?;
    let rejected = phase_commands(state, issued, tick);

    // --- Phase 3: Selection ---
    let selected = phase_selection(state, tick);

    // --- Phase 4: Jobs ---
    phase_jobs(state, tick);

    // --- Phase 5: Presentation ---
    let world = &state.world;
    let frames = state
        .presentation
        .sync(&state.store, |id| world.get(id).map(|a| a.facing));

    // --- Phase 6: Persist ---
    let autosaved = phase_persist(state, tick)?;

    let mut events = state.machine.drain_events();
    events.extend(state.store.drain_changes().into_iter().map(CarryEvent::from));

    let summary = TickSummary {
        tick,
        events,
        rejected,
        selected,
        carried: state.store.len(),
        pending_pickups: state.machine.pending_pickups().count(),
        frames,
        autosaved,
    };
    debug!(
        tick,
        events = summary.events.len(),
        rejected = summary.rejected.len(),
        carried = summary.carried,
        pending = summary.pending_pickups,
        "Tick completed"
    );
    Ok(summary)
}

/// Phase 1: Wake.
fn phase_wake(state: &mut SimulationState) -> Result<u64, TickError> {
    let tick = state.clock.advance()?;

    for (agent_id, stage) in state.world.age_all(&state.config.life_stages) {
        debug!(tick, agent = %agent_id, ?stage, "Life stage changed");
    }

    for event in core::mem::take(&mut state.lifecycle) {
        apply_lifecycle(state, event, tick);
    }

    let world = &state.world;
    let stages = &state.config.life_stages;
    let detached = state
        .machine
        .revalidate(&mut state.store, &state.config.carry, |id| world.view(id, stages));
    if !detached.is_empty() {
        info!(tick, count = detached.len(), "Relationships ended on revalidation");
    }

    release_stale_reservations(state);
    Ok(tick)
}

/// Update host flags for `event` and end whatever carry activity it rules
/// out.
fn apply_lifecycle(state: &mut SimulationState, event: LifecycleEvent, tick: u64) {
    debug!(?event, "Applying lifecycle event");
    match event {
        LifecycleEvent::Died { agent_id } => {
            if let Some(agent) = state.world.get_mut(agent_id) {
                agent.alive = false;
            }
            state.machine.invalidate(&mut state.store, agent_id);
            state.cooldowns.forget(agent_id);
        }
        LifecycleEvent::Despawned { agent_id } => {
            if let Some(agent) = state.world.get_mut(agent_id) {
                agent.spawned = false;
            }
            state.machine.invalidate(&mut state.store, agent_id);
        }
        LifecycleEvent::FactionChanged { agent_id, faction } => {
            if let Some(agent) = state.world.get_mut(agent_id) {
                agent.faction = faction;
            }
            state.machine.invalidate(&mut state.store, agent_id);
        }
        LifecycleEvent::Drafted { agent_id } => {
            if let Some(agent) = state.world.get_mut(agent_id) {
                agent.drafted = true;
            }
            state
                .machine
                .interrupt(&mut state.store, agent_id, DetachReason::Drafted);
        }
        LifecycleEvent::Undrafted { agent_id } => {
            if let Some(agent) = state.world.get_mut(agent_id) {
                agent.drafted = false;
            }
        }
        LifecycleEvent::Downed { agent_id } => {
            if let Some(agent) = state.world.get_mut(agent_id) {
                agent.downed = true;
            }
            state
                .machine
                .interrupt(&mut state.store, agent_id, DetachReason::Downed);
        }
        LifecycleEvent::Recovered { agent_id } => {
            if let Some(agent) = state.world.get_mut(agent_id) {
                agent.downed = false;
            }
        }
        LifecycleEvent::JobPreempted { agent_id } => {
            state
                .machine
                .interrupt(&mut state.store, agent_id, DetachReason::JobPreempted);
            state.hold_selection(agent_id, tick);
        }
    }
}

/// Phase 2: Commands.
fn phase_commands(
    state: &mut SimulationState,
    issued: Vec<CarryCommand>,
    tick: u64,
) -> Vec<RejectedCommand> {
    let mut rejected = Vec::new();
    for command in issued {
        if let Err(error) = apply_command(state, command, tick) {
            if let CarryError::OnCooldown { toddler_id, .. } = error {
                let remaining = state.cooldowns.remaining(toddler_id, tick);
                debug!(tick, ?command, %error, remaining, "Command rejected");
            } else {
                debug!(tick, ?command, %error, "Command rejected");
            }
            rejected.push(RejectedCommand { command, error });
        }
    }
    rejected
}

fn apply_command(
    state: &mut SimulationState,
    command: CarryCommand,
    tick: u64,
) -> Result<(), CarryError> {
    match command {
        CarryCommand::PickUp {
            carrier_id,
            toddler_id,
        } => {
            let carrier = known(state, carrier_id)?;
            let toddler = known(state, toddler_id)?;
            state
                .config
                .carry
                .can_offer_pickup(&carrier, &toddler, &state.store)?;
            if !state.machine.is_idle(carrier_id) {
                return Err(CarryError::CarrierBusy { carrier_id });
            }
            if !state.world.can_reach(&carrier, &toddler) {
                return Err(CarryError::Unreachable {
                    carrier_id,
                    target_id: toddler_id,
                });
            }
            if !state.reservations.try_reserve(carrier_id, toddler_id) {
                return Err(CarryError::Reserved {
                    target_id: toddler_id,
                    holder_id: state.reservations.holder_of(toddler_id).unwrap_or(carrier_id),
                });
            }
            state.machine.begin_pickup(carrier_id, toddler_id, tick)?;
            state.selection_holds.remove(&carrier_id);
            Ok(())
        }
        CarryCommand::Drop {
            carrier_id,
            toddler_id,
        } => {
            if let Some(toddler_id) = toddler_id {
                if state.store.carrier_of(toddler_id) != Some(carrier_id) {
                    return Err(CarryError::NotCarried {
                        toddler_id,
                        requester_id: carrier_id,
                    });
                }
            }
            let dropped = state
                .machine
                .drop_carried(&mut state.store, carrier_id, toddler_id);
            debug!(tick, carrier = %carrier_id, count = dropped.len(), "Dropped on command");
            if !dropped.is_empty() {
                state.hold_selection(carrier_id, tick);
            }
            Ok(())
        }
        CarryCommand::Interact {
            carrier_id,
            toddler_id,
            kind,
        } => state.cooldowns.start_interaction(
            &state.store,
            &mut state.machine,
            carrier_id,
            toddler_id,
            kind,
            tick,
        ),
    }
}

fn known(state: &SimulationState, agent_id: AgentId) -> Result<AgentView, CarryError> {
    state.view_of(agent_id).ok_or(CarryError::InvalidAgent {
        agent_id,
        reason: InvalidReason::Unknown,
    })
}

/// Phase 3: Selection. Returns the number of pickups issued.
fn phase_selection(state: &mut SimulationState, tick: u64) -> usize {
    state.selection_holds.retain(|_, last| tick <= *last);
    let views = state.world.views(&state.config.life_stages);
    let mut by_faction: BTreeMap<FactionId, Vec<&AgentView>> = BTreeMap::new();
    for view in views.values() {
        by_faction.entry(view.faction).or_default().push(view);
    }

    let mut picks = Vec::new();
    for carrier in views.values() {
        if carrier.drafted
            || !state.machine.is_idle(carrier.id)
            || state.is_selection_held(carrier.id, tick)
        {
            continue;
        }
        let Some(pool) = by_faction.get(&carrier.faction) else {
            continue;
        };
        if let Some(target) = select_target(
            carrier,
            pool.iter().copied(),
            &state.store,
            &state.config.carry,
            &state.world,
            &mut state.reservations,
        ) {
            picks.push((carrier.id, target));
        }
    }

    let mut issued = 0_usize;
    for (carrier_id, target_id) in picks {
        match state.machine.begin_pickup(carrier_id, target_id, tick) {
            Ok(()) => issued = issued.saturating_add(1),
            Err(error) => {
                debug!(carrier = %carrier_id, target = %target_id, %error, "Selected pickup not issued");
                state.reservations.release(target_id);
            }
        }
    }
    issued
}

/// Phase 4: Jobs.
fn phase_jobs(state: &mut SimulationState, tick: u64) {
    let speed = state.config.jobs.move_speed;
    let pending: Vec<(AgentId, AgentId)> = state.machine.pending_pickups().collect();

    for (carrier_id, target_id) in pending {
        let (Some(carrier), Some(target)) = (state.view_of(carrier_id), state.view_of(target_id))
        else {
            state.machine.abandon_pickup(carrier_id);
            continue;
        };
        if !state.world.can_reach(&carrier, &target) || state.store.is_carried(target_id) {
            state.machine.abandon_pickup(carrier_id);
            continue;
        }
        if !state.world.step_toward(carrier_id, target.position, speed) {
            continue;
        }
        // Re-read: the step moved the carrier.
        let Some(carrier) = state.view_of(carrier_id) else {
            continue;
        };
        if let Err(error) = state.machine.complete_pickup(
            &mut state.store,
            &state.config.carry,
            &state.world,
            &carrier,
            &target,
            tick,
        ) {
            debug!(tick, carrier = %carrier_id, target = %target_id, %error, "Pickup ended without effect");
        }
    }

    state.cooldowns.finish_due(&mut state.machine, tick);
    release_stale_reservations(state);

    let follows: Vec<_> = state
        .store
        .relationships()
        .filter_map(|rel| {
            state
                .world
                .get(rel.carrier_id)
                .map(|c| (rel.carried_id, c.region, c.position, c.facing))
        })
        .collect();
    for (carried_id, region, position, facing) in follows {
        state.world.place_at(carried_id, region, position, facing);
    }
}

/// Phase 6: Persist. Returns whether a snapshot was written.
fn phase_persist(state: &mut SimulationState, tick: u64) -> Result<bool, TickError> {
    if !state
        .clock
        .is_due(state.config.persistence.autosave_interval_ticks)
    {
        return Ok(false);
    }
    let pruned = state.cooldowns.prune(tick);
    let snapshot = state.snapshot();
    persist::save_snapshot(Path::new(&state.config.persistence.snapshot_path), &snapshot)?;
    debug!(tick, pruned, "Autosave complete");
    Ok(true)
}

/// Release every claim whose claimant is no longer walking to that target.
fn release_stale_reservations(state: &mut SimulationState) {
    let machine = &state.machine;
    let released = state
        .reservations
        .retain(|claimant, target| machine.pending_target(claimant) == Some(target));
    if released > 0 {
        debug!(released, "Stale reservations released");
    }
}
