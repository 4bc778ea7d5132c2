//! Presentation sync for carried agents.
//!
//! Each render frame, every carried agent gets its own animation suppressed
//! and its facing locked to its carrier's facing. Everything here is derived
//! from the [`CarryStore`]; nothing is written back.
//!
//! Animation backends plug in through [`PresentationBackend`]. The backend
//! is picked once at startup from configuration ([`BackendKind`]).

use std::collections::BTreeSet;

use cradle_types::{AgentId, Facing, PresentationFrame};
use serde::Deserialize;
use tracing::debug;

use crate::store::CarryStore;

/// An animation backend that can apply carry overrides.
pub trait PresentationBackend: Send {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Apply the override for one carried agent.
    fn apply(&mut self, frame: &PresentationFrame);

    /// Hand control of `agent_id`'s presentation back to the agent.
    fn release(&mut self, agent_id: AgentId);
}

/// Backend that writes overrides to the trace log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBackend;

impl PresentationBackend for LogBackend {
    fn name(&self) -> &'static str {
        "log"
    }

    fn apply(&mut self, frame: &PresentationFrame) {
        tracing::trace!(
            carried = %frame.carried_id,
            carrier = %frame.carrier_id,
            facing = ?frame.facing,
            suppress = frame.suppress_animation,
            "Presentation override"
        );
    }

    fn release(&mut self, agent_id: AgentId) {
        tracing::trace!(agent = %agent_id, "Presentation released");
    }
}

/// Backend that ignores overrides (headless runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl PresentationBackend for NullBackend {
    fn name(&self) -> &'static str {
        "none"
    }

    fn apply(&mut self, _frame: &PresentationFrame) {}

    fn release(&mut self, _agent_id: AgentId) {}
}

/// Configured choice of presentation backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// [`LogBackend`].
    #[default]
    Log,
    /// [`NullBackend`].
    None,
}

impl BackendKind {
    /// Construct the backend this kind names.
    pub fn build(self) -> Box<dyn PresentationBackend> {
        match self {
            Self::Log => Box::new(LogBackend),
            Self::None => Box::new(NullBackend),
        }
    }
}

/// Build one frame per carried agent.
///
/// `facing_of` returns a carrier's current facing; carriers it does not know
/// fall back to [`Facing::default`].
pub fn build_frames<F>(store: &CarryStore, facing_of: F) -> Vec<PresentationFrame>
where
    F: Fn(AgentId) -> Option<Facing>,
{
    store
        .relationships()
        .map(|rel| PresentationFrame {
            carried_id: rel.carried_id,
            carrier_id: rel.carrier_id,
            facing: facing_of(rel.carrier_id).unwrap_or_default(),
            suppress_animation: true,
        })
        .collect()
}

/// Keeps a backend in step with the store across frames.
pub struct PresentationSync {
    backend: Box<dyn PresentationBackend>,
    overridden: BTreeSet<AgentId>,
}

impl core::fmt::Debug for PresentationSync {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PresentationSync")
            .field("backend", &self.backend.name())
            .field("overridden", &self.overridden)
            .finish()
    }
}

impl PresentationSync {
    /// Wrap `backend`.
    pub fn new(backend: Box<dyn PresentationBackend>) -> Self {
        debug!(backend = backend.name(), "Presentation backend selected");
        Self {
            backend,
            overridden: BTreeSet::new(),
        }
    }

    /// Apply overrides for every carried agent and release agents that were
    /// carried last frame but are not any more. Returns the frames applied.
    pub fn sync<F>(&mut self, store: &CarryStore, facing_of: F) -> Vec<PresentationFrame>
    where
        F: Fn(AgentId) -> Option<Facing>,
    {
        let frames = build_frames(store, facing_of);
        let now: BTreeSet<AgentId> = frames.iter().map(|f| f.carried_id).collect();

        for released in self.overridden.difference(&now) {
            self.backend.release(*released);
        }
        for frame in &frames {
            self.backend.apply(frame);
        }
        self.overridden = now;
        frames
    }

    /// Agents whose presentation is currently overridden.
    pub const fn overridden(&self) -> &BTreeSet<AgentId> {
        &self.overridden
    }
}
