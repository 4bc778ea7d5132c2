//! Carrying subsystem for the Cradle simulation.
//!
//! Adult agents pick up, hold, interact with, and put down dependent agents
//! (newborns, babies, toddlers). This crate is pure logic: it owns the
//! relationship store and the carry state machine but does no I/O and keeps
//! no clock. The host passes the current tick and read-only agent views in.
//!
//! # Modules
//!
//! - [`store`] -- The authoritative relationship map ([`CarryStore`])
//! - [`eligibility`] -- Who may carry, who may be carried, and capacity
//!   ([`CarryPolicy`])
//! - [`selection`] -- Nearest-toddler selection with reservation
//! - [`machine`] -- Pickup, interaction, and detach transitions
//!   ([`CarryMachine`])
//! - [`cooldown`] -- Interaction timings and per-toddler cooldowns
//!   ([`CooldownManager`])
//! - [`presentation`] -- Per-frame facing and animation overrides
//! - [`snapshot`] -- Save and lenient restore
//! - [`error`] -- Error types for carry operations ([`CarryError`])

pub mod cooldown;
pub mod eligibility;
pub mod error;
pub mod machine;
pub mod presentation;
pub mod selection;
pub mod snapshot;
pub mod store;

pub use cooldown::{CooldownManager, InteractionTable, InteractionTiming};
pub use eligibility::{CarryPolicy, carried_problem, faction_problem, has_spare_capacity};
pub use error::CarryError;
pub use machine::{CarrierJob, CarryMachine, DueInteraction};
pub use presentation::{
    BackendKind, LogBackend, NullBackend, PresentationBackend, PresentationSync, build_frames,
};
pub use selection::{ReachabilityOracle, ReservationOracle, select_target};
pub use snapshot::{RestoreReport, restore, take_snapshot};
pub use store::{CarryStore, StoreChange};
