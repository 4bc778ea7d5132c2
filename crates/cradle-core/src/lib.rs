//! Simulation clock, tick cycle, and host glue for the Cradle carrying
//! simulation.
//!
//! This crate owns the tick cycle that drives the carrying subsystem:
//! Wake, Commands, Selection, Jobs, Presentation, and Persist.
//!
//! # Modules
//!
//! - [`clock`] -- Monotonic tick counter.
//! - [`command`] -- [`CommandSource`] trait, stub and scripted sources, and
//!   lifecycle events.
//! - [`config`] -- Configuration loading from `cradle-config.yaml` into
//!   strongly-typed structs.
//! - [`persist`] -- JSON save files.
//! - [`reservation`] -- Exclusive claims on pickup targets.
//! - [`runner`] -- Async loop with tick bound and stop channel.
//! - [`tick`] -- The phase loop and [`SimulationState`].
//! - [`world`] -- Host agent model, movement, and reachability.
//!
//! [`CommandSource`]: command::CommandSource
//! [`SimulationState`]: tick::SimulationState

pub mod clock;
pub mod command;
pub mod config;
pub mod persist;
pub mod reservation;
pub mod runner;
pub mod tick;
pub mod world;
