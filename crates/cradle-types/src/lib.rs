//! Shared type definitions for the Cradle carrying simulation.
//!
//! This crate is the single source of truth for the data that crosses crate
//! boundaries: agent identities, the read-only agent view consumed by the
//! carry policy, relationship and cooldown records, the persisted snapshot
//! schema, and observable events. Types are exported to `TypeScript` via
//! `ts-rs` for tooling that inspects save files and tick summaries.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agent and faction identifiers
//! - [`enums`] -- Life stages, interaction kinds, carry states, reasons
//! - [`structs`] -- Positions, agent views, relationships, snapshots
//! - [`events`] -- Per-tick carry events for observers

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CarryState, DetachReason, Facing, InteractionKind, InvalidReason, LifeStage};
pub use events::CarryEvent;
pub use ids::{AgentId, FactionId};
pub use structs::{
    AgentView, CarryRelationship, CarrySnapshot, CooldownRecord, Position, PresentationFrame,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for all exported types.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::AgentId::export_all();
        let _ = crate::ids::FactionId::export_all();

        // Enums
        let _ = crate::enums::LifeStage::export_all();
        let _ = crate::enums::InteractionKind::export_all();
        let _ = crate::enums::CarryState::export_all();
        let _ = crate::enums::DetachReason::export_all();
        let _ = crate::enums::InvalidReason::export_all();
        let _ = crate::enums::Facing::export_all();

        // Structs
        let _ = crate::structs::Position::export_all();
        let _ = crate::structs::AgentView::export_all();
        let _ = crate::structs::CarryRelationship::export_all();
        let _ = crate::structs::CooldownRecord::export_all();
        let _ = crate::structs::CarrySnapshot::export_all();
        let _ = crate::structs::PresentationFrame::export_all();

        // Events
        let _ = crate::events::CarryEvent::export_all();
    }
}
