//! Upkeep: preventive-maintenance scheduling core.
//!
//! This crate implements the scheduling engine of a property-maintenance
//! back-office system: recurrence arithmetic, derived task status,
//! completion-window validation, property-scoped visibility, and the
//! completion state machine that atomically spawns the next occurrence of a
//! recurring task.
//!
//! # Architecture
//!
//! Upkeep follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, in-memory)
//!
//! # Modules
//!
//! - [`pm`]: Preventive-maintenance task domain, ports, adapters, and the
//!   scheduling orchestrator

pub mod pm;
