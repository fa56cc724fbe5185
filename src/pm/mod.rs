//! Preventive-maintenance scheduling for Upkeep.
//!
//! This module implements the PM engine: calendar-correct recurrence
//! calculation, a single derived-status definition shared by record display
//! and bulk filtering, completion-window validation, property-scoped
//! visibility across two ORed join paths, and the completion state machine
//! that spawns the follow-on occurrence inside one atomic store unit. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
