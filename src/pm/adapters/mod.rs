//! Adapter implementations of the PM ports.

pub mod memory;
pub mod postgres;
