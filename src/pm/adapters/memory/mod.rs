//! In-memory store for PM scheduling tests.

mod store;

pub use store::InMemoryPmStore;
