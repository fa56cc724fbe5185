//! `PostgreSQL` adapters for PM scheduling persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PmPgPool, PostgresPmStore};
