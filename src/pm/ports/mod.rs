//! Port contracts for preventive-maintenance scheduling.
//!
//! Ports define infrastructure-agnostic interfaces used by PM services.

pub mod entitlements;
pub mod repository;

pub use entitlements::{EntitlementError, EntitlementProvider, EntitlementResult};
pub use repository::{
    Page, PageOf, PmRepositoryError, PmRepositoryResult, PmTaskRepository, SiteRepository,
    TaskListFilter,
};
