//! Entitlement-provider port mapping acting users to property scopes.

use crate::pm::domain::{Entitlements, UserId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for entitlement lookups.
pub type EntitlementResult<T> = Result<T, EntitlementError>;

/// Maps an acting user to `{is_privileged, entitled property ids}`.
///
/// The mapping source (directory service, OAuth claims, database) is a
/// deployment concern; the core only consumes the resolved entitlements.
#[async_trait]
pub trait EntitlementProvider: Send + Sync {
    /// Resolves the entitlements of the given user.
    ///
    /// A user unknown to the provider resolves to unprivileged, empty
    /// entitlements rather than an error.
    async fn entitlements_for(&self, user: UserId) -> EntitlementResult<Entitlements>;
}

/// Errors returned by entitlement providers.
#[derive(Debug, Clone, Error)]
pub enum EntitlementError {
    /// The underlying entitlement source failed.
    #[error("entitlement lookup failed: {0}")]
    Unavailable(Arc<dyn std::error::Error + Send + Sync>),
}

impl EntitlementError {
    /// Wraps a lookup failure.
    pub fn unavailable(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Unavailable(Arc::new(err))
    }
}
