//! Entitlements and the property-scoped visibility predicate.

use super::{PropertyId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The property entitlements of an acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    user: UserId,
    is_privileged: bool,
    property_ids: BTreeSet<PropertyId>,
}

impl Entitlements {
    /// Creates entitlements for a user.
    #[must_use]
    pub fn new(
        user: UserId,
        is_privileged: bool,
        property_ids: impl IntoIterator<Item = PropertyId>,
    ) -> Self {
        Self {
            user,
            is_privileged,
            property_ids: property_ids.into_iter().collect(),
        }
    }

    /// Returns the user these entitlements belong to.
    #[must_use]
    pub const fn user(&self) -> UserId {
        self.user
    }

    /// Returns whether the user bypasses the visibility filter entirely.
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        self.is_privileged
    }

    /// Returns the properties the user is entitled to.
    #[must_use]
    pub const fn property_ids(&self) -> &BTreeSet<PropertyId> {
        &self.property_ids
    }

    /// Returns the visibility scope to push down into store queries.
    #[must_use]
    pub fn scope(&self) -> VisibilityScope {
        if self.is_privileged {
            VisibilityScope::Unrestricted
        } else {
            VisibilityScope::Properties(self.property_ids.clone())
        }
    }

    /// Decides visibility of a single task from its two property paths.
    ///
    /// `machine_properties` are the owning properties of the task's assigned
    /// machines; `room_properties` are the owning properties of the task's
    /// job rooms. The paths are ORed: one reachable entitled property on
    /// either path suffices.
    #[must_use]
    pub fn may_view(
        &self,
        machine_properties: &[PropertyId],
        room_properties: &[PropertyId],
    ) -> bool {
        self.scope().permits(machine_properties, room_properties)
    }
}

/// Store-pushable form of the visibility predicate.
///
/// Bulk listings hand this to the repository so the property filter runs
/// inside the store (index walk or SQL `EXISTS`), never per-row in
/// application code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisibilityScope {
    /// Privileged access: no property filtering.
    Unrestricted,
    /// Tasks reachable from any of these properties, via either join path.
    Properties(BTreeSet<PropertyId>),
}

impl VisibilityScope {
    /// Evaluates the predicate for one task's resolved property paths.
    ///
    /// Store adapters that translate the scope into a native query must keep
    /// the translation equivalent to this function.
    #[must_use]
    pub fn permits(
        &self,
        machine_properties: &[PropertyId],
        room_properties: &[PropertyId],
    ) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Properties(entitled) => machine_properties
                .iter()
                .chain(room_properties)
                .any(|property| entitled.contains(property)),
        }
    }
}

/// Outcome of a single-object authorization check.
///
/// Existence and permission failures are distinguished at the boundary; the
/// core never conflates "doesn't exist" with "not permitted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationResult {
    /// The task exists and the user may act on it.
    Allowed,
    /// The task exists but the user has no path into it.
    Denied,
    /// No task with the given identifier exists.
    NotFound,
}
