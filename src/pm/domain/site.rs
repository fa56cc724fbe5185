//! Site records: properties, rooms, jobs, and machines.
//!
//! These records carry the two visibility join paths: a task reaches a
//! property either through its assigned machines or through the rooms of
//! its job.

use super::{JobId, MachineId, PropertyId, RoomId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A property (tenant scope) with its entitled users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    id: PropertyId,
    name: String,
    entitled_user_ids: BTreeSet<UserId>,
}

impl Property {
    /// Creates a property record.
    #[must_use]
    pub fn new(
        id: PropertyId,
        name: impl Into<String>,
        entitled_user_ids: impl IntoIterator<Item = UserId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            entitled_user_ids: entitled_user_ids.into_iter().collect(),
        }
    }

    /// Returns the property identifier.
    #[must_use]
    pub const fn id(&self) -> PropertyId {
        self.id
    }

    /// Returns the property display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the users entitled to this property.
    #[must_use]
    pub const fn entitled_user_ids(&self) -> &BTreeSet<UserId> {
        &self.entitled_user_ids
    }

    /// Returns whether the given user is entitled to this property.
    #[must_use]
    pub fn entitles(&self, user: UserId) -> bool {
        self.entitled_user_ids.contains(&user)
    }
}

/// A room belonging to exactly one property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    id: RoomId,
    property_id: PropertyId,
}

impl Room {
    /// Creates a room record.
    #[must_use]
    pub const fn new(id: RoomId, property_id: PropertyId) -> Self {
        Self { id, property_id }
    }

    /// Returns the room identifier.
    #[must_use]
    pub const fn id(&self) -> RoomId {
        self.id
    }

    /// Returns the owning property.
    #[must_use]
    pub const fn property_id(&self) -> PropertyId {
        self.property_id
    }
}

/// A job grouping the rooms a task applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    room_ids: BTreeSet<RoomId>,
}

impl Job {
    /// Creates a job record.
    #[must_use]
    pub fn new(id: JobId, room_ids: impl IntoIterator<Item = RoomId>) -> Self {
        Self {
            id,
            room_ids: room_ids.into_iter().collect(),
        }
    }

    /// Returns the job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// Returns the rooms covered by this job.
    #[must_use]
    pub const fn room_ids(&self) -> &BTreeSet<RoomId> {
        &self.room_ids
    }
}

/// A machine owned by exactly one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    id: MachineId,
    name: String,
    property_id: PropertyId,
}

impl Machine {
    /// Creates a machine record.
    #[must_use]
    pub fn new(id: MachineId, name: impl Into<String>, property_id: PropertyId) -> Self {
        Self {
            id,
            name: name.into(),
            property_id,
        }
    }

    /// Returns the machine identifier.
    #[must_use]
    pub const fn id(&self) -> MachineId {
        self.id
    }

    /// Returns the machine display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning property.
    #[must_use]
    pub const fn property_id(&self) -> PropertyId {
        self.property_id
    }
}
