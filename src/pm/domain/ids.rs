//! Identifier newtypes for the preventive-maintenance domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[doc = $doc:literal] $name:ident),+ $(,)?) => {
        $(
            #[doc = $doc]
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                /// Creates a new random identifier.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                /// Creates an identifier from an existing UUID.
                #[must_use]
                pub const fn from_uuid(uuid: Uuid) -> Self {
                    Self(uuid)
                }

                /// Returns the wrapped UUID.
                #[must_use]
                pub const fn into_inner(self) -> Uuid {
                    self.0
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl AsRef<Uuid> for $name {
                fn as_ref(&self) -> &Uuid {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )+
    };
}

uuid_id! {
    #[doc = "Unique identifier for a preventive-maintenance task record."]
    PmTaskId,
    #[doc = "Unique identifier for a machine record."]
    MachineId,
    #[doc = "Unique identifier for a room record."]
    RoomId,
    #[doc = "Unique identifier for a job record."]
    JobId,
    #[doc = "Unique identifier for a property (tenant scope)."]
    PropertyId,
    #[doc = "Unique identifier for an acting user."]
    UserId,
}
