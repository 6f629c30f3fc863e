//! Remote resource records returned by the Vultr API.
//!
//! Identifiers are opaque newtypes: they are compared for equality and
//! printed, never parsed.

use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a raw identifier.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    /// Provider identifier of a compute instance.
    InstanceId
);
newtype!(
    /// Provider identifier of a snapshot.
    SnapshotId
);

/// Compute instance as reported by `GET /instances`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Instance {
    /// Provider identifier.
    pub id: InstanceId,
    /// Operator-chosen label.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub label: String,
    /// Memory size in MiB.
    #[serde(default)]
    pub ram: u64,
    /// Primary IPv4 address.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub main_ip: String,
}

/// Lifecycle state of a snapshot.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SnapshotStatus {
    /// Snapshot is still being taken.
    Pending,
    /// Snapshot is usable.
    Complete,
    /// Any other provider value, kept verbatim.
    Other(String),
}

impl SnapshotStatus {
    /// Returns the provider spelling of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl From<String> for SnapshotStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => Self::Pending,
            "complete" => Self::Complete,
            _ => Self::Other(value),
        }
    }
}

impl<'de> Deserialize<'de> for SnapshotStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot as reported by `GET /snapshots`, plus the run-local protection
/// flag.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Snapshot {
    /// Provider identifier.
    pub id: SnapshotId,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Creation instant including the provider's UTC offset.
    pub date_created: DateTime<FixedOffset>,
    /// Provider status.
    pub status: SnapshotStatus,
    /// Free-text description.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Excluded from eviction for the current run. Never sent to or read
    /// from the provider.
    #[serde(skip)]
    pub protected: bool,
}

/// Snapshot handle returned by `POST /snapshots`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct CreatedSnapshot {
    /// Identifier assigned by the provider.
    pub id: SnapshotId,
    /// Initial provider status, usually `pending`.
    #[serde(default = "pending_status")]
    pub status: SnapshotStatus,
    /// Description echoed back by the provider.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

/// Pagination metadata attached to list responses.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct ListMeta {
    /// Authoritative number of resources in the account. Required: a
    /// listing without it cannot drive capacity decisions.
    pub total: usize,
}

/// Decoded body of `GET /instances`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct InstanceListing {
    /// Pagination metadata.
    #[serde(default)]
    pub meta: ListMeta,
    /// Instances in provider order.
    #[serde(default)]
    pub instances: Vec<Instance>,
}

/// Decoded body of `GET /snapshots`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct SnapshotListing {
    /// Pagination metadata carrying the authoritative total.
    pub meta: ListMeta,
    /// Snapshots in provider order.
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
}

const fn pending_status() -> SnapshotStatus {
    SnapshotStatus::Pending
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
