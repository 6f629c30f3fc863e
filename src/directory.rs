//! Run-local views of the provider's instances and snapshots.
//!
//! Both directories start empty and are populated at most once per run via
//! [`SnapshotDirectory::ensure_populated`] /
//! [`InstanceDirectory::ensure_populated`]. After that the snapshot
//! directory is the single source of truth for eviction decisions and is
//! kept in step with confirmed remote deletions.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::gateway::{GatewayError, SnapshotGateway};
use crate::model::{Instance, InstanceId, InstanceListing, Snapshot, SnapshotId, SnapshotListing};

/// Errors raised by directory bookkeeping.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DirectoryError {
    /// Raised when the directory is mutated before it was populated.
    #[error("snapshot directory has not been populated")]
    NotPopulated,
    /// Raised when removing an identifier the directory does not hold.
    #[error("snapshot {snapshot_id} is not in the directory")]
    UnknownSnapshot {
        /// Identifier passed by the caller.
        snapshot_id: SnapshotId,
    },
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct LoadedSnapshots {
    snapshots: Vec<Snapshot>,
    total: usize,
}

/// Ordered cache of the account's snapshots and their protection flags.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SnapshotDirectory {
    loaded: Option<LoadedSnapshots>,
}

impl SnapshotDirectory {
    /// Creates an unpopulated directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { loaded: None }
    }

    /// Creates a directory already populated from `listing`.
    #[must_use]
    pub fn from_listing(listing: SnapshotListing) -> Self {
        Self {
            loaded: Some(LoadedSnapshots {
                total: listing.meta.total,
                snapshots: listing.snapshots,
            }),
        }
    }

    /// Returns whether the directory holds a listing for this run.
    #[must_use]
    pub const fn is_populated(&self) -> bool {
        self.loaded.is_some()
    }

    /// Loads the snapshot listing unless it was already loaded this run.
    ///
    /// # Errors
    ///
    /// Returns the [`GatewayError`] from the listing call; the directory stays
    /// unpopulated in that case.
    pub async fn ensure_populated<G>(&mut self, gateway: &G) -> Result<(), GatewayError>
    where
        G: SnapshotGateway + ?Sized,
    {
        if self.loaded.is_none() {
            *self = Self::from_listing(gateway.list_snapshots().await?);
        }
        Ok(())
    }

    /// Returns the snapshot with `id`, if present.
    #[must_use]
    pub fn find(&self, id: &SnapshotId) -> Option<&Snapshot> {
        self.snapshots().find(|snapshot| snapshot.id == *id)
    }

    /// Marks the snapshot with `id` as ineligible for eviction. Unknown ids
    /// are ignored; callers validate existence first.
    pub fn mark_protected(&mut self, id: &SnapshotId) {
        if let Some(snapshot) = self
            .loaded
            .as_mut()
            .and_then(|loaded| loaded.snapshots.iter_mut().find(|snapshot| snapshot.id == *id))
        {
            snapshot.protected = true;
        }
    }

    /// Removes the snapshot with `id` and decrements the total by one.
    ///
    /// Call only after the provider confirmed the deletion.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotPopulated`] before population and
    /// [`DirectoryError::UnknownSnapshot`] when `id` is absent.
    pub fn remove_and_decrement(&mut self, id: &SnapshotId) -> Result<Snapshot, DirectoryError> {
        let loaded = self.loaded.as_mut().ok_or(DirectoryError::NotPopulated)?;
        let position = loaded
            .snapshots
            .iter()
            .position(|snapshot| snapshot.id == *id)
            .ok_or_else(|| DirectoryError::UnknownSnapshot {
                snapshot_id: id.clone(),
            })?;
        loaded.total = loaded.total.saturating_sub(1);
        Ok(loaded.snapshots.remove(position))
    }

    /// Provider-reported snapshot count, adjusted for deletions made this run.
    /// Zero while unpopulated.
    #[must_use]
    pub fn total(&self) -> usize {
        self.loaded.as_ref().map_or(0, |loaded| loaded.total)
    }

    /// Iterates over snapshots in provider order.
    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.loaded
            .as_ref()
            .map(|loaded| loaded.snapshots.as_slice())
            .unwrap_or_default()
            .iter()
    }

    /// Number of snapshots currently flagged as protected.
    #[must_use]
    pub fn protected_count(&self) -> usize {
        self.snapshots().filter(|snapshot| snapshot.protected).count()
    }

    /// Collects the ids of snapshots whose description contains any of
    /// `patterns`. Blank patterns match nothing.
    #[must_use]
    pub fn ids_matching_descriptions<S: AsRef<str>>(&self, patterns: &[S]) -> BTreeSet<SnapshotId> {
        let mut matches = BTreeSet::new();
        for pattern in patterns.iter().map(AsRef::as_ref) {
            if pattern.is_empty() {
                continue;
            }
            matches.extend(
                self.snapshots()
                    .filter(|snapshot| snapshot.description.contains(pattern))
                    .map(|snapshot| snapshot.id.clone()),
            );
        }
        matches
    }
}

/// Cache of the account's instances.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InstanceDirectory {
    instances: Option<Vec<Instance>>,
}

impl InstanceDirectory {
    /// Creates an unpopulated directory.
    #[must_use]
    pub const fn new() -> Self {
        Self { instances: None }
    }

    /// Creates a directory already populated from `listing`.
    #[must_use]
    pub fn from_listing(listing: InstanceListing) -> Self {
        Self {
            instances: Some(listing.instances),
        }
    }

    /// Loads the instance listing unless it was already loaded this run.
    ///
    /// # Errors
    ///
    /// Returns the [`GatewayError`] from the listing call.
    pub async fn ensure_populated<G>(&mut self, gateway: &G) -> Result<(), GatewayError>
    where
        G: SnapshotGateway + ?Sized,
    {
        if self.instances.is_none() {
            *self = Self::from_listing(gateway.list_instances().await?);
        }
        Ok(())
    }

    /// Returns the instance with `id`, if present.
    #[must_use]
    pub fn find(&self, id: &InstanceId) -> Option<&Instance> {
        self.instances().iter().find(|instance| instance.id == *id)
    }

    /// Returns whether an instance with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &InstanceId) -> bool {
        self.find(id).is_some()
    }

    /// Returns the instances in provider order; empty while unpopulated.
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        self.instances.as_deref().unwrap_or_default()
    }
}
