//! Backup orchestration under the provider's snapshot quota.
//!
//! One run walks `ValidateInstance → ApplyProtections → EnforceCapacity →
//! CreateSnapshot` and stops at the first failure. Deletions already made
//! are not undone when a later state fails.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::directory::{InstanceDirectory, SnapshotDirectory};
use crate::gateway::SnapshotGateway;
use crate::model::{CreatedSnapshot, InstanceId, SnapshotId};
use crate::policy::{CAPACITY_LIMIT, evictions_required, select_eviction_candidate};

mod error;

pub use error::{BackupError, BackupStage};

/// Inputs for one backup run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackupRequest {
    /// Instance to snapshot.
    pub instance_id: InstanceId,
    /// Description attached to the new snapshot.
    pub description: String,
    /// Snapshots that must never be evicted, by identifier.
    pub protected_snapshots: BTreeSet<SnapshotId>,
    /// Snapshots whose description contains any of these substrings are
    /// also protected.
    pub protected_descriptions: Vec<String>,
}

impl BackupRequest {
    /// Starts a request for `instance_id` with no protections.
    #[must_use]
    pub fn new(instance_id: impl Into<InstanceId>, description: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            description: description.into(),
            protected_snapshots: BTreeSet::new(),
            protected_descriptions: Vec::new(),
        }
    }

    /// Protects the snapshot with `id`.
    #[must_use]
    pub fn protect_snapshot(mut self, id: impl Into<SnapshotId>) -> Self {
        self.protected_snapshots.insert(id.into());
        self
    }

    /// Protects every snapshot whose description contains `pattern`.
    #[must_use]
    pub fn protect_description(mut self, pattern: impl Into<String>) -> Self {
        self.protected_descriptions.push(pattern.into());
        self
    }
}

/// Result of a successful run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BackupOutcome {
    /// Snapshot created by the provider.
    pub snapshot: CreatedSnapshot,
    /// Snapshots deleted to make room, oldest first.
    pub evicted: Vec<SnapshotId>,
    /// Directory total after evictions. The new snapshot is not folded back.
    pub remaining_total: usize,
}

/// Drives eviction and creation against a [`SnapshotGateway`].
#[derive(Debug)]
pub struct BackupOrchestrator<G> {
    gateway: G,
    instances: InstanceDirectory,
    snapshots: SnapshotDirectory,
}

impl<G: SnapshotGateway> BackupOrchestrator<G> {
    /// Creates an orchestrator with empty directories.
    #[must_use]
    pub const fn new(gateway: G) -> Self {
        Self {
            gateway,
            instances: InstanceDirectory::new(),
            snapshots: SnapshotDirectory::new(),
        }
    }

    /// Returns the gateway.
    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Returns the run's instance directory.
    #[must_use]
    pub const fn instances(&self) -> &InstanceDirectory {
        &self.instances
    }

    /// Returns the run's snapshot directory.
    #[must_use]
    pub const fn snapshots(&self) -> &SnapshotDirectory {
        &self.snapshots
    }

    /// Runs the full workflow for `request`.
    ///
    /// # Errors
    ///
    /// Returns the first [`BackupError`] raised by any state; see the
    /// individual state methods.
    pub async fn execute(&mut self, request: &BackupRequest) -> Result<BackupOutcome, BackupError> {
        self.validate_instance(&request.instance_id).await?;
        Self::ensure_room_for_new_snapshot(request)?;
        self.apply_protections(request).await?;
        let evicted = self.enforce_capacity().await?;
        let snapshot = self
            .create_snapshot(&request.instance_id, &request.description)
            .await?;

        Ok(BackupOutcome {
            snapshot,
            evicted,
            remaining_total: self.snapshots.total(),
        })
    }

    /// Checks that `instance_id` exists. Repeated calls give the same answer
    /// for the same directory.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::UnknownInstance`] with the known instances, or
    /// [`BackupError::Gateway`] when the listing fails.
    pub async fn validate_instance(&mut self, instance_id: &InstanceId) -> Result<(), BackupError> {
        self.instances
            .ensure_populated(&self.gateway)
            .await
            .map_err(BackupError::gateway(BackupStage::ValidateInstance))?;
        if self.instances.contains(instance_id) {
            return Ok(());
        }
        Err(BackupError::UnknownInstance {
            instance_id: instance_id.clone(),
            known: self.instances.instances().to_vec(),
        })
    }

    fn ensure_room_for_new_snapshot(request: &BackupRequest) -> Result<(), BackupError> {
        let protected = request.protected_snapshots.len();
        if protected >= CAPACITY_LIMIT {
            return Err(BackupError::NoRoomForNewSnapshot {
                protected,
                limit: CAPACITY_LIMIT,
            });
        }
        Ok(())
    }

    /// Loads snapshots and flags every protected one, explicit ids first,
    /// then description matches. Returns the number of protected snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::UnknownProtectedSnapshot`] when an explicit id
    /// does not exist, or [`BackupError::Gateway`] when the listing fails.
    pub async fn apply_protections(&mut self, request: &BackupRequest) -> Result<usize, BackupError> {
        self.snapshots
            .ensure_populated(&self.gateway)
            .await
            .map_err(BackupError::gateway(BackupStage::ApplyProtections))?;

        let by_description = self
            .snapshots
            .ids_matching_descriptions(request.protected_descriptions.as_slice());
        debug!(
            patterns = request.protected_descriptions.len(),
            matched = by_description.len(),
            "resolved description protections"
        );

        for id in &request.protected_snapshots {
            if self.snapshots.find(id).is_none() {
                return Err(BackupError::UnknownProtectedSnapshot {
                    snapshot_id: id.clone(),
                    known: self.snapshots.snapshots().map(|s| s.id.clone()).collect(),
                });
            }
            self.snapshots.mark_protected(id);
        }
        for id in &by_description {
            self.snapshots.mark_protected(id);
        }

        let protected = self.snapshots.protected_count();
        debug!(protected, "protections applied");
        Ok(protected)
    }

    /// Deletes the oldest unprotected snapshots until the total drops below
    /// the capacity limit. Returns the deleted ids in deletion order.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::RetentionExhausted`] when no unprotected
    /// snapshot is left while at capacity, or [`BackupError::Gateway`] when a
    /// listing or deletion fails. Deletions made before the failure stand.
    pub async fn enforce_capacity(&mut self) -> Result<Vec<SnapshotId>, BackupError> {
        self.snapshots
            .ensure_populated(&self.gateway)
            .await
            .map_err(BackupError::gateway(BackupStage::EnforceCapacity))?;

        let planned = evictions_required(self.snapshots.total(), CAPACITY_LIMIT);
        if planned > 0 {
            info!(
                total = self.snapshots.total(),
                limit = CAPACITY_LIMIT,
                planned,
                "snapshot quota reached, evicting oldest unprotected snapshots"
            );
        }

        let mut evicted = Vec::with_capacity(planned);
        while self.snapshots.total() >= CAPACITY_LIMIT {
            let Some(candidate) = select_eviction_candidate(&self.snapshots) else {
                return Err(BackupError::RetentionExhausted {
                    total: self.snapshots.total(),
                    limit: CAPACITY_LIMIT,
                    protected: self.snapshots.protected_count(),
                });
            };
            self.gateway
                .delete_snapshot(&candidate)
                .await
                .map_err(BackupError::gateway(BackupStage::EnforceCapacity))?;
            self.snapshots.remove_and_decrement(&candidate)?;
            info!(snapshot_id = %candidate, total = self.snapshots.total(), "deleted snapshot");
            evicted.push(candidate);
        }
        Ok(evicted)
    }

    /// Requests a new snapshot once the directory shows a free slot.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::QuotaExceeded`] when the directory is still at
    /// capacity, or [`BackupError::Gateway`] when the provider call fails.
    pub async fn create_snapshot(
        &mut self,
        instance_id: &InstanceId,
        description: &str,
    ) -> Result<CreatedSnapshot, BackupError> {
        let total = self.snapshots.total();
        if total >= CAPACITY_LIMIT {
            return Err(BackupError::QuotaExceeded {
                total,
                limit: CAPACITY_LIMIT,
            });
        }
        let created = self
            .gateway
            .create_snapshot(instance_id, description)
            .await
            .map_err(BackupError::gateway(BackupStage::CreateSnapshot))?;
        info!(snapshot_id = %created.id, instance_id = %instance_id, "created snapshot");
        Ok(created)
    }
}
