//! Error types for the backup workflow.

use std::fmt;

use thiserror::Error;

use crate::directory::DirectoryError;
use crate::gateway::GatewayError;
use crate::model::{Instance, InstanceId, SnapshotId};

/// State of the backup workflow in which a failure occurred.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BackupStage {
    /// Checking the target instance exists.
    ValidateInstance,
    /// Loading snapshots and marking protected ones.
    ApplyProtections,
    /// Evicting snapshots until one slot is free.
    EnforceCapacity,
    /// Requesting the new snapshot.
    CreateSnapshot,
}

impl fmt::Display for BackupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ValidateInstance => "instance validation",
            Self::ApplyProtections => "protection marking",
            Self::EnforceCapacity => "capacity enforcement",
            Self::CreateSnapshot => "snapshot creation",
        })
    }
}

/// Errors raised by [`super::BackupOrchestrator`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum BackupError {
    /// Raised when the target instance is not in the account.
    #[error("instance {instance_id} not found ({} instance(s) available)", .known.len())]
    UnknownInstance {
        /// Instance requested by the operator.
        instance_id: InstanceId,
        /// Instances the account does hold, for operator correction.
        known: Vec<Instance>,
    },
    /// Raised when a configured protected snapshot does not exist.
    #[error(
        "protected snapshot {snapshot_id} not found in the snapshot list ({} snapshot(s) available)",
        .known.len()
    )]
    UnknownProtectedSnapshot {
        /// Identifier from the protected list.
        snapshot_id: SnapshotId,
        /// Snapshots the account does hold.
        known: Vec<SnapshotId>,
    },
    /// Raised when the account is at capacity and nothing is evictable.
    #[error(
        "{total} snapshot(s) reach the limit of {limit} and all {protected} remaining are protected"
    )]
    RetentionExhausted {
        /// Snapshot count at the time of failure.
        total: usize,
        /// Capacity limit.
        limit: usize,
        /// Number of protected snapshots.
        protected: usize,
    },
    /// Raised before any mutation when protections alone fill every slot.
    #[error(
        "{protected} protected snapshot(s) fill the limit of {limit}; remove at least {} from the protected list",
        (.protected + 1).saturating_sub(*.limit)
    )]
    NoRoomForNewSnapshot {
        /// Number of configured protected snapshot ids.
        protected: usize,
        /// Capacity limit.
        limit: usize,
    },
    /// Raised when capacity is still exhausted right before creation.
    #[error("snapshot quota exceeded: {total} of {limit} slots in use")]
    QuotaExceeded {
        /// Snapshot count seen by the guard.
        total: usize,
        /// Capacity limit.
        limit: usize,
    },
    /// Raised when a provider call fails.
    #[error("{stage} failed: {source}")]
    Gateway {
        /// Workflow state that issued the call.
        stage: BackupStage,
        /// Underlying gateway error.
        #[source]
        source: GatewayError,
    },
    /// Raised when directory bookkeeping disagrees with the provider.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl BackupError {
    pub(super) fn gateway(stage: BackupStage) -> impl Fn(GatewayError) -> Self {
        move |source| Self::Gateway { stage, source }
    }
}
