//! Core library for the snapkeep backup tool.
//!
//! The crate keeps a Vultr account under its snapshot quota: before a new
//! snapshot is requested, the oldest unprotected snapshots are deleted until a
//! slot is free. Provider access sits behind [`SnapshotGateway`] so the
//! retention logic runs against in-memory doubles in tests.

pub mod backup;
pub mod config;
pub mod directory;
pub mod gateway;
pub mod model;
pub mod policy;
pub mod report;
pub mod test_support;

pub use backup::{BackupError, BackupOrchestrator, BackupOutcome, BackupRequest, BackupStage};
pub use config::{ConfigError, SnapkeepConfig};
pub use directory::{DirectoryError, InstanceDirectory, SnapshotDirectory};
pub use gateway::{
    GatewayError, Operation, RejectionKind, ReqwestTransport, RetryPolicy, SnapshotGateway,
    Transport, TransportError, VultrGateway,
};
pub use model::{Instance, InstanceId, Snapshot, SnapshotId, SnapshotStatus};
pub use policy::{CAPACITY_LIMIT, select_eviction_candidate};
