//! Eviction decisions over a [`SnapshotDirectory`].
//!
//! Everything here is pure: the orchestrator owns every state change.

use crate::directory::SnapshotDirectory;
use crate::model::SnapshotId;

/// Maximum number of snapshots a Vultr account may hold.
pub const CAPACITY_LIMIT: usize = 10;

/// Picks the unprotected snapshot with the earliest creation instant.
///
/// Instants are compared as points in time, so snapshots reported with
/// different UTC offsets order correctly. When several candidates share the
/// same instant the one listed first by the provider is returned; that
/// tie-break is unspecified and callers must not depend on it.
///
/// Returns `None` when every snapshot is protected or the directory is empty.
#[must_use]
pub fn select_eviction_candidate(directory: &SnapshotDirectory) -> Option<SnapshotId> {
    directory
        .snapshots()
        .filter(|snapshot| !snapshot.protected)
        .reduce(|oldest, snapshot| {
            if snapshot.date_created < oldest.date_created {
                snapshot
            } else {
                oldest
            }
        })
        .map(|snapshot| snapshot.id.clone())
}

/// Number of deletions needed before one more snapshot fits under `limit`.
#[must_use]
pub const fn evictions_required(total: usize, limit: usize) -> usize {
    if total >= limit { total - limit + 1 } else { 0 }
}
