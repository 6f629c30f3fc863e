//! BDD scenarios for the backup workflow.

use rstest_bdd_macros::scenario;

use super::test_helpers::{BackupContext, backup_context};

#[scenario(
    path = "tests/features/backup.feature",
    name = "Create a snapshot when the account has room"
)]
fn scenario_room_available(backup_context: BackupContext) {
    drop(backup_context);
}

#[scenario(
    path = "tests/features/backup.feature",
    name = "Evict the oldest snapshot when the account is full"
)]
fn scenario_full_account(backup_context: BackupContext) {
    drop(backup_context);
}

#[scenario(
    path = "tests/features/backup.feature",
    name = "Keep a protected oldest snapshot"
)]
fn scenario_protected_oldest(backup_context: BackupContext) {
    drop(backup_context);
}

#[scenario(
    path = "tests/features/backup.feature",
    name = "Refuse to run when every slot is protected"
)]
fn scenario_no_room(backup_context: BackupContext) {
    drop(backup_context);
}

#[scenario(
    path = "tests/features/backup.feature",
    name = "Stop when description protections leave nothing to evict"
)]
fn scenario_retention_exhausted(backup_context: BackupContext) {
    drop(backup_context);
}

#[scenario(
    path = "tests/features/backup.feature",
    name = "Abort when the provider rejects a deletion"
)]
fn scenario_delete_rejected(backup_context: BackupContext) {
    drop(backup_context);
}

#[scenario(
    path = "tests/features/backup.feature",
    name = "Reject an unknown instance"
)]
fn scenario_unknown_instance(backup_context: BackupContext) {
    drop(backup_context);
}
