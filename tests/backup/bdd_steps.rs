//! BDD step definitions for the `snapkeep backup` workflow.

use rstest_bdd_macros::{given, then, when};
use snapkeep::gateway::{GatewayError, Operation};
use snapkeep::test_support::daily_snapshots;
use snapkeep::{BackupError, BackupOrchestrator, SnapshotId};
use tokio::runtime::Runtime;

use super::test_helpers::{BackupContext, BackupResult};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("an account with \"{count}\" daily snapshots")]
fn account_with_snapshots(mut backup_context: BackupContext, count: usize) -> BackupContext {
    backup_context.provider = backup_context
        .provider
        .with_snapshots(daily_snapshots(count));
    backup_context
}

#[given("snapshot \"{id}\" is protected")]
fn snapshot_protected(mut backup_context: BackupContext, id: String) -> BackupContext {
    backup_context.request = backup_context.request.protect_snapshot(id);
    backup_context
}

#[given("every snapshot is protected")]
fn every_snapshot_protected(mut backup_context: BackupContext) -> BackupContext {
    for id in backup_context.provider.snapshot_ids() {
        backup_context.request = backup_context.request.protect_snapshot(id);
    }
    backup_context
}

#[given("snapshots described as \"{pattern}\" are protected")]
fn description_protected(mut backup_context: BackupContext, pattern: String) -> BackupContext {
    backup_context.request = backup_context.request.protect_description(pattern);
    backup_context
}

#[given("the provider rejects the next deletion with status \"{status}\"")]
fn deletion_rejected(backup_context: BackupContext, status: u16) -> BackupContext {
    backup_context.provider.fail_next(
        Operation::DeleteSnapshot,
        GatewayError::rejected(Operation::DeleteSnapshot, status, "rejected by provider"),
    );
    backup_context
}

#[given("the backup targets instance \"{id}\"")]
fn targets_instance(mut backup_context: BackupContext, id: String) -> BackupContext {
    backup_context.request.instance_id = id.into();
    backup_context
}

#[when("I run the backup")]
fn run_backup(backup_context: BackupContext) -> Result<BackupContext, StepError> {
    let runtime = Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))?;
    let BackupContext {
        provider, request, ..
    } = backup_context;

    let mut orchestrator = BackupOrchestrator::new(provider.clone());
    let result = runtime.block_on(orchestrator.execute(&request));
    let outcome = match result {
        Ok(outcome) => BackupResult::Success(outcome),
        Err(err) => BackupResult::Failure(err),
    };

    Ok(BackupContext {
        provider,
        request,
        outcome: Some(outcome),
    })
}

#[then("the backup succeeds")]
fn backup_succeeds(backup_context: &BackupContext) -> Result<(), StepError> {
    match backup_context.outcome {
        Some(BackupResult::Success(_)) => Ok(()),
        Some(BackupResult::Failure(ref err)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {err}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the backup fails with \"{kind}\"")]
fn backup_fails_with(backup_context: &BackupContext, kind: String) -> Result<(), StepError> {
    let Some(BackupResult::Failure(err)) = &backup_context.outcome else {
        return Err(StepError::Assertion(String::from(
            "expected failure outcome",
        )));
    };
    let actual = failure_kind(err);
    if actual == kind {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure kind {kind}, got {actual} ({err})"
        )))
    }
}

#[then("snapshot \"{id}\" was deleted")]
fn snapshot_deleted(backup_context: &BackupContext, id: String) -> Result<(), StepError> {
    let deleted = backup_context.provider.deleted();
    if deleted == vec![SnapshotId::new(id.as_str())] {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected only {id} to be deleted, got {deleted:?}"
        )))
    }
}

#[then("no snapshot was deleted")]
fn nothing_deleted(backup_context: &BackupContext) -> Result<(), StepError> {
    let deleted = backup_context.provider.deleted();
    if deleted.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no deletions, got {deleted:?}"
        )))
    }
}

#[then("no snapshot was created")]
fn nothing_created(backup_context: &BackupContext) -> Result<(), StepError> {
    if backup_context.provider.create_calls() == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(String::from(
            "create_snapshot should not be called",
        )))
    }
}

#[then("the account holds \"{count}\" snapshots")]
fn account_holds(backup_context: &BackupContext, count: usize) -> Result<(), StepError> {
    let held = backup_context.provider.snapshot_ids().len();
    if held == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} snapshots, account holds {held}"
        )))
    }
}

const fn failure_kind(err: &BackupError) -> &'static str {
    match err {
        BackupError::UnknownInstance { .. } => "unknown instance",
        BackupError::UnknownProtectedSnapshot { .. } => "unknown protected snapshot",
        BackupError::RetentionExhausted { .. } => "retention exhausted",
        BackupError::NoRoomForNewSnapshot { .. } => "no room",
        BackupError::QuotaExceeded { .. } => "quota exceeded",
        BackupError::Gateway { .. } => "gateway",
        BackupError::Directory(_) => "directory",
    }
}
