//! Shared fixtures for backup BDD scenarios.

use rstest::fixture;
use snapkeep::test_support::{FakeProvider, instance};
use snapkeep::{BackupError, BackupOutcome, BackupRequest};

pub const INSTANCE_ID: &str = "inst-a";

#[derive(Clone, Debug)]
pub struct BackupContext {
    pub provider: FakeProvider,
    pub request: BackupRequest,
    pub outcome: Option<BackupResult>,
}

#[derive(Clone, Debug)]
pub enum BackupResult {
    Success(BackupOutcome),
    Failure(BackupError),
}

#[fixture]
pub fn backup_context() -> BackupContext {
    BackupContext {
        provider: FakeProvider::new().with_instance(instance(INSTANCE_ID, "web")),
        request: BackupRequest::new(INSTANCE_ID, "scheduled backup"),
        outcome: None,
    }
}
