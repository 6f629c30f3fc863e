//! Unit tests for configuration validation and backup request derivation.

use snapkeep::gateway::DEFAULT_API_BASE_URL;
use snapkeep::test_support::EnvGuard;
use snapkeep::{SnapkeepConfig, SnapshotId, config::ConfigError};
use rstest::*;

#[fixture]
fn valid_config() -> SnapkeepConfig {
    SnapkeepConfig {
        api_token: String::from("VULTRTOKENEXAMPLE"),
        instance_id: String::from("cb676a46-66fd-4dfb-b839-443f2e6c0b60"),
        description: String::from("nightly"),
        protected_snapshots: Vec::new(),
        protected_descriptions: Vec::new(),
        api_base_url: String::from(DEFAULT_API_BASE_URL),
    }
}

#[rstest]
fn config_validation_accepts_complete_config(valid_config: SnapkeepConfig) {
    assert!(valid_config.validate().is_ok());
}

#[rstest]
#[case::api_token("SNAPKEEP_API_TOKEN", "api_token")]
#[case::api_base_url("SNAPKEEP_API_BASE_URL", "api_base_url")]
fn config_validation_produces_actionable_errors(
    valid_config: SnapkeepConfig,
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = valid_config;
    match toml_key {
        "api_token" => cfg.api_token = String::from("   "),
        _ => cfg.api_base_url = String::new(),
    }

    let error = cfg.validate().expect_err("validation should fail");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains("snapkeep.toml"),
        "error should mention config file: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention TOML key {toml_key}: {message}"
    );
}

#[rstest]
fn backup_request_requires_instance_id(valid_config: SnapkeepConfig) {
    let cfg = SnapkeepConfig {
        instance_id: String::new(),
        ..valid_config
    };

    let error = cfg.backup_request().expect_err("instance id is required");

    assert!(
        error.to_string().contains("SNAPKEEP_INSTANCE_ID"),
        "unexpected error: {error}"
    );
}

#[rstest]
fn backup_request_trims_and_deduplicates_protections(valid_config: SnapkeepConfig) {
    let cfg = SnapkeepConfig {
        instance_id: String::from("  inst-a "),
        protected_snapshots: vec![
            String::from("snap-1"),
            String::from(" snap-1"),
            String::from("snap-2 "),
        ],
        protected_descriptions: vec![String::from(" golden ")],
        ..valid_config
    };

    let request = cfg
        .backup_request()
        .unwrap_or_else(|err| panic!("request should build: {err}"));

    assert_eq!(request.instance_id.as_str(), "inst-a");
    assert_eq!(request.description, "nightly");
    assert_eq!(
        request.protected_snapshots.into_iter().collect::<Vec<_>>(),
        vec![SnapshotId::new("snap-1"), SnapshotId::new("snap-2")]
    );
    assert_eq!(request.protected_descriptions, vec![String::from("golden")]);
}

#[rstest]
#[case::snapshots(vec![String::from(" ")], Vec::new(), "protected_snapshots")]
#[case::descriptions(Vec::new(), vec![String::new()], "protected_descriptions")]
fn backup_request_rejects_blank_protections(
    valid_config: SnapkeepConfig,
    #[case] protected_snapshots: Vec<String>,
    #[case] protected_descriptions: Vec<String>,
    #[case] field: &str,
) {
    let cfg = SnapkeepConfig {
        protected_snapshots,
        protected_descriptions,
        ..valid_config
    };

    let error = cfg.backup_request().expect_err("blank entry should fail");

    assert!(
        matches!(error, ConfigError::InvalidEntry { field: actual } if actual == field),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn config_loads_from_environment_with_default_base_url() {
    let _guard = EnvGuard::set_vars(&[
        ("SNAPKEEP_API_TOKEN", "token-from-env"),
        ("SNAPKEEP_INSTANCE_ID", "inst-env"),
    ])
    .await;

    let cfg = SnapkeepConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("config should load from env: {err}"));

    assert_eq!(cfg.api_token, "token-from-env");
    assert_eq!(cfg.instance_id, "inst-env");
    assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
}
