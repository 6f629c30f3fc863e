//! Configuration loading via `ortho-config`.

use std::collections::BTreeSet;
use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::backup::BackupRequest;
use crate::gateway::DEFAULT_API_BASE_URL;
use crate::model::{InstanceId, SnapshotId};

/// Settings for talking to Vultr and for the backup run, derived from
/// defaults, `snapkeep.toml`, and `SNAPKEEP_*` environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "SNAPKEEP",
    discovery(
        app_name = "snapkeep",
        env_var = "SNAPKEEP_CONFIG_PATH",
        config_file_name = "snapkeep.toml",
        dotfile_name = ".snapkeep.toml",
        project_file_name = "snapkeep.toml"
    )
)]
pub struct SnapkeepConfig {
    /// Personal access token for the Vultr API. Every command requires it;
    /// [`SnapkeepConfig::validate`] reports it when blank.
    #[ortho_config(default = String::new())]
    pub api_token: String,
    /// Instance to snapshot. Required by `backup`, ignored by `list`.
    #[ortho_config(default = String::new())]
    pub instance_id: String,
    /// Description attached to every new snapshot.
    #[ortho_config(default = String::new())]
    pub description: String,
    /// Snapshot identifiers that are never evicted.
    #[ortho_config(default = Vec::new())]
    pub protected_snapshots: Vec<String>,
    /// Snapshots whose description contains any of these substrings are
    /// never evicted.
    #[ortho_config(default = Vec::new())]
    pub protected_descriptions: Vec<String>,
    /// Base URL of the Vultr API. Defaults to the public v2 endpoint.
    #[ortho_config(default = DEFAULT_API_BASE_URL.to_owned())]
    pub api_base_url: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

const API_TOKEN: FieldMetadata =
    FieldMetadata::new("Vultr API token", "SNAPKEEP_API_TOKEN", "api_token");
const INSTANCE_ID: FieldMetadata =
    FieldMetadata::new("instance ID to back up", "SNAPKEEP_INSTANCE_ID", "instance_id");
const API_BASE_URL: FieldMetadata =
    FieldMetadata::new("Vultr API base URL", "SNAPKEEP_API_BASE_URL", "api_base_url");

impl SnapkeepConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to snapkeep.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("snapkeep")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Validates the settings every command needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the API token or base URL
    /// is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(&self.api_token, &API_TOKEN)?;
        Self::require_field(&self.api_base_url, &API_BASE_URL)?;
        Ok(())
    }

    /// Builds the [`BackupRequest`] for the configured instance. Identifiers
    /// and patterns are trimmed; duplicate ids collapse.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the instance id is blank and
    /// [`ConfigError::InvalidEntry`] when a protected id or pattern is blank.
    pub fn backup_request(&self) -> Result<BackupRequest, ConfigError> {
        self.validate()?;
        Self::require_field(&self.instance_id, &INSTANCE_ID)?;

        let protected_snapshots = self
            .protected_snapshots
            .iter()
            .map(|id| non_blank(id, "protected_snapshots").map(SnapshotId::new))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let protected_descriptions = self
            .protected_descriptions
            .iter()
            .map(|pattern| non_blank(pattern, "protected_descriptions").map(str::to_owned))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BackupRequest {
            instance_id: InstanceId::new(self.instance_id.trim()),
            description: self.description.clone(),
            protected_snapshots,
            protected_descriptions,
        })
    }
}

fn non_blank<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidEntry { field });
    }
    Ok(trimmed)
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a list contains a blank entry.
    #[error("{field} must not contain blank entries")]
    InvalidEntry {
        /// Name of the list field.
        field: &'static str,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
