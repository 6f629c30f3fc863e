//! Binary entry point for the snapkeep CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use snapkeep::report::{write_backup_outcome, write_instance_table, write_snapshot_table};
use snapkeep::{
    BackupError, BackupOrchestrator, BackupRequest, ConfigError, ReqwestTransport,
    SnapkeepConfig, SnapshotGateway, TransportError, VultrGateway,
};

mod cli;

use cli::Cli;

/// Environment variable holding the tracing filter directive.
const LOG_ENV: &str = "SNAPKEEP_LOG";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("backup failed: {0}")]
    Backup(#[from] BackupError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let config = SnapkeepConfig::load_without_cli_args()?;
    config.validate()?;
    let gateway = VultrGateway::new(ReqwestTransport::new(
        &config.api_base_url,
        &config.api_token,
    )?);

    match cli {
        Cli::List => list(&gateway, io::stdout(), io::stderr()).await,
        Cli::Backup => {
            let request = config.backup_request()?;
            backup(gateway, &request, io::stdout()).await
        }
    }
}

/// Prints both tables. Listing failures are reported on `err` and do not
/// change the exit status.
async fn list<G: SnapshotGateway>(
    gateway: &G,
    mut out: impl Write,
    mut err: impl Write,
) -> Result<i32, CliError> {
    match gateway.list_instances().await {
        Ok(listing) => write_instance_table(&mut out, &listing.instances)?,
        Err(error) => writeln!(err, "failed to list instances: {error}")?,
    }
    writeln!(out)?;
    match gateway.list_snapshots().await {
        Ok(listing) => write_snapshot_table(&mut out, &listing.snapshots, listing.meta.total)?,
        Err(error) => writeln!(err, "failed to list snapshots: {error}")?,
    }
    Ok(0)
}

async fn backup<G: SnapshotGateway>(
    gateway: G,
    request: &BackupRequest,
    mut out: impl Write,
) -> Result<i32, CliError> {
    let mut orchestrator = BackupOrchestrator::new(gateway);
    match orchestrator.execute(request).await {
        Ok(outcome) => {
            write_backup_outcome(&mut out, &outcome)?;
            Ok(0)
        }
        Err(err) => {
            match &err {
                BackupError::UnknownInstance { known, .. } => {
                    write_instance_table(&mut out, known)?;
                }
                BackupError::UnknownProtectedSnapshot { .. } => {
                    let snapshots = orchestrator.snapshots();
                    write_snapshot_table(&mut out, snapshots.snapshots(), snapshots.total())?;
                }
                _ => {}
            }
            Err(err.into())
        }
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapkeep::gateway::{GatewayError, Operation};
    use snapkeep::test_support::{FakeProvider, daily_snapshots, instance};

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap_or_else(|err| panic!("utf8: {err}"))
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing {needle:?} in {haystack}"))
    }

    #[tokio::test]
    async fn list_prints_instances_then_snapshots() {
        let provider = FakeProvider::new()
            .with_instance(instance("inst-a", "web"))
            .with_snapshots(daily_snapshots(2));
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = list(&provider, &mut out, &mut err)
            .await
            .unwrap_or_else(|error| panic!("list should not fail: {error}"));

        let rendered = text(out);
        assert_eq!(code, 0);
        assert!(err.is_empty());
        assert!(position(&rendered, "Instance List:") < position(&rendered, "Snapshot List:"));
        assert!(rendered.contains("\n\nSnapshot List:"));
        assert!(rendered.contains("Total: 2"));
    }

    #[tokio::test]
    async fn list_reports_failures_but_exits_zero() {
        let provider = FakeProvider::new().with_snapshots(daily_snapshots(1));
        provider.fail_next(
            Operation::ListInstances,
            GatewayError::rejected(Operation::ListInstances, 401, "unauthorized"),
        );
        let (mut out, mut err) = (Vec::new(), Vec::new());

        let code = list(&provider, &mut out, &mut err)
            .await
            .unwrap_or_else(|error| panic!("list should not fail: {error}"));

        assert_eq!(code, 0);
        assert!(text(err).contains("failed to list instances"));
        assert!(text(out).contains("snap-01"));
    }

    #[tokio::test]
    async fn backup_prints_created_snapshot() {
        let provider = FakeProvider::new()
            .with_instance(instance("inst-a", "web"))
            .with_snapshots(daily_snapshots(10));
        let mut out = Vec::new();

        let code = backup(provider, &BackupRequest::new("inst-a", "nightly"), &mut out)
            .await
            .unwrap_or_else(|error| panic!("backup should succeed: {error}"));

        let rendered = text(out);
        assert_eq!(code, 0);
        assert!(rendered.contains("deleted snapshot snap-01"));
        assert!(rendered.contains("created snapshot created-1"));
    }

    #[tokio::test]
    async fn unknown_instance_prints_available_instances() {
        let provider = FakeProvider::new().with_instance(instance("inst-b", "db"));
        let mut out = Vec::new();

        let Err(err) = backup(provider, &BackupRequest::new("inst-a", ""), &mut out).await else {
            panic!("instance is unknown");
        };

        assert!(matches!(
            err,
            CliError::Backup(BackupError::UnknownInstance { .. })
        ));
        assert!(text(out).contains("inst-b"));
    }

    #[tokio::test]
    async fn unknown_protected_snapshot_prints_available_snapshots() {
        let provider = FakeProvider::new()
            .with_instance(instance("inst-a", "web"))
            .with_snapshots(daily_snapshots(3));
        let request = BackupRequest::new("inst-a", "").protect_snapshot("snap-99");
        let mut out = Vec::new();

        let Err(err) = backup(provider.clone(), &request, &mut out).await else {
            panic!("protected snapshot is unknown");
        };

        assert!(matches!(
            err,
            CliError::Backup(BackupError::UnknownProtectedSnapshot { .. })
        ));
        assert!(err.to_string().contains("3 snapshot(s) available"));
        let rendered = text(out);
        for id in ["snap-01", "snap-02", "snap-03"] {
            assert!(rendered.contains(id), "missing {id} in {rendered}");
        }
        assert!(provider.deleted().is_empty());
        assert_eq!(provider.create_calls(), 0);
    }

    #[test]
    fn write_error_writes_cli_error() {
        let mut buf = Vec::new();
        let err = CliError::Config(ConfigError::InvalidEntry {
            field: "protected_snapshots",
        });
        write_error(&mut buf, &err);
        let rendered = text(buf);
        assert!(
            rendered.contains("protected_snapshots must not contain blank entries"),
            "rendered: {rendered}"
        );
    }
}
