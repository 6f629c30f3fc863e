//! Plain-text tables for the `list` command and backup diagnostics.

use std::io::{self, Write};

use crate::backup::BackupOutcome;
use crate::model::{Instance, Snapshot};

/// Writes the instance table.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn write_instance_table<'a>(
    mut out: impl Write,
    instances: impl IntoIterator<Item = &'a Instance>,
) -> io::Result<()> {
    writeln!(out, "Instance List:")?;
    writeln!(out, "{:<36} {:<20} {:>8}  Main IP", "ID", "Label", "RAM")?;
    for instance in instances {
        writeln!(
            out,
            "{:<36} {:<20} {:>8}  {}",
            instance.id.as_str(),
            instance.label,
            instance.ram,
            instance.main_ip
        )?;
    }
    Ok(())
}

/// Writes the snapshot table followed by the reported total.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn write_snapshot_table<'a>(
    mut out: impl Write,
    snapshots: impl IntoIterator<Item = &'a Snapshot>,
    total: usize,
) -> io::Result<()> {
    writeln!(out, "Snapshot List:")?;
    writeln!(
        out,
        "{:<36} {:>14} {:<25} {:<9} Description",
        "ID", "Size", "Created Date", "Status"
    )?;
    for snapshot in snapshots {
        writeln!(
            out,
            "{:<36} {:>14} {:<25} {:<9} \"{}\"",
            snapshot.id.as_str(),
            snapshot.size,
            snapshot.date_created.to_rfc3339(),
            snapshot.status.as_str(),
            snapshot.description
        )?;
    }
    writeln!(out, "Total: {total}")
}

/// Writes the confirmation printed after a successful backup.
///
/// # Errors
///
/// Propagates write failures from `out`.
pub fn write_backup_outcome(mut out: impl Write, outcome: &BackupOutcome) -> io::Result<()> {
    for evicted in &outcome.evicted {
        writeln!(out, "deleted snapshot {evicted}")?;
    }
    writeln!(out, "created snapshot {}", outcome.snapshot.id)
}
