//! Command-line interface definitions for the `snapkeep` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `snapkeep` binary.
#[derive(Debug, Parser)]
#[command(
    name = "snapkeep",
    about = "Snapshot a Vultr instance while staying under the account's snapshot quota",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// List instances and snapshots.
    #[command(name = "list", about = "List the account's instances and snapshots")]
    List,
    /// Create a snapshot, deleting the oldest unprotected ones at the limit.
    #[command(
        name = "backup",
        about = "Create a snapshot (deleting the oldest unprotected snapshots when the limit of 10 is reached)"
    )]
    Backup,
}
