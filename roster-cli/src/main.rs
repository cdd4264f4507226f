//! Roster: grant a platform role to every accepted participant on a roster.
//!
//! # Usage
//!
//! ```text
//! roster [ROSTER.csv] [--dry-run] [--json] [--env-file <path>] [-v]
//! roster check [--env-file <path>]
//! roster members [--json] [--env-file <path>]
//! ```
//!
//! Configuration comes from the environment (optionally a `.env` file). Logs
//! go to stderr; stdout carries only the report.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{assign::AssignArgs, check::CheckArgs, members::MembersArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Reconcile an accepted-participant roster with platform role membership",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    assign: AssignArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Grant the role to every roster record with a linked account (the default).
    Assign(AssignArgs),

    /// Validate configuration and check store and platform connectivity.
    Check(CheckArgs),

    /// List group members that already hold the role.
    Members(MembersArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Assign(args)) => args.run(),
        Some(Commands::Check(args)) => args.run(),
        Some(Commands::Members(args)) => args.run(),
        None => cli.assign.run(),
    }
}
