//! `roster [assign]` — reconcile the roster and grant the role.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use roster_core::{BatchReport, Config, HeaderMap};
use roster_sync::pipeline::{self, RunOptions, DEFAULT_ROSTER_PATH};

use super::{runtime, CommonArgs};

/// Arguments for `roster assign`.
#[derive(Args, Debug, Clone)]
pub struct AssignArgs {
    /// Roster CSV to process.
    #[arg(value_name = "ROSTER", default_value = DEFAULT_ROSTER_PATH)]
    pub roster: PathBuf,

    /// Resolve every record but issue no grants.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON instead of the text summary.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl AssignArgs {
    pub fn run(self) -> Result<()> {
        let config = self.common.prepare()?;
        print_banner(&config, &self);

        let options = RunOptions {
            roster_path: self.roster.clone(),
            dry_run: self.dry_run,
            headers: HeaderMap::default(),
        };
        let report = runtime()?
            .block_on(pipeline::run(&config, &options))
            .with_context(|| format!("roster run failed for {}", self.roster.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
        } else {
            print!("{}", report.render());
        }
        print_status(&report);
        Ok(())
    }
}

fn print_banner(config: &Config, args: &AssignArgs) {
    let rule = "=".repeat(60);
    eprintln!("{rule}");
    eprintln!("{:<14}{}", "CSV file:", args.roster.display());
    for (label, value) in config.banner() {
        eprintln!("{:<14}{value}", format!("{label}:"));
    }
    if args.dry_run {
        eprintln!("{}", "Dry run: no roles will be granted".yellow());
    }
    eprintln!("{rule}");
}

fn print_status(report: &BatchReport) {
    let c = &report.counters;
    let line = if report.dry_run {
        format!("{} would be granted, {} failed", c.would_grant, c.failed)
    } else {
        format!("{} granted, {} failed", c.granted, c.failed)
    };
    if c.failed == 0 {
        eprintln!("{} {line}", "✓".green().bold());
    } else {
        eprintln!("{} {line}", "!".yellow().bold());
    }
}
