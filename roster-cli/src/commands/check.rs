//! `roster check` — configuration and live connectivity, nothing written.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use roster_sync::pipeline;
use roster_sync::preflight::{CHECK_PLATFORM, CHECK_STORE};
use roster_sync::SyncError;

use super::{runtime, CommonArgs};

/// Arguments for `roster check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl CheckArgs {
    pub fn run(self) -> Result<()> {
        let config = self.common.prepare()?;
        pass("configuration", "all required variables set");

        match runtime()?.block_on(pipeline::check(&config)) {
            Ok(group) => {
                pass(CHECK_STORE, &config.db.target());
                pass(CHECK_PLATFORM, &format!("{} ({})", group.name, group.id));
                Ok(())
            }
            Err(SyncError::Preflight { check, reason }) => {
                if check == CHECK_PLATFORM {
                    pass(CHECK_STORE, &config.db.target());
                }
                fail(check, &reason);
                bail!("check '{check}' failed");
            }
            Err(err) => {
                let check = match err {
                    SyncError::Platform(_) => CHECK_PLATFORM,
                    _ => CHECK_STORE,
                };
                fail(check, &err.to_string());
                Err(err.into())
            }
        }
    }
}

fn pass(check: &str, detail: &str) {
    println!("{} {check}: {detail}", "✓".green().bold());
}

fn fail(check: &str, detail: &str) {
    println!("{} {check}: {detail}", "✗".red().bold());
}
