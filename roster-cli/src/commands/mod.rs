pub mod assign;
pub mod check;
pub mod members;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tokio::runtime::Runtime;

use roster_core::Config;

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Load environment variables from this file instead of `./.env`.
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl CommonArgs {
    /// Load the env file, install logging, and read the configuration.
    ///
    /// Variables already set in the process environment win over the file.
    pub fn prepare(&self) -> Result<Config> {
        match &self.env_file {
            Some(path) => {
                dotenvy::from_path(path)
                    .with_context(|| format!("failed to load env file {}", path.display()))?;
            }
            None => {
                let _ = dotenvy::dotenv();
            }
        }
        self.init_tracing();
        if let Some(path) = &self.env_file {
            tracing::debug!(env_file = %path.display(), "environment file loaded");
        }
        Config::from_env().context("configuration is incomplete")
    }

    fn init_tracing(&self) {
        use tracing_subscriber::{fmt, EnvFilter};

        let default = if self.verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
        let builder = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = if self.log_json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
    }
}

pub fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
