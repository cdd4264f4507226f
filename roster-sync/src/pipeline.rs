//! Batch entrypoints used by the CLI.
//!
//! - [`run_with`]: full batch over injected store and platform; used in tests
//! - [`run`]: connects PostgreSQL and the Discord client, delegates to `run_with`
//! - [`check`]: configuration plus both live preflight checks
//! - [`members`]: accounts in the target group that already hold the role

use std::path::PathBuf;

use roster_core::{BatchReport, Config, HeaderMap, IngestError, RosterReader};

use crate::error::SyncError;
use crate::grant::{GrantTarget, GroupSynchronizer};
use crate::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::platform::{DiscordClient, GroupInfo, GroupMember, GroupPlatform};
use crate::preflight;
use crate::store::{IdentityStore, PgIdentityStore};

/// Default roster file, relative to the working directory.
pub const DEFAULT_ROSTER_PATH: &str = "for MC Tool.csv";

/// Per-run options that do not come from the environment.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub roster_path: PathBuf,
    pub dry_run: bool,
    pub headers: HeaderMap,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            roster_path: PathBuf::from(DEFAULT_ROSTER_PATH),
            dry_run: false,
            headers: HeaderMap::default(),
        }
    }
}

/// Ingest, preflight, then reconcile every record.
///
/// A missing roster aborts before any store or platform call.
pub async fn run_with(
    store: &dyn IdentityStore,
    platform: &dyn GroupPlatform,
    config: &Config,
    options: &RunOptions,
) -> Result<BatchReport, SyncError> {
    let mut reader = RosterReader::from_path(&options.roster_path, options.headers.clone())?;

    preflight::check(store, platform, &config.platform.guild_id).await?;

    let records = reader.by_ref().collect::<Result<Vec<_>, IngestError>>()?;
    tracing::info!(
        source = %options.roster_path.display(),
        accepted = reader.accepted(),
        skipped = reader.skipped(),
        "roster processed",
    );

    let synchronizer = GroupSynchronizer::new(platform, GrantTarget::from_config(config));
    let settings = OrchestratorSettings {
        provider_id: config.provider_id.clone(),
        spacing: config.grant_spacing,
        dry_run: options.dry_run,
    };
    Orchestrator::new(store, synchronizer, settings)
        .run(records)
        .await
}

/// Full batch against PostgreSQL and the Discord API.
///
/// The pool is closed on every exit path once it has been opened.
pub async fn run(config: &Config, options: &RunOptions) -> Result<BatchReport, SyncError> {
    if !options.roster_path.exists() {
        return Err(IngestError::NotFound {
            path: options.roster_path.clone(),
        }
        .into());
    }

    let platform = DiscordClient::new(&config.platform)?;
    let store = PgIdentityStore::connect(&config.db).await?;
    tracing::debug!(target_db = %config.db.target(), "identity store pool open");

    let result = run_with(&store, &platform, config, options).await;
    store.close().await;
    tracing::debug!("identity store pool closed");
    result
}

/// Configuration plus both live checks; nothing is written.
pub async fn check(config: &Config) -> Result<GroupInfo, SyncError> {
    let platform = DiscordClient::new(&config.platform)?;
    let store = PgIdentityStore::connect(&config.db).await?;
    let result = preflight::check(&store, &platform, &config.platform.guild_id).await;
    store.close().await;
    result
}

/// Members of the target group that already hold the target role.
pub async fn members(config: &Config) -> Result<Vec<GroupMember>, SyncError> {
    let platform = DiscordClient::new(&config.platform)?;
    members_with(&platform, &config.platform.guild_id, &config.platform.role_id).await
}

/// [`members`] over an injected platform.
pub async fn members_with(
    platform: &dyn GroupPlatform,
    group_id: &str,
    role_id: &str,
) -> Result<Vec<GroupMember>, SyncError> {
    let all = platform.list_members(group_id).await?;
    let scanned = all.len();
    let holders: Vec<_> = all.into_iter().filter(|m| m.has_role(role_id)).collect();
    tracing::info!(scanned, holders = holders.len(), role_id, "member listing complete");
    Ok(holders)
}
