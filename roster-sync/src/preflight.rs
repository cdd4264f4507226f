//! Live checks run once, before any record is processed.

use crate::error::SyncError;
use crate::platform::{GroupInfo, GroupPlatform};
use crate::store::IdentityStore;

pub const CHECK_STORE: &str = "identity store";
pub const CHECK_PLATFORM: &str = "platform group";

/// Store round trip, then a read of the target group.
///
/// The first failure is returned as [`SyncError::Preflight`]; the platform is
/// not contacted when the store check fails.
pub async fn check(
    store: &dyn IdentityStore,
    platform: &dyn GroupPlatform,
    group_id: &str,
) -> Result<GroupInfo, SyncError> {
    store.ping().await.map_err(|err| SyncError::Preflight {
        check: CHECK_STORE,
        reason: err.to_string(),
    })?;
    tracing::info!("identity store reachable");

    let group = platform
        .group_info(group_id)
        .await
        .map_err(|err| SyncError::Preflight {
            check: CHECK_PLATFORM,
            reason: err.to_string(),
        })?;
    tracing::info!(group_id = %group.id, group = %group.name, "platform group reachable");

    Ok(group)
}
