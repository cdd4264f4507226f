//! Role grants for linked accounts.

use roster_core::{AccountId, Config};

use crate::platform::GroupPlatform;

/// Where grants go and the audit reason they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTarget {
    pub group_id: String,
    pub role_id: String,
    pub reason: String,
}

impl GrantTarget {
    pub fn from_config(config: &Config) -> Self {
        Self {
            group_id: config.platform.guild_id.clone(),
            role_id: config.platform.role_id.clone(),
            reason: config.grant_reason.clone(),
        }
    }
}

/// Result of one grant attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    Failed { message: String },
}

impl GrantOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GrantOutcome::Granted)
    }
}

/// Issues grants against a [`GroupPlatform`].
pub struct GroupSynchronizer<'a> {
    platform: &'a dyn GroupPlatform,
    target: GrantTarget,
}

impl<'a> GroupSynchronizer<'a> {
    pub fn new(platform: &'a dyn GroupPlatform, target: GrantTarget) -> Self {
        Self { platform, target }
    }

    pub fn target(&self) -> &GrantTarget {
        &self.target
    }

    /// Exactly one grant call. Platform errors become [`GrantOutcome::Failed`].
    pub async fn grant(&self, account_id: &AccountId) -> GrantOutcome {
        let result = self
            .platform
            .put_member_grant(
                &self.target.group_id,
                account_id,
                &self.target.role_id,
                &self.target.reason,
            )
            .await;

        match result {
            Ok(()) => {
                tracing::debug!(account_id = %account_id, role_id = %self.target.role_id, "role granted");
                GrantOutcome::Granted
            }
            Err(err) => {
                tracing::error!(account_id = %account_id, error = %err, "role grant failed");
                GrantOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}
