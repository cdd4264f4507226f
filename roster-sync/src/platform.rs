//! External-platform contract and the Discord REST client.
//!
//! [`DiscordClient`] uses a blocking `ureq` agent; every request runs on the
//! blocking pool via `tokio::task::spawn_blocking` so the orchestrating task
//! is never stalled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use roster_core::{AccountId, PlatformConfig, Secret};

use crate::error::PlatformError;

/// Page size for the member listing (the API maximum).
pub const MEMBER_PAGE_LIMIT: usize = 1000;

const AUDIT_LOG_HEADER: &str = "X-Audit-Log-Reason";

/// The target group, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
}

/// One member of the target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub account_id: AccountId,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    pub roles: Vec<String>,
}

impl GroupMember {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }
}

/// Operations the pipeline needs from the external platform.
#[async_trait]
pub trait GroupPlatform: Send + Sync {
    /// Read the group; doubles as a connectivity and authorization probe.
    async fn group_info(&self, group_id: &str) -> Result<GroupInfo, PlatformError>;

    /// Grant `role_id` to `account_id` in `group_id`. One request, no retry.
    async fn put_member_grant(
        &self,
        group_id: &str,
        account_id: &AccountId,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Every member of `group_id`, following pagination to the end.
    async fn list_members(&self, group_id: &str) -> Result<Vec<GroupMember>, PlatformError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WireGuild {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMember {
    user: WireUser,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl From<WireMember> for GroupMember {
    fn from(wire: WireMember) -> Self {
        Self {
            account_id: AccountId(wire.user.id),
            username: wire.user.username,
            display_name: wire.user.global_name,
            nick: wire.nick,
            roles: wire.roles,
        }
    }
}

// ---------------------------------------------------------------------------
// Discord client
// ---------------------------------------------------------------------------

/// Bot-authenticated client for the Discord REST API.
#[derive(Clone)]
pub struct DiscordClient {
    agent: ureq::Agent,
    api_base: String,
    token: Secret,
}

impl DiscordClient {
    pub fn new(cfg: &PlatformConfig) -> Result<Self, PlatformError> {
        if !cfg.api_base.starts_with("http://") && !cfg.api_base.starts_with("https://") {
            return Err(PlatformError::Config(format!(
                "API base must be an http(s) URL, got '{}'",
                cfg.api_base
            )));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout(cfg.timeout)
            .user_agent(concat!("roster-sync/", env!("CARGO_PKG_VERSION")))
            .build();
        Ok(Self {
            agent,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.api_base, route)
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token.expose())
    }

    fn get_guild_blocking(&self, group_id: &str) -> Result<GroupInfo, PlatformError> {
        let route = format!("/guilds/{}", urlencoding::encode(group_id));
        let response = self
            .agent
            .get(&self.url(&route))
            .set("Authorization", &self.auth())
            .call()
            .map_err(|e| map_ureq_error(&route, e))?;
        let guild: WireGuild = response.into_json().map_err(|source| PlatformError::Decode {
            route: route.clone(),
            source,
        })?;
        Ok(GroupInfo {
            id: guild.id,
            name: guild.name,
        })
    }

    fn put_grant_blocking(
        &self,
        group_id: &str,
        account_id: &AccountId,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let route = format!(
            "/guilds/{}/members/{}/roles/{}",
            urlencoding::encode(group_id),
            urlencoding::encode(&account_id.0),
            urlencoding::encode(role_id),
        );
        self.agent
            .put(&self.url(&route))
            .set("Authorization", &self.auth())
            .set(AUDIT_LOG_HEADER, &urlencoding::encode(reason))
            .call()
            .map_err(|e| map_ureq_error(&route, e))?;
        Ok(())
    }

    fn list_members_blocking(&self, group_id: &str) -> Result<Vec<GroupMember>, PlatformError> {
        let route = format!("/guilds/{}/members", urlencoding::encode(group_id));
        let limit = MEMBER_PAGE_LIMIT.to_string();
        let mut members = Vec::new();
        let mut after = String::from("0");

        loop {
            let response = self
                .agent
                .get(&self.url(&route))
                .set("Authorization", &self.auth())
                .query("limit", &limit)
                .query("after", &after)
                .call()
                .map_err(|e| map_ureq_error(&route, e))?;
            let page: Vec<WireMember> =
                response.into_json().map_err(|source| PlatformError::Decode {
                    route: route.clone(),
                    source,
                })?;

            let page_len = page.len();
            let Some(last) = page.last() else { break };
            after = last.user.id.clone();
            members.extend(page.into_iter().map(GroupMember::from));
            tracing::debug!(fetched = members.len(), "member page received");

            if page_len < MEMBER_PAGE_LIMIT {
                break;
            }
        }
        Ok(members)
    }
}

#[async_trait]
impl GroupPlatform for DiscordClient {
    async fn group_info(&self, group_id: &str) -> Result<GroupInfo, PlatformError> {
        let client = self.clone();
        let group_id = group_id.to_string();
        tokio::task::spawn_blocking(move || client.get_guild_blocking(&group_id))
            .await
            .map_err(|err| PlatformError::Join(err.to_string()))?
    }

    async fn put_member_grant(
        &self,
        group_id: &str,
        account_id: &AccountId,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError> {
        let client = self.clone();
        let (group_id, account_id, role_id, reason) = (
            group_id.to_string(),
            account_id.clone(),
            role_id.to_string(),
            reason.to_string(),
        );
        tokio::task::spawn_blocking(move || {
            client.put_grant_blocking(&group_id, &account_id, &role_id, &reason)
        })
        .await
        .map_err(|err| PlatformError::Join(err.to_string()))?
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<GroupMember>, PlatformError> {
        let client = self.clone();
        let group_id = group_id.to_string();
        tokio::task::spawn_blocking(move || client.list_members_blocking(&group_id))
            .await
            .map_err(|err| PlatformError::Join(err.to_string()))?
    }
}

fn map_ureq_error(route: &str, err: ureq::Error) -> PlatformError {
    match err {
        ureq::Error::Status(status, response) => PlatformError::Status {
            route: route.to_string(),
            status,
            body: response
                .into_string()
                .map(|body| body.trim().to_string())
                .unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => PlatformError::Transport {
            route: route.to_string(),
            message: transport.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
