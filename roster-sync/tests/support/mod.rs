//! In-memory store and platform that record every call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use roster_core::{
    AccountId, Config, ExternalAccountLink, InternalId, InternalIdentity, Lookup, RosterRecord,
};
use roster_sync::{GroupInfo, GroupMember, GroupPlatform, IdentityStore, PlatformError, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Ping,
    FindIdentity(String),
    FindAccount(String),
    GroupInfo(String),
    Grant(String),
    ListMembers(String),
}

pub type CallLog = Mutex<Vec<(Call, Instant)>>;

fn log(calls: &CallLog, call: Call) {
    calls
        .lock()
        .expect("call log poisoned")
        .push((call, Instant::now()));
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    identities: HashMap<(String, String), InternalId>,
    links: HashMap<String, AccountId>,
    erroring_names: HashSet<String>,
    erroring_links: HashSet<String>,
    ping_fails: bool,
    pub calls: CallLog,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `first last` as an identity with `internal_id`.
    pub fn with_identity(mut self, first: &str, last: &str, internal_id: &str) -> Self {
        self.identities.insert(
            (first.to_string(), last.to_string()),
            InternalId::from(internal_id),
        );
        self
    }

    pub fn with_link(mut self, internal_id: &str, account_id: &str) -> Self {
        self.links
            .insert(internal_id.to_string(), AccountId::from(account_id));
        self
    }

    /// Identity lookups for `first` fail with a query error.
    pub fn with_erroring_name(mut self, first: &str) -> Self {
        self.erroring_names.insert(first.to_string());
        self
    }

    /// Account lookups for `internal_id` fail with a query error.
    pub fn with_erroring_link(mut self, internal_id: &str) -> Self {
        self.erroring_links.insert(internal_id.to_string());
        self
    }

    pub fn with_failing_ping(mut self) -> Self {
        self.ping_fails = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }
}

fn query_error(query: &'static str) -> StoreError {
    StoreError::Query {
        query,
        source: sqlx::Error::PoolTimedOut,
    }
}

#[async_trait]
impl IdentityStore for FakeStore {
    async fn ping(&self) -> Result<(), StoreError> {
        log(&self.calls, Call::Ping);
        if self.ping_fails {
            return Err(query_error("ping"));
        }
        Ok(())
    }

    async fn find_identity_by_name(
        &self,
        first_name: &str,
        last_name: &str,
        _prefix: Option<&str>,
    ) -> Result<Lookup<InternalIdentity>, StoreError> {
        log(
            &self.calls,
            Call::FindIdentity(format!("{first_name} {last_name}")),
        );
        if self.erroring_names.contains(first_name) {
            return Err(query_error("find_identity_by_name"));
        }
        let found = self
            .identities
            .get(&(first_name.to_string(), last_name.to_string()))
            .map(|id| InternalIdentity {
                internal_id: id.clone(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                prefix: None,
            });
        Ok(Lookup::from(found))
    }

    async fn find_linked_account(
        &self,
        internal_id: &InternalId,
        provider_id: &str,
    ) -> Result<Lookup<ExternalAccountLink>, StoreError> {
        log(&self.calls, Call::FindAccount(internal_id.0.clone()));
        if self.erroring_links.contains(&internal_id.0) {
            return Err(query_error("find_linked_account"));
        }
        let found = self
            .links
            .get(&internal_id.0)
            .map(|account| ExternalAccountLink {
                external_account_id: account.clone(),
                internal_id: internal_id.clone(),
                provider_id: provider_id.to_string(),
            });
        Ok(Lookup::from(found))
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePlatform {
    rejected_accounts: HashSet<String>,
    unreachable_accounts: HashSet<String>,
    group_fails: bool,
    members: Vec<GroupMember>,
    pub calls: CallLog,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants to `account_id` are answered with HTTP 403.
    pub fn rejecting(mut self, account_id: &str) -> Self {
        self.rejected_accounts.insert(account_id.to_string());
        self
    }

    /// Grants to `account_id` never get a response.
    pub fn unreachable(mut self, account_id: &str) -> Self {
        self.unreachable_accounts.insert(account_id.to_string());
        self
    }

    pub fn with_failing_group(mut self) -> Self {
        self.group_fails = true;
        self
    }

    pub fn with_members(mut self, members: Vec<GroupMember>) -> Self {
        self.members = members;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    /// Accounts granted to, in call order.
    pub fn grants(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Grant(account) => Some(account),
                _ => None,
            })
            .collect()
    }

    pub fn grant_instants(&self) -> Vec<Instant> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .iter()
            .filter(|(call, _)| matches!(call, Call::Grant(_)))
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl GroupPlatform for FakePlatform {
    async fn group_info(&self, group_id: &str) -> Result<GroupInfo, PlatformError> {
        log(&self.calls, Call::GroupInfo(group_id.to_string()));
        if self.group_fails {
            return Err(PlatformError::Status {
                route: format!("/guilds/{group_id}"),
                status: 401,
                body: "401: Unauthorized".to_string(),
            });
        }
        Ok(GroupInfo {
            id: group_id.to_string(),
            name: "Camp".to_string(),
        })
    }

    async fn put_member_grant(
        &self,
        group_id: &str,
        account_id: &AccountId,
        role_id: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        log(&self.calls, Call::Grant(account_id.0.clone()));
        if self.unreachable_accounts.contains(&account_id.0) {
            return Err(PlatformError::Transport {
                route: format!("/guilds/{group_id}/members/{account_id}/roles/{role_id}"),
                message: "connection refused".to_string(),
            });
        }
        if self.rejected_accounts.contains(&account_id.0) {
            return Err(PlatformError::Status {
                route: format!("/guilds/{group_id}/members/{account_id}/roles/{role_id}"),
                status: 403,
                body: "Missing Permissions".to_string(),
            });
        }
        Ok(())
    }

    async fn list_members(&self, group_id: &str) -> Result<Vec<GroupMember>, PlatformError> {
        log(&self.calls, Call::ListMembers(group_id.to_string()));
        Ok(self.members.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn record(row: usize, first: &str, last: &str) -> RosterRecord {
    RosterRecord {
        row,
        full_name: format!("{first} {last}"),
        prefix: String::new(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        nickname: String::new(),
        status: String::new(),
    }
}

pub fn config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DISCORD_BOT_TOKEN", "t0ken"),
        ("DISCORD_GUILD_ID", "111"),
        ("DISCORD_ROLE_ID", "222"),
        ("DB_USER", "camp"),
        ("DB_HOST", "localhost"),
        ("DB_NAME", "camp"),
        ("DB_PASSWORD", "pw"),
    ]);
    Config::from_vars(|key| vars.get(key).map(|v| v.to_string())).expect("config")
}
