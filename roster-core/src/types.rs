//! Domain types for roster reconciliation.
//!
//! Identity and account types are read-only views of rows owned by the
//! identity store. Records and outcomes are owned by a single run.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of an identity in the internal identity store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalId(pub String);

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for InternalId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InternalId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of an account on the external platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AccountId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Roster and store rows
// ---------------------------------------------------------------------------

/// One accepted row of the roster source. All fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    /// 1-based data row in the source (header excluded).
    pub row: usize,
    pub full_name: String,
    pub prefix: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub status: String,
}

impl RosterRecord {
    /// `"<first> <last>"`, the name used in logs and the failure list.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The prefix as an optional filter value.
    pub fn prefix_filter(&self) -> Option<&str> {
        if self.prefix.is_empty() {
            None
        } else {
            Some(&self.prefix)
        }
    }
}

/// An identity row matched by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalIdentity {
    pub internal_id: InternalId,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// An external-platform account linked to an internal identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccountLink {
    pub external_account_id: AccountId,
    pub internal_id: InternalId,
    pub provider_id: String,
}

/// Result of a zero-or-one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

pub const REASON_UNRESOLVED: &str = "not found in identity store";
pub const REASON_NOT_LINKED: &str = "no linked external account";
pub const REASON_GRANT_FAILED: &str = "grant call failed";

/// Terminal classification of one record's processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Unresolved,
    AccountNotLinked,
    SyncFailed,
    SyncSucceeded,
    /// Dry run: the record was linked and a grant would have been issued.
    WouldGrant,
}

impl Stage {
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Stage::Unresolved | Stage::AccountNotLinked | Stage::SyncFailed
        )
    }

    /// The record got past identity resolution.
    pub fn resolved_in_store(self) -> bool {
        !matches!(self, Stage::Unresolved)
    }

    /// The record got past account resolution.
    pub fn linked_account(self) -> bool {
        matches!(
            self,
            Stage::SyncFailed | Stage::SyncSucceeded | Stage::WouldGrant
        )
    }

    /// Fixed reason vocabulary for failure stages.
    pub fn reason(self) -> Option<&'static str> {
        match self {
            Stage::Unresolved => Some(REASON_UNRESOLVED),
            Stage::AccountNotLinked => Some(REASON_NOT_LINKED),
            Stage::SyncFailed => Some(REASON_GRANT_FAILED),
            Stage::SyncSucceeded | Stage::WouldGrant => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Unresolved => write!(f, "UNRESOLVED"),
            Stage::AccountNotLinked => write!(f, "ACCOUNT_NOT_LINKED"),
            Stage::SyncFailed => write!(f, "SYNC_FAILED"),
            Stage::SyncSucceeded => write!(f, "SYNC_SUCCEEDED"),
            Stage::WouldGrant => write!(f, "WOULD_GRANT"),
        }
    }
}

/// The outcome of processing one roster record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub record: RosterRecord,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Underlying error message, when one exists (e.g. the grant call's response).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl OutcomeRecord {
    pub fn new(record: RosterRecord, stage: Stage) -> Self {
        Self {
            record,
            stage,
            reason: stage.reason().map(str::to_owned),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
