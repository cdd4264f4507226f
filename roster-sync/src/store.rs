//! Identity-store query contract and its PostgreSQL implementation.
//!
//! The pipeline only reads two tables:
//!
//! ```text
//! onsite_personal_data (user_id, first_name, sur_name, prefix)
//! account              (account_id, user_id, provider_id)
//! ```
//!
//! Both lookups are zero-or-one. Duplicate matches are resolved by ordering on
//! the id column in its native type, and logged as ambiguous. Ids are returned
//! as text so uuid, integer, and text schemas all decode.
//!
//! The account lookup compares `user_id::text`; an expression index on
//! `account ((user_id::text), provider_id)` serves it.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use roster_core::{
    AccountId, DbConfig, ExternalAccountLink, InternalId, InternalIdentity, Lookup,
};

use crate::error::StoreError;

const PING_SQL: &str = "SELECT NOW()";

const FIND_IDENTITY_SQL: &str = "\
    SELECT user_id::text AS user_id, first_name, sur_name, prefix \
    FROM onsite_personal_data \
    WHERE first_name = $1 AND sur_name = $2 \
    ORDER BY onsite_personal_data.user_id \
    LIMIT 2";

const FIND_ACCOUNT_SQL: &str = "\
    SELECT account_id::text AS account_id, user_id::text AS user_id, provider_id \
    FROM account \
    WHERE account.user_id::text = $1 AND account.provider_id = $2 \
    ORDER BY account.account_id \
    LIMIT 2";

const MAX_CONNECTIONS: u32 = 2;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only queries the pipeline needs from the identity store.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Trivial round trip used as a connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Exact match on `(first_name, last_name)`.
    ///
    /// `prefix` is accepted but not applied to the match.
    async fn find_identity_by_name(
        &self,
        first_name: &str,
        last_name: &str,
        prefix: Option<&str>,
    ) -> Result<Lookup<InternalIdentity>, StoreError>;

    /// The account linked to `internal_id` for `provider_id`.
    async fn find_linked_account(
        &self,
        internal_id: &InternalId,
        provider_id: &str,
    ) -> Result<Lookup<ExternalAccountLink>, StoreError>;
}

/// [`IdentityStore`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Open a small pool and establish its first connection.
    pub async fn connect(cfg: &DbConfig) -> Result<Self, StoreError> {
        let options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(cfg.password.expose())
            .database(&cfg.name);

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|source| StoreError::Connect {
                target: cfg.target(),
                source,
            })?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every pooled connection. Waits for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query(PING_SQL)
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                query: "ping",
                source,
            })?;
        Ok(())
    }

    async fn find_identity_by_name(
        &self,
        first_name: &str,
        last_name: &str,
        prefix: Option<&str>,
    ) -> Result<Lookup<InternalIdentity>, StoreError> {
        if let Some(prefix) = prefix {
            tracing::trace!(prefix, "prefix accepted but not applied to identity match");
        }

        let rows = sqlx::query(FIND_IDENTITY_SQL)
            .bind(first_name)
            .bind(last_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                query: "find_identity_by_name",
                source,
            })?;

        if rows.len() > 1 {
            tracing::warn!(
                first_name,
                last_name,
                "ambiguous identity match; taking the lowest user_id",
            );
        }
        rows.first()
            .map(identity_from_row)
            .transpose()
            .map(Lookup::from)
    }

    async fn find_linked_account(
        &self,
        internal_id: &InternalId,
        provider_id: &str,
    ) -> Result<Lookup<ExternalAccountLink>, StoreError> {
        let rows = sqlx::query(FIND_ACCOUNT_SQL)
            .bind(&internal_id.0)
            .bind(provider_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                query: "find_linked_account",
                source,
            })?;

        if rows.len() > 1 {
            tracing::warn!(
                internal_id = %internal_id,
                provider_id,
                "multiple linked accounts; taking the lowest account_id",
            );
        }
        rows.first()
            .map(link_from_row)
            .transpose()
            .map(Lookup::from)
    }
}

fn identity_from_row(row: &PgRow) -> Result<InternalIdentity, StoreError> {
    let decode = |source| StoreError::Query {
        query: "find_identity_by_name",
        source,
    };
    Ok(InternalIdentity {
        internal_id: InternalId(row.try_get("user_id").map_err(decode)?),
        first_name: row
            .try_get::<Option<String>, _>("first_name")
            .map_err(decode)?
            .unwrap_or_default(),
        last_name: row
            .try_get::<Option<String>, _>("sur_name")
            .map_err(decode)?
            .unwrap_or_default(),
        prefix: row.try_get("prefix").map_err(decode)?,
    })
}

fn link_from_row(row: &PgRow) -> Result<ExternalAccountLink, StoreError> {
    let decode = |source| StoreError::Query {
        query: "find_linked_account",
        source,
    };
    Ok(ExternalAccountLink {
        external_account_id: AccountId(row.try_get("account_id").map_err(decode)?),
        internal_id: InternalId(row.try_get("user_id").map_err(decode)?),
        provider_id: row.try_get("provider_id").map_err(decode)?,
    })
}

// ---------------------------------------------------------------------------
// Tests (require a live PostgreSQL; run with `--ignored`)
// ---------------------------------------------------------------------------
