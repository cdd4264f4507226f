//! Environment-backed configuration.
//!
//! # API pattern
//!
//! - [`Config::from_vars`]: explicit lookup function; used in tests
//! - [`Config::from_env`]: reads the process environment, delegates to `from_vars`
//!
//! Validation reports every missing required key in a single
//! [`ConfigError::Missing`], never just the first one.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DISCORD_BOT_TOKEN: &str = "DISCORD_BOT_TOKEN";
pub const DISCORD_GUILD_ID: &str = "DISCORD_GUILD_ID";
pub const DISCORD_ROLE_ID: &str = "DISCORD_ROLE_ID";
pub const DB_USER: &str = "DB_USER";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_PORT: &str = "DB_PORT";
pub const DISCORD_API_BASE: &str = "DISCORD_API_BASE";
pub const PROVIDER_ID: &str = "PROVIDER_ID";
pub const GRANT_REASON: &str = "GRANT_REASON";
pub const GRANT_SPACING_MS: &str = "GRANT_SPACING_MS";
pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

/// Keys that must be present and non-empty, in reporting order.
pub const REQUIRED_KEYS: [&str; 7] = [
    DISCORD_BOT_TOKEN,
    DISCORD_GUILD_ID,
    DISCORD_ROLE_ID,
    DB_USER,
    DB_HOST,
    DB_NAME,
    DB_PASSWORD,
];

pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_PROVIDER_ID: &str = "discord";
pub const DEFAULT_GRANT_REASON: &str = "Accepted camper - onsite round";
pub const DEFAULT_GRANT_SPACING: Duration = Duration::from_millis(100);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A credential that never appears in `Debug` or `Display` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Identity-store connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub user: String,
    pub host: String,
    pub name: String,
    pub password: Secret,
    pub port: u16,
}

impl DbConfig {
    /// `host:port/database`, safe to log.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.name)
    }
}

/// External-platform credentials and grant target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub token: Secret,
    pub guild_id: String,
    pub role_id: String,
    pub api_base: String,
    pub timeout: Duration,
}

/// Full configuration surface of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db: DbConfig,
    pub platform: PlatformConfig,
    /// Provider id that marks a linked account as belonging to the platform.
    pub provider_id: String,
    /// Audit-log reason attached to every grant call.
    pub grant_reason: String,
    /// Minimum delay after a grant call before the next record starts.
    pub grant_spacing: Duration,
}

impl Config {
    /// Build a config from an explicit variable lookup.
    ///
    /// Empty or whitespace-only values count as missing.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing { keys: missing });
        }

        let required = |key: &'static str| get(key).unwrap_or_default();

        let port = parse_or(get(DB_PORT), DB_PORT, DEFAULT_DB_PORT)?;
        let spacing_ms = parse_or(
            get(GRANT_SPACING_MS),
            GRANT_SPACING_MS,
            DEFAULT_GRANT_SPACING.as_millis() as u64,
        )?;
        let timeout_secs = parse_or(
            get(HTTP_TIMEOUT_SECS),
            HTTP_TIMEOUT_SECS,
            DEFAULT_HTTP_TIMEOUT.as_secs(),
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: HTTP_TIMEOUT_SECS,
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        Ok(Self {
            db: DbConfig {
                user: required(DB_USER),
                host: required(DB_HOST),
                name: required(DB_NAME),
                password: Secret::new(required(DB_PASSWORD)),
                port,
            },
            platform: PlatformConfig {
                token: Secret::new(required(DISCORD_BOT_TOKEN)),
                guild_id: required(DISCORD_GUILD_ID),
                role_id: required(DISCORD_ROLE_ID),
                api_base: get(DISCORD_API_BASE)
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                timeout: Duration::from_secs(timeout_secs),
            },
            provider_id: get(PROVIDER_ID).unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string()),
            grant_reason: get(GRANT_REASON).unwrap_or_else(|| DEFAULT_GRANT_REASON.to_string()),
            grant_spacing: Duration::from_millis(spacing_ms),
        })
    }

    /// `from_vars` over the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Label/value pairs for the run banner. Credentials are never included.
    pub fn banner(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Database", self.db.target()),
            ("Bot token", "loaded".to_string()),
            ("Guild ID", self.platform.guild_id.clone()),
            ("Role ID", self.platform.role_id.clone()),
            ("Provider", self.provider_id.clone()),
        ]
    }
}

fn parse_or<T>(raw: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
