//! Roster core library: domain types, configuration, roster ingestion, reporting.
//!
//! - [`types`]: records, identities, account links, outcome stages
//! - [`config`]: environment-backed configuration with all-keys validation
//! - [`ingest`]: lazy CSV roster reader
//! - [`report`]: outcome aggregation and the rendered batch summary
//! - [`error`]: [`ConfigError`], [`IngestError`]

pub mod config;
pub mod error;
pub mod ingest;
pub mod report;
pub mod types;

pub use config::{Config, DbConfig, PlatformConfig, Secret};
pub use error::{ConfigError, IngestError};
pub use ingest::{read_roster, HeaderMap, RosterField, RosterReader};
pub use report::{Aggregator, BatchReport, Counters};
pub use types::{
    AccountId, ExternalAccountLink, InternalId, InternalIdentity, Lookup, OutcomeRecord,
    RosterRecord, Stage,
};
