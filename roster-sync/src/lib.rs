//! # roster-sync
//!
//! Identity resolution, platform grants, and the per-record reconciliation
//! state machine.
//!
//! Call [`pipeline::run`] to execute a full batch against PostgreSQL and the
//! platform REST API, or [`pipeline::run_with`] to drive the same pipeline
//! through injected [`IdentityStore`] and [`GroupPlatform`] implementations.

pub mod error;
pub mod grant;
pub mod orchestrator;
pub mod pipeline;
pub mod platform;
pub mod preflight;
pub mod store;

pub use error::{PlatformError, StoreError, SyncError};
pub use grant::{GrantOutcome, GrantTarget, GroupSynchronizer};
pub use orchestrator::{InvalidTransition, Orchestrator, OrchestratorSettings, RecordState, Step};
pub use pipeline::RunOptions;
pub use platform::{DiscordClient, GroupInfo, GroupMember, GroupPlatform};
pub use store::{IdentityStore, PgIdentityStore};
