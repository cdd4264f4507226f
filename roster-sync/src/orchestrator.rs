//! Per-record reconciliation state machine and the sequential batch driver.
//!
//! ```text
//! Start ──identity found──▶ Resolved ──account found──▶ Linked ──grant ok──▶ Done(SYNC_SUCCEEDED)
//!   │                          │                          ├──grant failed──▶ Done(SYNC_FAILED)
//!   │                          │                          └──dry run───────▶ Done(WOULD_GRANT)
//!   └──not found──▶ Done(UNRESOLVED)
//!                              └──not linked──▶ Done(ACCOUNT_NOT_LINKED)
//! ```
//!
//! [`RecordState::advance`] is pure. [`Orchestrator`] performs the I/O for each
//! step, applies the fail-open policy for store errors, and enforces grant
//! spacing.

use std::time::Duration;

use thiserror::Error;

use roster_core::{
    Aggregator, BatchReport, ExternalAccountLink, InternalIdentity, Lookup, OutcomeRecord,
    RosterRecord, Stage,
};

use crate::error::{StoreError, SyncError};
use crate::grant::{GrantOutcome, GroupSynchronizer};
use crate::store::IdentityStore;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// The result of one processing step, fed into [`RecordState::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Identity(Lookup<InternalIdentity>),
    Account(Lookup<ExternalAccountLink>),
    Grant(GrantOutcome),
    /// Dry run: the grant is deliberately not issued.
    SkipGrant,
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Identity(_) => "identity",
            Step::Account(_) => "account",
            Step::Grant(_) => "grant",
            Step::SkipGrant => "skip-grant",
        }
    }
}

/// Where a record is in its processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordState {
    Start,
    Resolved {
        identity: InternalIdentity,
    },
    Linked {
        identity: InternalIdentity,
        link: ExternalAccountLink,
    },
    Done {
        stage: Stage,
        detail: Option<String>,
    },
}

/// A step was applied to a state that does not accept it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid record transition: step '{step}' from state '{from}'")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub step: &'static str,
}

impl RecordState {
    pub fn name(&self) -> &'static str {
        match self {
            RecordState::Start => "start",
            RecordState::Resolved { .. } => "resolved",
            RecordState::Linked { .. } => "linked",
            RecordState::Done { .. } => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordState::Done { .. })
    }

    fn done(stage: Stage) -> Self {
        RecordState::Done {
            stage,
            detail: None,
        }
    }

    pub fn advance(self, step: Step) -> Result<RecordState, InvalidTransition> {
        match (self, step) {
            (RecordState::Start, Step::Identity(Lookup::Found(identity))) => {
                Ok(RecordState::Resolved { identity })
            }
            (RecordState::Start, Step::Identity(Lookup::NotFound)) => {
                Ok(Self::done(Stage::Unresolved))
            }
            (RecordState::Resolved { identity }, Step::Account(Lookup::Found(link))) => {
                Ok(RecordState::Linked { identity, link })
            }
            (RecordState::Resolved { .. }, Step::Account(Lookup::NotFound)) => {
                Ok(Self::done(Stage::AccountNotLinked))
            }
            (RecordState::Linked { .. }, Step::Grant(GrantOutcome::Granted)) => {
                Ok(Self::done(Stage::SyncSucceeded))
            }
            (RecordState::Linked { .. }, Step::Grant(GrantOutcome::Failed { message })) => {
                Ok(RecordState::Done {
                    stage: Stage::SyncFailed,
                    detail: Some(message),
                })
            }
            (RecordState::Linked { .. }, Step::SkipGrant) => Ok(Self::done(Stage::WouldGrant)),
            (state, step) => Err(InvalidTransition {
                from: state.name(),
                step: step.name(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Run-level knobs for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub provider_id: String,
    /// Delay after each issued grant call, skipped after the final record.
    pub spacing: Duration,
    pub dry_run: bool,
}

/// Drives every record through the state machine, one at a time.
pub struct Orchestrator<'a> {
    store: &'a dyn IdentityStore,
    synchronizer: GroupSynchronizer<'a>,
    settings: OrchestratorSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        store: &'a dyn IdentityStore,
        synchronizer: GroupSynchronizer<'a>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            synchronizer,
            settings,
        }
    }

    /// Process `records` in order and aggregate their outcomes.
    ///
    /// Per-record failures are outcomes, not errors. Only an invalid state
    /// transition aborts the batch.
    pub async fn run(&self, records: Vec<RosterRecord>) -> Result<BatchReport, SyncError> {
        let total = records.len();
        let mut aggregator = Aggregator::new(self.settings.dry_run);
        tracing::info!(total, dry_run = self.settings.dry_run, "processing roster");

        for (idx, record) in records.into_iter().enumerate() {
            let position = idx + 1;
            tracing::info!(
                row = record.row,
                name = %record.display_name(),
                "[{position}/{total}] processing",
            );

            let (outcome, grant_issued) = self.process(record).await?;
            log_outcome(&outcome);
            aggregator.record(outcome);

            if grant_issued && position < total && !self.settings.spacing.is_zero() {
                tokio::time::sleep(self.settings.spacing).await;
            }
        }

        let report = aggregator.finish();
        tracing::info!(
            total = report.counters.total,
            granted = report.counters.granted,
            failed = report.counters.failed,
            "roster processing complete",
        );
        Ok(report)
    }

    /// One record from `Start` to `Done`. Returns whether a grant call was issued.
    async fn process(
        &self,
        record: RosterRecord,
    ) -> Result<(OutcomeRecord, bool), InvalidTransition> {
        let mut state = RecordState::Start;
        let mut grant_issued = false;

        loop {
            let step = match &state {
                RecordState::Start => {
                    let found = self
                        .store
                        .find_identity_by_name(
                            &record.first_name,
                            &record.last_name,
                            record.prefix_filter(),
                        )
                        .await;
                    Step::Identity(fail_open(found, &record, "identity"))
                }
                RecordState::Resolved { identity } => {
                    tracing::debug!(internal_id = %identity.internal_id, "identity resolved");
                    let found = self
                        .store
                        .find_linked_account(&identity.internal_id, &self.settings.provider_id)
                        .await;
                    Step::Account(fail_open(found, &record, "account"))
                }
                RecordState::Linked { link, .. } if self.settings.dry_run => {
                    tracing::info!(
                        account_id = %link.external_account_id,
                        "dry run: grant not issued",
                    );
                    Step::SkipGrant
                }
                RecordState::Linked { link, .. } => {
                    grant_issued = true;
                    Step::Grant(self.synchronizer.grant(&link.external_account_id).await)
                }
                RecordState::Done { stage, detail } => {
                    let outcome = OutcomeRecord::new(record, *stage).with_detail(detail.clone());
                    return Ok((outcome, grant_issued));
                }
            };
            state = state.advance(step)?;
        }
    }
}

/// A store error on a lookup is logged and treated as not-found.
fn fail_open<T>(
    result: Result<Lookup<T>, StoreError>,
    record: &RosterRecord,
    lookup: &'static str,
) -> Lookup<T> {
    result.unwrap_or_else(|err| {
        tracing::warn!(
            row = record.row,
            name = %record.display_name(),
            lookup,
            error = %err,
            "store lookup failed; treating as not found",
        );
        Lookup::NotFound
    })
}

fn log_outcome(outcome: &OutcomeRecord) {
    let name = outcome.record.display_name();
    match outcome.stage {
        Stage::SyncSucceeded => tracing::info!(name = %name, "role granted"),
        Stage::WouldGrant => tracing::info!(name = %name, "would grant role"),
        stage => tracing::warn!(
            name = %name,
            stage = %stage,
            reason = outcome.reason.as_deref().unwrap_or(""),
            "record not synchronized",
        ),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
