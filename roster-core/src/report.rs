//! Outcome aggregation and the rendered batch summary.
//!
//! [`Aggregator`] is the only mutable state of a run; it is touched by the
//! single orchestrating task. [`BatchReport`] is the immutable result.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{OutcomeRecord, Stage};

const RULE_WIDTH: usize = 60;
const LABEL_WIDTH: usize = 30;

/// Cumulative per-stage counters.
///
/// A record that is granted increments `resolved_in_store`,
/// `linked_account`, and `granted`; the counters are not mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub total: usize,
    pub resolved_in_store: usize,
    pub linked_account: usize,
    pub granted: usize,
    pub failed: usize,
    pub would_grant: usize,
}

impl Counters {
    fn count(&mut self, stage: Stage) {
        self.total += 1;
        if stage.resolved_in_store() {
            self.resolved_in_store += 1;
        }
        if stage.linked_account() {
            self.linked_account += 1;
        }
        match stage {
            Stage::SyncSucceeded => self.granted += 1,
            Stage::WouldGrant => self.would_grant += 1,
            _ => {}
        }
        if stage.is_failure() {
            self.failed += 1;
        }
    }
}

/// Accumulates outcomes in processing order.
#[derive(Debug)]
pub struct Aggregator {
    counters: Counters,
    outcomes: Vec<OutcomeRecord>,
    dry_run: bool,
    started_at: DateTime<Utc>,
}

impl Aggregator {
    pub fn new(dry_run: bool) -> Self {
        Self {
            counters: Counters::default(),
            outcomes: Vec::new(),
            dry_run,
            started_at: Utc::now(),
        }
    }

    pub fn record(&mut self, outcome: OutcomeRecord) {
        self.counters.count(outcome.stage);
        self.outcomes.push(outcome);
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn finish(self) -> BatchReport {
        BatchReport {
            counters: self.counters,
            outcomes: self.outcomes,
            dry_run: self.dry_run,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// The result of one run: counters plus every outcome in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub counters: Counters,
    pub outcomes: Vec<OutcomeRecord>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    /// Failed outcomes in the order they were processed.
    pub fn failures(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.outcomes.iter().filter(|o| o.stage.is_failure())
    }

    /// `granted / total` as a percentage; `0.0` for an empty batch.
    pub fn success_rate(&self) -> f64 {
        if self.counters.total == 0 {
            return 0.0;
        }
        self.counters.granted as f64 / self.counters.total as f64 * 100.0
    }

    /// Human-readable summary. Pure: the same report always renders the same text.
    pub fn render(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let c = &self.counters;
        let mut out = String::new();

        let title = if self.dry_run {
            "PROCESSING SUMMARY (dry run)"
        } else {
            "PROCESSING SUMMARY"
        };
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{rule}");
        line(&mut out, "Total records:", c.total);
        line(&mut out, "Found in identity store:", c.resolved_in_store);
        line(&mut out, "Linked external accounts:", c.linked_account);
        if self.dry_run {
            line(&mut out, "Would grant:", c.would_grant);
        }
        line(&mut out, "Granted:", c.granted);
        line(&mut out, "Failed:", c.failed);
        line(
            &mut out,
            "Success rate:",
            format!("{:.1}%", self.success_rate()),
        );
        let _ = writeln!(out, "{rule}");

        let mut failures = self.failures().peekable();
        if failures.peek().is_some() {
            let _ = writeln!(out);
            let _ = writeln!(out, "FAILED RECORDS:");
            let _ = writeln!(out, "{rule}");
            for (idx, failed) in failures.enumerate() {
                let _ = writeln!(out, "{}. {}", idx + 1, failed.record.display_name());
                if let Some(reason) = &failed.reason {
                    let _ = writeln!(out, "   Reason: {reason}");
                }
                if let Some(detail) = &failed.detail {
                    let _ = writeln!(out, "   Detail: {detail}");
                }
            }
            let _ = writeln!(out, "{rule}");
        }

        out
    }
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let width = LABEL_WIDTH;
    let _ = writeln!(out, "{label:<width$}{value}");
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
