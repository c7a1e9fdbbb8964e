//! Per-cycle outcome summary.

use serde::Serialize;

use crate::decision::Decision;

/// Where a per-subject failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  /// Removing a stale subject.
  Delete,
  /// Publishing the notification event.
  Dispatch,
  /// Storing the snapshot after a successful dispatch.
  Persist,
}

/// A failure isolated to one subject. The subject is retried next cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFailure {
  pub subject_id: String,
  pub stage:      Stage,
  pub message:    String,
}

impl KeyFailure {
  pub fn new(subject_id: &str, stage: Stage, error: &dyn std::error::Error) -> Self {
    Self { subject_id: subject_id.to_owned(), stage, message: error.to_string() }
  }
}

/// Counts for one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
  /// Subjects returned by the source.
  pub fetched:    usize,
  /// Keys in the store when the cycle started.
  pub known:      usize,
  pub new:        usize,
  pub renotified: usize,
  pub skipped:    usize,
  /// Stale keys deleted.
  pub purged:     usize,
  pub failures:   Vec<KeyFailure>,
}

impl CycleReport {
  pub(crate) fn record_decision(&mut self, decision: Decision) {
    match decision {
      Decision::New => self.new += 1,
      Decision::Renotify => self.renotified += 1,
      Decision::Skip => self.skipped += 1,
    }
  }

  /// Total events published this cycle.
  pub fn notified(&self) -> usize { self.new + self.renotified }
}
