//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. The subject snapshot is stored
//! as compact JSON.

use chrono::{DateTime, Utc};
use lapse_core::subject::Subject;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Snapshot ────────────────────────────────────────────────────────────────

pub fn encode_snapshot(subject: &Subject) -> Result<String> {
  Ok(serde_json::to_string(subject)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `subject_states` row.
pub struct RawState {
  pub subject_id:    String,
  pub snapshot_json: String,
}

impl RawState {
  pub fn into_subject(self) -> Result<Subject> {
    let subject: Subject = serde_json::from_str(&self.snapshot_json)?;
    if subject.id != self.subject_id {
      return Err(Error::KeyMismatch {
        key:         self.subject_id,
        snapshot_id: subject.id,
      });
    }
    Ok(subject)
  }
}
