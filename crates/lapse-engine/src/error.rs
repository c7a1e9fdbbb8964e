//! Error type for `lapse-engine`.
//!
//! Only cycle-level failures surface here. Per-subject failures are recorded in
//! the [`CycleReport`](crate::report::CycleReport) instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The upstream listing failed or was incomplete. No state was touched.
  #[error("credential source error: {0}")]
  Source(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// The store could not be enumerated or reset.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
