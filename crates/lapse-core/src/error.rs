//! Error types for `lapse-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("threshold must be at least one day")]
  ZeroThreshold,

  #[error("threshold of {0} days exceeds the maximum of {max} days", max = crate::subject::MAX_THRESHOLD_DAYS)]
  ThresholdTooLarge(u32),

  #[error("store lock poisoned")]
  Poisoned,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
