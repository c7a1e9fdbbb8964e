//! Administrative reset: forget every known subject.
//!
//! Used to re-arm notifications, e.g. after the threshold changes. Every
//! subject still expiring upstream is reported as new on the next cycle.

use lapse_core::store::SubjectStore;
use tracing::info;

use crate::{Error, Result};

/// Delete the state of every known subject and return how many were cleared.
///
/// Publishes nothing. Running it again right away clears nothing and succeeds.
pub async fn reset<S: SubjectStore>(store: &S) -> Result<usize> {
  let cleared = store
    .reset_all()
    .await
    .map_err(|e| Error::Store(Box::new(e)))?;
  info!(cleared, "reset known subjects");
  Ok(cleared)
}
