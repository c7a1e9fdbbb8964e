//! The `CredentialSource` trait: where expiring subjects come from.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::subject::{Subject, ThresholdDays};

/// An upstream directory of applications and their credentials.
pub trait CredentialSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every credential whose expiry is at or before `now + threshold`.
  ///
  /// Implementations must return either the complete list or an error; a
  /// partial listing would make unreached subjects look stale.
  fn fetch_expiring(
    &self,
    threshold: ThresholdDays,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;
}
