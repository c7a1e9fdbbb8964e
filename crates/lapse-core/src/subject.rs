//! A single expiring credential and the application that owns it.
//!
//! A subject is an immutable snapshot taken at fetch time. Nothing about it is
//! updated in place; the store replaces the whole snapshot when a subject is
//! re-notified.

use std::{fmt, num::NonZeroU32};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

// ─── Credential kind ─────────────────────────────────────────────────────────

/// Which kind of credential a subject is. Decided once, at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialKind {
  /// A client secret (password credential).
  Secret,
  /// An uploaded certificate (key credential).
  Certificate,
}

impl CredentialKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Secret => "secret",
      Self::Certificate => "certificate",
    }
  }
}

impl fmt::Display for CredentialKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Application ─────────────────────────────────────────────────────────────

/// The registered application a credential belongs to. Copied into every
/// subject of that application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
  pub display_name:      Option<String>,
  pub app_id:            String,
  pub created_date_time: Option<DateTime<Utc>>,
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// One expiring credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
  /// Key identifier of the credential; the store key.
  pub id:              String,
  pub display_name:    Option<String>,
  pub start_date_time: Option<DateTime<Utc>>,
  /// The expiry instant.
  pub end_date_time:   Option<DateTime<Utc>>,
  pub kind:            CredentialKind,
  /// Secret hint or certificate thumbprint, depending on `kind`.
  pub context:         Option<String>,
  pub application:     Application,
}

impl Subject {
  /// Whole days until `end_date_time` as seen from `now`, rounded to the
  /// nearest integer with ties going to the even neighbour. Negative once the
  /// credential has expired; 0 when there is no expiry.
  pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
    let Some(end) = self.end_date_time else { return 0 };
    let days = (end - now).num_milliseconds() as f64 / MILLIS_PER_DAY;
    days.round_ties_even() as i64
  }

  /// `true` if the credential expires within `threshold` of `now` (or has
  /// already expired). Credentials without an expiry never qualify.
  pub fn is_expiring(&self, threshold: ThresholdDays, now: DateTime<Utc>) -> bool {
    self
      .end_date_time
      .is_some_and(|end| end <= now + threshold.as_duration())
  }
}

// ─── Threshold ───────────────────────────────────────────────────────────────

/// One hundred years.
pub const MAX_THRESHOLD_DAYS: u32 = 36_500;

/// The configured expiry window, in days. Also the re-alert cadence.
///
/// Never zero: it is used as a modulus. At most [`MAX_THRESHOLD_DAYS`], so
/// that `now + threshold` stays representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ThresholdDays(NonZeroU32);

impl ThresholdDays {
  pub fn new(days: u32) -> Result<Self> {
    if days > MAX_THRESHOLD_DAYS {
      return Err(Error::ThresholdTooLarge(days));
    }
    NonZeroU32::new(days).map(Self).ok_or(Error::ZeroThreshold)
  }

  pub fn get(self) -> u32 { self.0.get() }

  pub fn as_duration(self) -> Duration { Duration::days(i64::from(self.get())) }

  /// `true` when `days_left` falls on a re-alert boundary (a whole multiple
  /// of the threshold, including 0 and negative multiples).
  pub fn is_boundary(self, days_left: i64) -> bool {
    days_left % i64::from(self.get()) == 0
  }
}

const DEFAULT_THRESHOLD_DAYS: NonZeroU32 = NonZeroU32::new(30).unwrap();

impl Default for ThresholdDays {
  fn default() -> Self { Self(DEFAULT_THRESHOLD_DAYS) }
}

impl TryFrom<u32> for ThresholdDays {
  type Error = Error;

  fn try_from(days: u32) -> Result<Self> { Self::new(days) }
}

impl From<ThresholdDays> for u32 {
  fn from(t: ThresholdDays) -> Self { t.get() }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
  }

  fn secret_ending(end: Option<DateTime<Utc>>) -> Subject {
    Subject {
      id:              "k1".into(),
      display_name:    Some("deploy".into()),
      start_date_time: None,
      end_date_time:   end,
      kind:            CredentialKind::Secret,
      context:         Some("abc".into()),
      application:     Application {
        display_name:      Some("billing".into()),
        app_id:            "app-1".into(),
        created_date_time: None,
      },
    }
  }

  #[test]
  fn days_left_counts_whole_days() {
    let s = secret_ending(Some(now() + Duration::days(30)));
    assert_eq!(s.days_left(now()), 30);
  }

  #[test]
  fn days_left_rounds_half_to_even() {
    let half = Duration::hours(12);
    let s = secret_ending(Some(now() + Duration::days(2) + half));
    assert_eq!(s.days_left(now()), 2);
    let s = secret_ending(Some(now() + Duration::days(3) + half));
    assert_eq!(s.days_left(now()), 4);
  }

  #[test]
  fn days_left_is_negative_after_expiry() {
    let s = secret_ending(Some(now() - Duration::days(5)));
    assert_eq!(s.days_left(now()), -5);
  }

  #[test]
  fn days_left_without_expiry_is_zero() {
    assert_eq!(secret_ending(None).days_left(now()), 0);
  }

  #[test]
  fn is_expiring_is_inclusive_of_the_window_edge() {
    let t = ThresholdDays::new(30).unwrap();
    assert!(secret_ending(Some(now() + Duration::days(30))).is_expiring(t, now()));
    assert!(!secret_ending(Some(now() + Duration::days(31))).is_expiring(t, now()));
    assert!(secret_ending(Some(now() - Duration::days(1))).is_expiring(t, now()));
    assert!(!secret_ending(None).is_expiring(t, now()));
  }

  #[test]
  fn zero_threshold_is_rejected() {
    assert!(matches!(ThresholdDays::new(0), Err(Error::ZeroThreshold)));
  }

  #[test]
  fn oversized_threshold_is_rejected() {
    assert!(ThresholdDays::new(MAX_THRESHOLD_DAYS).is_ok());
    assert!(matches!(
      ThresholdDays::new(MAX_THRESHOLD_DAYS + 1),
      Err(Error::ThresholdTooLarge(_))
    ));
    assert!(matches!(ThresholdDays::new(100_000_000), Err(Error::ThresholdTooLarge(_))));
    assert!(serde_json::from_str::<ThresholdDays>("100000000").is_err());
  }

  #[test]
  fn widest_threshold_does_not_overflow() {
    let t = ThresholdDays::new(MAX_THRESHOLD_DAYS).unwrap();
    assert!(secret_ending(Some(now() + Duration::days(36_000))).is_expiring(t, now()));
  }

  #[test]
  fn boundaries_are_multiples_of_the_threshold() {
    let t = ThresholdDays::new(30).unwrap();
    assert!(t.is_boundary(0));
    assert!(t.is_boundary(30));
    assert!(t.is_boundary(-30));
    assert!(!t.is_boundary(29));
    assert!(!t.is_boundary(-1));
  }

  #[test]
  fn threshold_deserialises_from_integer() {
    let t: ThresholdDays = serde_json::from_str("7").unwrap();
    assert_eq!(t.get(), 7);
    assert!(serde_json::from_str::<ThresholdDays>("0").is_err());
  }
}
