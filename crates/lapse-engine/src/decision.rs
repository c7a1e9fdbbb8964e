//! What to do with one fetched subject.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use lapse_core::subject::{Subject, ThresholdDays};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
  /// Not seen before: notify and persist.
  New,
  /// Known, and sitting on a re-alert boundary: notify and refresh.
  Renotify,
  /// Known, between boundaries.
  Skip,
}

/// Classify `subject` against the set of `known` keys.
pub fn classify(
  subject: &Subject,
  known: &BTreeSet<String>,
  threshold: ThresholdDays,
  now: DateTime<Utc>,
) -> Decision {
  if !known.contains(&subject.id) {
    Decision::New
  } else if threshold.is_boundary(subject.days_left(now)) {
    Decision::Renotify
  } else {
    Decision::Skip
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};
  use lapse_core::subject::{Application, CredentialKind};

  use super::*;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
  }

  fn subject(days: i64) -> Subject {
    Subject {
      id:              "s1".into(),
      display_name:    None,
      start_date_time: None,
      end_date_time:   Some(now() + Duration::days(days)),
      kind:            CredentialKind::Secret,
      context:         None,
      application:     Application {
        display_name:      None,
        app_id:            "app".into(),
        created_date_time: None,
      },
    }
  }

  fn known() -> BTreeSet<String> { BTreeSet::from(["s1".to_string()]) }

  #[test]
  fn unknown_subjects_are_new_whatever_their_days_left() {
    let t = ThresholdDays::new(30).unwrap();
    for days in [29, 30, 0, -3] {
      assert_eq!(classify(&subject(days), &BTreeSet::new(), t, now()), Decision::New);
    }
  }

  #[test]
  fn known_subjects_renotify_on_multiples() {
    let t = ThresholdDays::new(30).unwrap();
    assert_eq!(classify(&subject(30), &known(), t, now()), Decision::Renotify);
    assert_eq!(classify(&subject(0), &known(), t, now()), Decision::Renotify);
    assert_eq!(classify(&subject(-30), &known(), t, now()), Decision::Renotify);
  }

  #[test]
  fn known_subjects_between_boundaries_are_skipped() {
    let t = ThresholdDays::new(30).unwrap();
    assert_eq!(classify(&subject(29), &known(), t, now()), Decision::Skip);
    assert_eq!(classify(&subject(1), &known(), t, now()), Decision::Skip);
    assert_eq!(classify(&subject(-1), &known(), t, now()), Decision::Skip);
  }

  #[test]
  fn one_day_threshold_renotifies_every_cycle() {
    let t = ThresholdDays::new(1).unwrap();
    assert_eq!(classify(&subject(17), &known(), t, now()), Decision::Renotify);
  }
}
