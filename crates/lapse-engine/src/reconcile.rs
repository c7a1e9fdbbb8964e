//! [`Reconciler`]: one fetch, diff, notify/persist, cleanup cycle.
//!
//! A cycle runs in two passes over the freshly fetched subjects and the keys
//! already in the store:
//!
//! 1. **Stale pass.** Every known key missing from the fetch is deleted. No
//!    event is published for removals.
//! 2. **Decision pass.** Every fetched subject is classified (see
//!    [`classify`]); new and re-notified subjects are published first and
//!    persisted only once the sink has accepted the event.
//!
//! The stale pass completes before the decision pass starts. Within a pass,
//! subjects are processed concurrently up to `max_concurrency`.
//!
//! A failed fetch or a failed key listing aborts the cycle before anything is
//! mutated. Any other failure is confined to its subject and shows up in the
//! [`CycleReport`]; because nothing is persisted for that subject, the next
//! cycle picks it up again.

use std::{
  collections::{BTreeSet, HashSet},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use futures::{StreamExt as _, stream};
use lapse_core::{
  sink::EventSink,
  source::CredentialSource,
  store::SubjectStore,
  subject::{Subject, ThresholdDays},
};
use tracing::{info, warn};

use crate::{
  Error, Result,
  decision::{Decision, classify},
  notify::Notifier,
  report::{CycleReport, KeyFailure, Stage},
};

pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Tunables for a [`Reconciler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
  pub threshold:       ThresholdDays,
  /// Upper bound on subjects processed at once within a pass.
  pub max_concurrency: usize,
}

impl Settings {
  pub fn new(threshold: ThresholdDays) -> Self {
    Self { threshold, max_concurrency: DEFAULT_MAX_CONCURRENCY }
  }
}

/// Drives reconciliation cycles over a source, a store and a sink.
///
/// The reconciler does not prevent two cycles from overlapping; callers are
/// expected to run one at a time.
pub struct Reconciler<C, S, E> {
  source:   Arc<C>,
  store:    Arc<S>,
  notifier: Notifier<E>,
  settings: Settings,
}

impl<C, S, E> Reconciler<C, S, E>
where
  C: CredentialSource,
  S: SubjectStore,
  E: EventSink,
{
  pub fn new(
    source: Arc<C>,
    store: Arc<S>,
    notifier: Notifier<E>,
    settings: Settings,
  ) -> Self {
    Self { source, store, notifier, settings }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  /// Run one cycle with `now` as the evaluation time.
  pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleReport> {
    let threshold = self.settings.threshold;
    let limit = self.settings.max_concurrency.max(1);

    let fetched = self
      .source
      .fetch_expiring(threshold, now)
      .await
      .map_err(|e| Error::Source(Box::new(e)))?;
    info!(count = fetched.len(), "found expiring subjects");

    let known = self
      .store
      .list_known()
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;
    info!(count = known.len(), "found known subjects");

    let mut report = CycleReport {
      fetched: fetched.len(),
      known: known.len(),
      ..CycleReport::default()
    };

    // ── Stale pass ────────────────────────────────────────────────────────

    let fetched_ids: HashSet<&str> = fetched.iter().map(|s| s.id.as_str()).collect();
    let purges: Vec<_> = stale_keys(&known, &fetched_ids)
      .map(|id| self.purge(id))
      .collect();

    let purged: Vec<_> = stream::iter(purges).buffer_unordered(limit).collect().await;
    drop(fetched_ids);
    for outcome in purged {
      match outcome {
        Ok(()) => report.purged += 1,
        Err(failure) => report.failures.push(failure),
      }
    }

    // ── Decision pass ─────────────────────────────────────────────────────

    let applies: Vec<_> = fetched
      .into_iter()
      .map(|subject| {
        let decision = classify(&subject, &known, threshold, now);
        self.apply(subject, decision, now)
      })
      .collect();

    let applied: Vec<_> = stream::iter(applies).buffer_unordered(limit).collect().await;
    for outcome in applied {
      match outcome {
        Ok(decision) => report.record_decision(decision),
        Err(failure) => report.failures.push(failure),
      }
    }

    info!(
      new = report.new,
      renotified = report.renotified,
      skipped = report.skipped,
      purged = report.purged,
      failed = report.failures.len(),
      "reconciliation cycle complete"
    );
    Ok(report)
  }

  /// Delete one stale key. The stored snapshot is read only for logging; a
  /// failed read does not prevent the delete.
  async fn purge(&self, id: &str) -> Result<(), KeyFailure> {
    let snapshot = match self.store.get(id).await {
      Ok(snapshot) => snapshot,
      Err(e) => {
        warn!(subject_id = id, error = %e, "failed to load stale subject snapshot");
        None
      }
    };

    if let Err(e) = self.store.delete(id).await {
      warn!(subject_id = id, error = %e, "failed to delete stale subject");
      return Err(KeyFailure::new(id, Stage::Delete, &e));
    }

    match snapshot {
      Some(s) => info!(
        kind = %s.kind,
        subject_id = id,
        display_name = s.display_name.as_deref().unwrap_or_default(),
        app_id = %s.application.app_id,
        app_display_name = s.application.display_name.as_deref().unwrap_or_default(),
        "deleted subject no longer expiring upstream"
      ),
      None => info!(subject_id = id, "deleted subject no longer expiring upstream"),
    }
    Ok(())
  }

  /// Publish-then-persist for one fetched subject.
  async fn apply(
    &self,
    subject: Subject,
    decision: Decision,
    now: DateTime<Utc>,
  ) -> Result<Decision, KeyFailure> {
    if decision == Decision::Skip {
      return Ok(decision);
    }

    let days_left = subject.days_left(now);

    if let Err(e) = self.notifier.notify(&subject, now).await {
      warn!(subject_id = %subject.id, error = %e, "failed to publish notification");
      return Err(KeyFailure::new(&subject.id, Stage::Dispatch, &e));
    }

    let id = subject.id.clone();
    let kind = subject.kind;
    let app_id = subject.application.app_id.clone();
    let display_name = subject.display_name.clone();

    if let Err(e) = self.store.create_or_update(subject).await {
      warn!(subject_id = %id, error = %e, "notified but failed to persist subject");
      return Err(KeyFailure::new(&id, Stage::Persist, &e));
    }

    info!(
      kind = %kind,
      subject_id = %id,
      display_name = display_name.as_deref().unwrap_or_default(),
      app_id = %app_id,
      days_left,
      ?decision,
      "notified subject"
    );
    Ok(decision)
  }
}

fn stale_keys<'a>(
  known: &'a BTreeSet<String>,
  fetched_ids: &'a HashSet<&str>,
) -> impl Iterator<Item = &'a str> + 'a {
  known
    .iter()
    .map(String::as_str)
    .filter(|id| !fetched_ids.contains(id))
}
