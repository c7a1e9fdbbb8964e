//! The recurring reconciliation timer.

use std::time::Duration;

use lapse_core::{sink::EventSink, source::CredentialSource, store::SubjectStore};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::AppState;

/// Run a cycle every `period` until the task is dropped or aborted.
///
/// Ticks that would have fired while a cycle was still running are skipped,
/// not queued. A failed cycle is logged and the timer carries on.
pub async fn run<C, S, E>(state: AppState<C, S, E>, period: Duration, run_on_startup: bool)
where
  C: CredentialSource,
  S: SubjectStore,
  E: EventSink,
{
  let mut ticker = time::interval(period);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

  // The first tick completes immediately.
  if !run_on_startup {
    ticker.tick().await;
  }

  info!(period_secs = period.as_secs(), "reconciliation timer started");
  loop {
    ticker.tick().await;
    match state.run_cycle().await {
      Ok(report) if !report.failures.is_empty() => {
        warn!(failed = report.failures.len(), "cycle finished with failed subjects");
      }
      Ok(_) => {}
      Err(e) => error!(error = %e, "reconciliation cycle aborted"),
    }
  }
}
