//! Manual cycle control.
//!
//! Both handlers refuse with 409 rather than queue behind a running cycle.

use axum::{Json, extract::State};
use lapse_core::{sink::EventSink, source::CredentialSource, store::SubjectStore};
use lapse_engine::CycleReport;
use serde::Serialize;
use tracing::info;

use crate::{AppState, error::ApiError};

/// `POST /run`: run one cycle now and return its report.
pub async fn run<C, S, E>(
  State(state): State<AppState<C, S, E>>,
) -> Result<Json<CycleReport>, ApiError>
where
  C: CredentialSource,
  S: SubjectStore,
  E: EventSink,
{
  info!("manual reconciliation cycle requested");
  Ok(Json(state.try_run_cycle().await?))
}

#[derive(Debug, Serialize)]
pub struct ResetBody {
  pub cleared: usize,
}

/// `POST /reset`: forget every known subject so that each one still expiring
/// is notified again on the next cycle.
pub async fn reset<C, S, E>(
  State(state): State<AppState<C, S, E>>,
) -> Result<Json<ResetBody>, ApiError>
where
  C: CredentialSource,
  S: SubjectStore,
  E: EventSink,
{
  let cleared = state.try_reset().await?;
  Ok(Json(ResetBody { cleared }))
}
