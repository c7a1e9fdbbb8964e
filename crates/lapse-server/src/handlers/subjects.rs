//! `GET /subjects`: the snapshot stored for every subject already notified.

use axum::{Json, extract::State};
use lapse_core::{
  sink::EventSink, source::CredentialSource, store::SubjectStore, subject::Subject,
};

use crate::{AppState, error::ApiError};

pub async fn list<C, S, E>(
  State(state): State<AppState<C, S, E>>,
) -> Result<Json<Vec<Subject>>, ApiError>
where
  C: CredentialSource,
  S: SubjectStore,
  E: EventSink,
{
  let subjects = state
    .reconciler
    .store()
    .list_snapshots()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(subjects))
}
