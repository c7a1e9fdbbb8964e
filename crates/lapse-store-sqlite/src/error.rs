//! Error type for `lapse-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A row's key disagrees with the id inside its snapshot.
  #[error("row {key} holds a snapshot for subject {snapshot_id}")]
  KeyMismatch { key: String, snapshot_id: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
