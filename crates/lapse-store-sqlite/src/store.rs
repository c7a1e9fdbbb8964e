//! [`SqliteStore`]: the SQLite implementation of [`SubjectStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::Utc;
use lapse_core::{store::SubjectStore, subject::Subject};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Result,
  encode::{RawState, encode_dt, encode_snapshot},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A subject store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SubjectStore impl ───────────────────────────────────────────────────────

impl SubjectStore for SqliteStore {
  type Error = crate::Error;

  async fn list_known(&self) -> Result<BTreeSet<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT subject_id FROM subject_states")?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(keys)
  }

  async fn list_snapshots(&self) -> Result<Vec<Subject>> {
    let raws: Vec<RawState> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT subject_id, snapshot_json FROM subject_states ORDER BY subject_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawState {
              subject_id:    row.get(0)?,
              snapshot_json: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawState::into_subject).collect()
  }

  async fn get(&self, id: &str) -> Result<Option<Subject>> {
    let id_str = id.to_owned();

    let raw: Option<RawState> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subject_id, snapshot_json FROM subject_states WHERE subject_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawState {
                subject_id:    row.get(0)?,
                snapshot_json: row.get(1)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawState::into_subject).transpose()
  }

  async fn create_or_update(&self, subject: Subject) -> Result<()> {
    let id_str       = subject.id.clone();
    let kind_str     = subject.kind.as_str();
    let app_id       = subject.application.app_id.clone();
    let end_str      = subject.end_date_time.map(encode_dt);
    let snapshot_str = encode_snapshot(&subject)?;
    let updated_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subject_states (
             subject_id, kind, app_id, end_date_time, snapshot_json, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (subject_id) DO UPDATE SET
             kind          = excluded.kind,
             app_id        = excluded.app_id,
             end_date_time = excluded.end_date_time,
             snapshot_json = excluded.snapshot_json,
             updated_at    = excluded.updated_at",
          rusqlite::params![id_str, kind_str, app_id, end_str, snapshot_str, updated_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete(&self, id: &str) -> Result<()> {
    let id_str = id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM subject_states WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if removed == 0 {
      debug!(subject_id = id, "delete of absent subject state");
    }
    Ok(())
  }

  async fn reset_all(&self) -> Result<usize> {
    let cleared = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM subject_states", [])?))
      .await?;
    Ok(cleared)
  }
}
