//! SQL schema for the lapse SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per known subject. A row exists only while the subject has state;
-- deleting the state deletes the row.
CREATE TABLE IF NOT EXISTS subject_states (
    subject_id    TEXT PRIMARY KEY,
    kind          TEXT NOT NULL,   -- 'secret' | 'certificate'
    app_id        TEXT NOT NULL,
    end_date_time TEXT,            -- ISO 8601 UTC or NULL
    snapshot_json TEXT NOT NULL,   -- full Subject snapshot
    updated_at    TEXT NOT NULL    -- ISO 8601 UTC; set on every upsert
);

CREATE INDEX IF NOT EXISTS subject_states_app_idx ON subject_states(app_id);

PRAGMA user_version = 1;
";
