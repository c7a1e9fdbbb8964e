//! The `SubjectStore` trait — durable per-subject state.
//!
//! The trait is implemented by storage backends (e.g. `lapse-store-sqlite`,
//! or [`MemoryStore`](crate::memory::MemoryStore)). The reconciliation engine
//! depends on this abstraction, not on any concrete backend.

use std::{collections::BTreeSet, future::Future};

use crate::subject::Subject;

/// Keyed storage of the last subject snapshot that was acted upon.
///
/// Keys are subject ids. Implementations must serialise operations on the same
/// key; no ordering is required across distinct keys.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait SubjectStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every key that currently holds state.
  fn list_known(
    &self,
  ) -> impl Future<Output = Result<BTreeSet<String>, Self::Error>> + Send + '_;

  /// Every stored snapshot, ordered by key.
  fn list_snapshots(
    &self,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// The snapshot stored under `id`, or `None` if the key holds no state.
  fn get<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  /// Insert or replace the snapshot stored under `subject.id`.
  fn create_or_update(
    &self,
    subject: Subject,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Clear the state for `id`. Deleting an absent key is not an error.
  fn delete<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Clear the state of every known key and return how many were cleared.
  fn reset_all(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
