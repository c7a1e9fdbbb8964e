//! [`MemoryStore`], a process-local [`SubjectStore`].
//!
//! State lives only as long as the process. Every operation takes the same
//! lock, so operations on one key are trivially serialised.

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{Arc, Mutex, MutexGuard},
};

use crate::{Error, Result, store::SubjectStore, subject::Subject};

/// An in-memory subject store.
///
/// Cloning is cheap and clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<BTreeMap<String, Subject>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Subject>>> {
    self.inner.lock().map_err(|_| Error::Poisoned)
  }
}

impl SubjectStore for MemoryStore {
  type Error = Error;

  async fn list_known(&self) -> Result<BTreeSet<String>> {
    Ok(self.lock()?.keys().cloned().collect())
  }

  async fn list_snapshots(&self) -> Result<Vec<Subject>> {
    Ok(self.lock()?.values().cloned().collect())
  }

  async fn get(&self, id: &str) -> Result<Option<Subject>> {
    Ok(self.lock()?.get(id).cloned())
  }

  async fn create_or_update(&self, subject: Subject) -> Result<()> {
    self.lock()?.insert(subject.id.clone(), subject);
    Ok(())
  }

  async fn delete(&self, id: &str) -> Result<()> {
    self.lock()?.remove(id);
    Ok(())
  }

  async fn reset_all(&self) -> Result<usize> {
    let mut map = self.lock()?;
    let cleared = map.len();
    map.clear();
    Ok(cleared)
  }
}
