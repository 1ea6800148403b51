use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{Error, Result, StorageError};
use crate::models::{Application, ApplicationDraft, ApplicationId};

/// Data-access seam behind the service.
///
/// Each call is one atomic read or write. `list_all` yields the newest
/// application first (by `created_at`, then by `id`).
pub trait Store {
    fn get(&self, id: ApplicationId) -> Result<Application>;

    /// Assigns a fresh id and sets both timestamps.
    fn insert(&self, draft: ApplicationDraft) -> Result<Application>;

    fn replace(&self, id: ApplicationId, record: &Application) -> Result<()>;

    fn delete(&self, id: ApplicationId) -> Result<()>;

    fn list_all(&self) -> Result<Vec<Application>>;
}

/// In-process store. Ids come from a counter that only grows, so a deleted
/// id is never handed out again.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: ApplicationId,
    records: BTreeMap<ApplicationId, Application>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    StorageError::Corrupt("memory store lock poisoned".to_string()).into()
}

impl Store for MemoryStore {
    fn get(&self, id: ApplicationId) -> Result<Application> {
        let inner = self.inner.read().map_err(poisoned)?;
        inner.records.get(&id).cloned().ok_or(Error::NotFound(id))
    }

    fn insert(&self, draft: ApplicationDraft) -> Result<Application> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.next_id += 1;
        let record = draft.into_application(inner.next_id, Utc::now());
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    fn replace(&self, id: ApplicationId, record: &Application) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        match inner.records.get_mut(&id) {
            Some(slot) => {
                *slot = Application {
                    id,
                    ..record.clone()
                };
                Ok(())
            }
            None => Err(Error::NotFound(id)),
        }
    }

    fn delete(&self, id: ApplicationId) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::NotFound(id))
    }

    fn list_all(&self) -> Result<Vec<Application>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let mut records: Vec<Application> = inner.records.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }
}
