use chrono::{NaiveDate, Utc};

use crate::error::Result;
use crate::models::{Application, ApplicationId, ApplicationInput, ApplicationPatch};
use crate::query::{due_for_follow_up, ListQuery};
use crate::status;
use crate::store::Store;
use crate::validate::{apply_patch, validate_create};

/// Entry point for the transport layer. Holds no state of its own; every
/// record lives in the store.
pub struct ApplicationService<S> {
    store: S,
}

impl<S: Store> ApplicationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create(&self, input: ApplicationInput) -> Result<Application> {
        let draft = validate_create(input).inspect_err(|e| {
            tracing::warn!(errors = e.errors.len(), "rejected new application: {}", e);
        })?;
        let record = self.store.insert(draft)?;
        tracing::info!(id = record.id, company = %record.company, "created application");
        Ok(record)
    }

    pub fn get(&self, id: ApplicationId) -> Result<Application> {
        self.store.get(id)
    }

    /// Newest first, narrowed by the optional status and text filters.
    pub fn list(&self, status: Option<&str>, query: Option<&str>) -> Result<Vec<Application>> {
        let records = self.store.list_all()?;
        let total = records.len();
        let matched = ListQuery::new(status, query).apply(records);
        tracing::debug!(total, matched = matched.len(), ?status, ?query, "listed applications");
        Ok(matched)
    }

    pub fn update(&self, id: ApplicationId, patch: &ApplicationPatch) -> Result<Application> {
        let existing = self.store.get(id)?;
        let updated = apply_patch(&existing, patch).inspect_err(|e| {
            tracing::warn!(id, "rejected update: {}", e);
        })?;
        self.store.replace(id, &updated)?;
        tracing::info!(id, status = %updated.status, "updated application");
        Ok(updated)
    }

    /// Quick status change. Unlike a patch, an unknown value surfaces as
    /// `InvalidStatus` rather than a field error.
    pub fn set_status(&self, id: ApplicationId, value: &str) -> Result<Application> {
        let mut record = self.store.get(id)?;
        let next = status::transition(record.status, value)?;
        if next == record.status {
            return Ok(record);
        }
        record.status = next;
        record.updated_at = Utc::now().max(record.updated_at);
        self.store.replace(id, &record)?;
        tracing::info!(id, status = %next, "changed status");
        Ok(record)
    }

    pub fn remove(&self, id: ApplicationId) -> Result<()> {
        self.store.delete(id)?;
        tracing::info!(id, "removed application");
        Ok(())
    }

    pub fn follow_ups(&self, today: NaiveDate) -> Result<Vec<Application>> {
        Ok(due_for_follow_up(self.store.list_all()?, today))
    }
}
