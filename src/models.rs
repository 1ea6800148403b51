use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::status::{Priority, Status};

pub type ApplicationId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub job_link: Option<String>,
    pub source: Option<String>,
    pub status: Status,
    pub applied_date: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub resume_version: Option<String>,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated application that has not been stored yet.
///
/// Storage assigns `id`, `created_at` and `updated_at` when it inserts one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationDraft {
    pub company: String,
    pub position: String,
    pub location: Option<String>,
    pub job_link: Option<String>,
    pub source: Option<String>,
    pub status: Status,
    pub applied_date: Option<NaiveDate>,
    pub follow_up_date: Option<NaiveDate>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub resume_version: Option<String>,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl ApplicationDraft {
    pub fn into_application(
        self,
        id: ApplicationId,
        created_at: DateTime<Utc>,
    ) -> Application {
        Application {
            id,
            company: self.company,
            position: self.position,
            location: self.location,
            job_link: self.job_link,
            source: self.source,
            status: self.status,
            applied_date: self.applied_date,
            follow_up_date: self.follow_up_date,
            salary_min: self.salary_min,
            salary_max: self.salary_max,
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            resume_version: self.resume_version,
            priority: self.priority,
            tags: self.tags,
            notes: self.notes,
            created_at,
            updated_at: created_at,
        }
    }
}

/// Tags as submitted: either a list or one comma separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl Default for TagsInput {
    fn default() -> Self {
        TagsInput::List(Vec::new())
    }
}

/// Raw create payload. Status, priority and dates stay as text here so that
/// every bad value can be reported at once instead of failing on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationInput {
    pub company: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub job_link: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub applied_date: Option<String>,
    pub follow_up_date: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub resume_version: Option<String>,
    pub priority: Option<String>,
    pub tags: Option<TagsInput>,
    pub notes: Option<String>,
}

/// Partial update.
///
/// Outer `None` leaves a field alone, `Some(None)` (JSON `null`) clears it,
/// `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApplicationPatch {
    #[serde(deserialize_with = "present")]
    pub company: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub position: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub location: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub job_link: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub source: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub status: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub applied_date: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub follow_up_date: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub salary_min: Option<Option<f64>>,
    #[serde(deserialize_with = "present")]
    pub salary_max: Option<Option<f64>>,
    #[serde(deserialize_with = "present")]
    pub contact_name: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub contact_email: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub resume_version: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub priority: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub tags: Option<Option<TagsInput>>,
    #[serde(deserialize_with = "present")]
    pub notes: Option<Option<String>>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        *self == ApplicationPatch::default()
    }

    /// Clears an optional field by name. Returns false for unknown or
    /// required fields.
    pub fn clear(&mut self, field: &str) -> bool {
        match field {
            "location" => self.location = Some(None),
            "job_link" => self.job_link = Some(None),
            "source" => self.source = Some(None),
            "applied_date" => self.applied_date = Some(None),
            "follow_up_date" => self.follow_up_date = Some(None),
            "salary_min" => self.salary_min = Some(None),
            "salary_max" => self.salary_max = Some(None),
            "contact_name" => self.contact_name = Some(None),
            "contact_email" => self.contact_email = Some(None),
            "resume_version" => self.resume_version = Some(None),
            "tags" => self.tags = Some(Some(TagsInput::default())),
            "notes" => self.notes = Some(None),
            _ => return false,
        }
        true
    }
}

// A field that is present maps to Some, even when its value is null.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
