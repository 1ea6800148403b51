//! Filtering for list requests.
//!
//! Each filter is a linear scan that keeps input order. The working set is
//! one person's applications, so there is no index.

use chrono::NaiveDate;

use crate::models::Application;

/// Optional status filter and free-text query of a list request. Empty
/// strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub status: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    pub fn new(status: Option<&str>, q: Option<&str>) -> Self {
        Self {
            status: status.map(str::to_string),
            q: q.map(str::to_string),
        }
    }

    /// Status filter, then text search. A record has to pass both.
    pub fn apply(&self, records: Vec<Application>) -> Vec<Application> {
        let records = filter_by_status(records, self.status.as_deref());
        search_text(records, self.q.as_deref())
    }
}

/// Keeps records whose status equals `status` exactly. An unknown status
/// matches nothing.
pub fn filter_by_status(records: Vec<Application>, status: Option<&str>) -> Vec<Application> {
    match status {
        None | Some("") => records,
        Some(status) => records
            .into_iter()
            .filter(|r| r.status.as_str() == status)
            .collect(),
    }
}

/// Case-insensitive substring match over company, position, notes and tags.
pub fn search_text(records: Vec<Application>, query: Option<&str>) -> Vec<Application> {
    let needle = match query {
        None | Some("") => return records,
        Some(q) => q.to_lowercase(),
    };

    records
        .into_iter()
        .filter(|r| matches_text(r, &needle))
        .collect()
}

fn matches_text(record: &Application, needle: &str) -> bool {
    let hit = |s: &str| s.to_lowercase().contains(needle);

    hit(&record.company)
        || hit(&record.position)
        || record.notes.as_deref().is_some_and(hit)
        || record.tags.iter().any(|t| hit(t))
}

/// Open applications whose follow-up date is on or before `today`.
pub fn due_for_follow_up(records: Vec<Application>, today: NaiveDate) -> Vec<Application> {
    records
        .into_iter()
        .filter(|r| r.status.is_open())
        .filter(|r| r.follow_up_date.is_some_and(|d| d <= today))
        .collect()
}
