//! Pipeline status and priority.
//!
//! Any status may move to any other status. Hiring processes reopen, ghost
//! and then reject, or skip stages, so the only rule enforced here is that a
//! value belongs to the enumerated set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Saved,
    #[default]
    Applied,
    Interviewing,
    Offer,
    Rejected,
    Ghosted,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::Saved,
        Status::Applied,
        Status::Interviewing,
        Status::Offer,
        Status::Rejected,
        Status::Ghosted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Saved => "saved",
            Status::Applied => "applied",
            Status::Interviewing => "interviewing",
            Status::Offer => "offer",
            Status::Rejected => "rejected",
            Status::Ghosted => "ghosted",
        }
    }

    /// Still waiting on a next step from either side.
    pub fn is_open(&self) -> bool {
        matches!(self, Status::Saved | Status::Applied | Status::Interviewing)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    // Exact match: "Applied" is not a status.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|priority| priority.as_str() == s)
            .ok_or_else(|| Error::InvalidPriority(s.to_string()))
    }
}

pub fn is_valid_status(value: &str) -> bool {
    value.parse::<Status>().is_ok()
}

pub fn is_valid_priority(value: &str) -> bool {
    value.parse::<Priority>().is_ok()
}

/// Moves from `current` to `next`. Every pair of statuses is a legal
/// transition, including staying put.
pub fn transition(current: Status, next: &str) -> Result<Status, Error> {
    let next = next.parse::<Status>()?;
    if next != current {
        tracing::debug!(from = %current, to = %next, "status transition");
    }
    Ok(next)
}

pub fn parse_priority(value: &str) -> Result<Priority, Error> {
    value.parse()
}
