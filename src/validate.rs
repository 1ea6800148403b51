//! Validation and normalization of inbound payloads.
//!
//! Every check runs before anything is reported, so a caller sees the full
//! list of bad fields from one submission.

use chrono::{NaiveDate, Utc};
use std::collections::HashSet;

use crate::error::{FieldError, ValidationError};
use crate::models::{
    Application, ApplicationDraft, ApplicationInput, ApplicationPatch, TagsInput,
};
use crate::status::{self, Priority, Status};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Trims every text field, turns blank optional text and blank dates into
/// unset, and flattens tags into a clean list.
pub fn normalize(input: ApplicationInput) -> ApplicationInput {
    ApplicationInput {
        company: input.company.map(|s| s.trim().to_string()),
        position: input.position.map(|s| s.trim().to_string()),
        location: clean_text(input.location),
        job_link: clean_text(input.job_link),
        source: clean_text(input.source),
        status: clean_text(input.status),
        applied_date: clean_text(input.applied_date),
        follow_up_date: clean_text(input.follow_up_date),
        salary_min: input.salary_min,
        salary_max: input.salary_max,
        contact_name: clean_text(input.contact_name),
        contact_email: clean_text(input.contact_email),
        resume_version: clean_text(input.resume_version),
        priority: clean_text(input.priority),
        tags: Some(TagsInput::List(normalize_tags(
            input.tags.unwrap_or_default(),
        ))),
        notes: clean_text(input.notes),
    }
}

/// Splits, trims and dedupes tags, keeping first-seen order. Running it on
/// its own output changes nothing.
pub fn normalize_tags(tags: TagsInput) -> Vec<String> {
    let raw: Vec<String> = match tags {
        TagsInput::List(list) => list,
        TagsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };

    let mut seen = HashSet::new();
    raw.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn validate_create(input: ApplicationInput) -> Result<ApplicationDraft, ValidationError> {
    let input = normalize(input);
    let mut errors = Vec::new();

    let company = required_text("company", input.company, &mut errors);
    let position = required_text("position", input.position, &mut errors);

    let status = match input.status.as_deref() {
        None => Status::default(),
        Some(v) => parse_status(v, &mut errors).unwrap_or_default(),
    };
    let priority = match input.priority.as_deref() {
        None => Priority::default(),
        Some(v) => parse_priority(v, &mut errors).unwrap_or_default(),
    };

    let applied_date = parse_date("applied_date", input.applied_date.as_deref(), &mut errors);
    let follow_up_date =
        parse_date("follow_up_date", input.follow_up_date.as_deref(), &mut errors);

    let salary_min = check_salary("salary_min", input.salary_min, &mut errors);
    let salary_max = check_salary("salary_max", input.salary_max, &mut errors);
    check_salary_range(salary_min, salary_max, &mut errors);

    let tags = match input.tags {
        Some(TagsInput::List(tags)) => tags,
        _ => Vec::new(),
    };

    finish(errors)?;

    Ok(ApplicationDraft {
        company,
        position,
        location: input.location,
        job_link: input.job_link,
        source: input.source,
        status,
        applied_date,
        follow_up_date,
        salary_min,
        salary_max,
        contact_name: input.contact_name,
        contact_email: input.contact_email,
        resume_version: input.resume_version,
        priority,
        tags,
        notes: input.notes,
    })
}

/// Merges `patch` into a copy of `existing`. Only fields present in the patch
/// change; the merged record is then checked as a whole and `updated_at`
/// moves forward. `existing` is never touched.
pub fn apply_patch(
    existing: &Application,
    patch: &ApplicationPatch,
) -> Result<Application, ValidationError> {
    let mut next = existing.clone();
    let mut errors = Vec::new();

    if let Some(value) = &patch.company {
        match value {
            Some(v) => {
                let v = v.trim();
                if v.is_empty() {
                    errors.push(field_error("company", "must not be empty"));
                } else {
                    next.company = v.to_string();
                }
            }
            None => errors.push(field_error("company", "is required and cannot be cleared")),
        }
    }
    if let Some(value) = &patch.position {
        match value {
            Some(v) => {
                let v = v.trim();
                if v.is_empty() {
                    errors.push(field_error("position", "must not be empty"));
                } else {
                    next.position = v.to_string();
                }
            }
            None => errors.push(field_error("position", "is required and cannot be cleared")),
        }
    }

    if let Some(value) = &patch.status {
        match value.as_deref().map(str::trim) {
            Some(v) => match status::transition(existing.status, v) {
                Ok(status) => next.status = status,
                Err(_) => errors.push(status_error(v)),
            },
            None => errors.push(field_error("status", "is required and cannot be cleared")),
        }
    }
    if let Some(value) = &patch.priority {
        match value.as_deref().map(str::trim) {
            Some(v) => {
                if let Some(priority) = parse_priority(v, &mut errors) {
                    next.priority = priority;
                }
            }
            None => errors.push(field_error("priority", "is required and cannot be cleared")),
        }
    }

    patch_text(&mut next.location, &patch.location);
    patch_text(&mut next.job_link, &patch.job_link);
    patch_text(&mut next.source, &patch.source);
    patch_text(&mut next.contact_name, &patch.contact_name);
    patch_text(&mut next.contact_email, &patch.contact_email);
    patch_text(&mut next.resume_version, &patch.resume_version);
    patch_text(&mut next.notes, &patch.notes);

    patch_date(&mut next.applied_date, "applied_date", &patch.applied_date, &mut errors);
    patch_date(&mut next.follow_up_date, "follow_up_date", &patch.follow_up_date, &mut errors);

    if let Some(value) = patch.salary_min {
        if value.is_none() || check_salary("salary_min", value, &mut errors).is_some() {
            next.salary_min = value;
        }
    }
    if let Some(value) = patch.salary_max {
        if value.is_none() || check_salary("salary_max", value, &mut errors).is_some() {
            next.salary_max = value;
        }
    }

    if let Some(value) = &patch.tags {
        match value {
            Some(tags) => next.tags = normalize_tags(tags.clone()),
            None => errors.push(field_error("tags", "is required and cannot be cleared")),
        }
    }

    check_record(&next, &mut errors);
    finish(errors)?;

    next.updated_at = Utc::now().max(existing.updated_at);
    Ok(next)
}

/// Invariants every stored record satisfies, whatever path produced it.
fn check_record(record: &Application, errors: &mut Vec<FieldError>) {
    if record.company.trim().is_empty() && !has_error(errors, "company") {
        errors.push(field_error("company", "must not be empty"));
    }
    if record.position.trim().is_empty() && !has_error(errors, "position") {
        errors.push(field_error("position", "must not be empty"));
    }
    if !has_error(errors, "salary_min") && !has_error(errors, "salary_max") {
        check_salary_range(record.salary_min, record.salary_max, errors);
    }
    if normalize_tags(TagsInput::List(record.tags.clone())) != record.tags {
        errors.push(field_error("tags", "must be trimmed, non-empty and unique"));
    }
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn patch_text(target: &mut Option<String>, value: &Option<Option<String>>) {
    if let Some(value) = value {
        *target = clean_text(value.clone());
    }
}

fn patch_date(
    target: &mut Option<NaiveDate>,
    field: &'static str,
    value: &Option<Option<String>>,
    errors: &mut Vec<FieldError>,
) {
    let Some(value) = value else { return };
    let raw = clean_text(value.clone());
    match raw.as_deref() {
        None => *target = None,
        Some(v) => {
            if let Some(date) = parse_date(field, Some(v), errors) {
                *target = Some(date);
            }
        }
    }
}

fn required_text(
    field: &'static str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        Some(_) => {
            errors.push(field_error(field, "must not be empty"));
            String::new()
        }
        None => {
            errors.push(field_error(field, "is required"));
            String::new()
        }
    }
}

fn parse_status(value: &str, errors: &mut Vec<FieldError>) -> Option<Status> {
    match value.parse::<Status>() {
        Ok(status) => Some(status),
        Err(_) => {
            errors.push(status_error(value));
            None
        }
    }
}

fn parse_priority(value: &str, errors: &mut Vec<FieldError>) -> Option<Priority> {
    match status::parse_priority(value) {
        Ok(priority) => Some(priority),
        Err(_) => {
            let allowed: Vec<&str> = Priority::ALL.iter().map(Priority::as_str).collect();
            errors.push(field_error(
                "priority",
                format!("'{}' is not one of {}", value, allowed.join(", ")),
            ));
            None
        }
    }
}

fn status_error(value: &str) -> FieldError {
    let allowed: Vec<&str> = Status::ALL.iter().map(Status::as_str).collect();
    field_error(
        "status",
        format!("'{}' is not one of {}", value, allowed.join(", ")),
    )
}

fn parse_date(
    field: &'static str,
    value: Option<&str>,
    errors: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    let value = value?;
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(field_error(
                field,
                format!("'{}' is not a date (expected YYYY-MM-DD)", value),
            ));
            None
        }
    }
}

fn check_salary(
    field: &'static str,
    value: Option<f64>,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    match value {
        Some(v) if !v.is_finite() => {
            errors.push(field_error(field, format!("must be a finite number (got {})", v)));
            None
        }
        Some(v) if v < 0.0 => {
            errors.push(field_error(field, format!("must not be negative (got {})", v)));
            None
        }
        other => other,
    }
}

// An out-of-order pair is rejected, never swapped.
fn check_salary_range(min: Option<f64>, max: Option<f64>, errors: &mut Vec<FieldError>) {
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push(field_error(
                "salary_min",
                format!("{} is greater than salary_max {}", min, max),
            ));
            errors.push(field_error(
                "salary_max",
                format!("{} is less than salary_min {}", max, min),
            ));
        }
    }
}

fn has_error(errors: &[FieldError], field: &str) -> bool {
    errors.iter().any(|e| e.field == field)
}

fn field_error(field: &'static str, message: impl Into<String>) -> FieldError {
    FieldError {
        field,
        message: message.into(),
    }
}

fn finish(errors: Vec<FieldError>) -> Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { errors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn input(company: &str, position: &str) -> ApplicationInput {
        ApplicationInput {
            company: Some(company.to_string()),
            position: Some(position.to_string()),
            ..Default::default()
        }
    }

    fn stored(draft: ApplicationDraft) -> Application {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        draft.into_application(7, created)
    }

    #[test]
    fn test_create_applies_defaults() {
        let draft = validate_create(input("Acme", "Engineer")).unwrap();
        assert_eq!(draft.status, Status::Applied);
        assert_eq!(draft.priority, Priority::Medium);
        assert!(draft.tags.is_empty());
        assert_eq!(draft.salary_min, None);
        assert_eq!(draft.applied_date, None);
    }

    #[test]
    fn test_create_trims_and_unsets_blank_optionals() {
        let mut payload = input("  Acme Corp ", "\tEngineer\n");
        payload.location = Some("   ".to_string());
        payload.source = Some(" referral ".to_string());
        payload.applied_date = Some(String::new());
        payload.notes = Some("".to_string());

        let draft = validate_create(payload).unwrap();
        assert_eq!(draft.company, "Acme Corp");
        assert_eq!(draft.position, "Engineer");
        assert_eq!(draft.location, None);
        assert_eq!(draft.source.as_deref(), Some("referral"));
        assert_eq!(draft.applied_date, None);
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn test_create_collects_every_violation() {
        let payload = ApplicationInput {
            company: Some("  ".to_string()),
            position: None,
            status: Some("hired".to_string()),
            priority: Some("critical".to_string()),
            applied_date: Some("03/01/2024".to_string()),
            follow_up_date: Some("2024-02-30".to_string()),
            salary_min: Some(-5.0),
            ..Default::default()
        };

        let err = validate_create(payload).unwrap_err();
        for field in [
            "company",
            "position",
            "status",
            "priority",
            "applied_date",
            "follow_up_date",
            "salary_min",
        ] {
            assert!(err.has_field(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_salary_order_is_checked_not_swapped() {
        let mut payload = input("Acme", "Engineer");
        payload.salary_min = Some(100.0);
        payload.salary_max = Some(50.0);
        let err = validate_create(payload).unwrap_err();
        assert!(err.has_field("salary_min"));
        assert!(err.has_field("salary_max"));

        let mut payload = input("Acme", "Engineer");
        payload.salary_min = Some(50.0);
        payload.salary_max = Some(100.0);
        let draft = validate_create(payload).unwrap();
        assert_eq!((draft.salary_min, draft.salary_max), (Some(50.0), Some(100.0)));
    }

    #[test]
    fn test_zero_salary_is_not_unset() {
        let mut payload = input("Acme", "Engineer");
        payload.salary_min = Some(0.0);
        let draft = validate_create(payload).unwrap();
        assert_eq!(draft.salary_min, Some(0.0));
    }

    #[test]
    fn test_csv_tags_are_split_and_deduped() {
        let mut payload = input("Acme", "Engineer");
        payload.tags = Some(TagsInput::Csv("x, y, x".to_string()));
        let draft = validate_create(payload).unwrap();
        assert_eq!(draft.tags, vec!["x", "y"]);
    }

    #[test]
    fn test_normalize_tags_drops_blanks_and_keeps_case() {
        let tags = normalize_tags(TagsInput::Csv(" rust,, Rust ,rust, ,remote".to_string()));
        assert_eq!(tags, vec!["rust", "Rust", "remote"]);
    }

    #[test]
    fn test_normalize_tags_is_idempotent() {
        let once = normalize_tags(TagsInput::List(vec![
            " b ".to_string(),
            "a".to_string(),
            "".to_string(),
            "b".to_string(),
        ]));
        let twice = normalize_tags(TagsInput::List(once.clone()));
        assert_eq!(once, vec!["b", "a"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_patch_touches_only_present_fields() {
        let mut payload = input("Acme", "Engineer");
        payload.location = Some("Remote".to_string());
        payload.notes = Some("phone screen booked".to_string());
        let existing = stored(validate_create(payload).unwrap());

        let patch = ApplicationPatch {
            status: Some(Some("interviewing".to_string())),
            location: Some(None),
            ..Default::default()
        };
        let updated = apply_patch(&existing, &patch).unwrap();

        assert_eq!(updated.status, Status::Interviewing);
        assert_eq!(updated.location, None);
        assert_eq!(updated.notes.as_deref(), Some("phone screen booked"));
        assert_eq!(updated.company, "Acme");
        assert_eq!(updated.id, existing.id);
        assert_eq!(updated.created_at, existing.created_at);
        assert!(updated.updated_at >= existing.updated_at);
    }

    #[test]
    fn test_patch_checks_salary_against_existing_value() {
        let mut payload = input("Acme", "Engineer");
        payload.salary_min = Some(120_000.0);
        let existing = stored(validate_create(payload).unwrap());

        let patch = ApplicationPatch {
            salary_max: Some(Some(90_000.0)),
            ..Default::default()
        };
        let err = apply_patch(&existing, &patch).unwrap_err();
        assert!(err.has_field("salary_max"));

        let patch = ApplicationPatch {
            salary_max: Some(Some(150_000.0)),
            ..Default::default()
        };
        let updated = apply_patch(&existing, &patch).unwrap();
        assert_eq!(updated.salary_max, Some(150_000.0));
    }

    #[test]
    fn test_patch_rejects_unknown_status_and_priority() {
        let existing = stored(validate_create(input("Acme", "Engineer")).unwrap());
        let patch = ApplicationPatch {
            status: Some(Some("hired".to_string())),
            priority: Some(Some("asap".to_string())),
            ..Default::default()
        };
        let err = apply_patch(&existing, &patch).unwrap_err();
        assert!(err.has_field("status"));
        assert!(err.has_field("priority"));
        assert_eq!(existing.status, Status::Applied);
    }

    #[test]
    fn test_patch_cannot_clear_required_fields() {
        let existing = stored(validate_create(input("Acme", "Engineer")).unwrap());
        let patch = ApplicationPatch {
            company: Some(None),
            position: Some(Some("   ".to_string())),
            ..Default::default()
        };
        let err = apply_patch(&existing, &patch).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert!(err.has_field("company"));
        assert!(err.has_field("position"));
    }

    #[test]
    fn test_patch_null_tags_is_rejected_but_empty_list_is_allowed() {
        let mut payload = input("Acme", "Engineer");
        payload.tags = Some(TagsInput::Csv("x, y".to_string()));
        let existing = stored(validate_create(payload).unwrap());

        let patch: ApplicationPatch = serde_json::from_str(r#"{"tags": null}"#).unwrap();
        let err = apply_patch(&existing, &patch).unwrap_err();
        assert!(err.has_field("tags"));
        assert_eq!(existing.tags, vec!["x", "y"]);

        let mut patch = ApplicationPatch::default();
        assert!(patch.clear("tags"));
        let updated = apply_patch(&existing, &patch).unwrap();
        assert!(updated.tags.is_empty());
    }

    #[test]
    fn test_fractional_salary_is_accepted() {
        let payload: ApplicationInput = serde_json::from_str(
            r#"{"company": "Acme", "position": "Engineer", "salary_min": 85000.5, "salary_max": 90000}"#,
        )
        .unwrap();
        let draft = validate_create(payload).unwrap();
        assert_eq!(draft.salary_min, Some(85000.5));
        assert_eq!(draft.salary_max, Some(90000.0));

        let payload: ApplicationInput = serde_json::from_str(
            r#"{"company": "Acme", "position": "Engineer", "salary_min": 90000.5, "salary_max": 90000.25}"#,
        )
        .unwrap();
        let err = validate_create(payload).unwrap_err();
        assert!(err.has_field("salary_min"));
        assert!(err.has_field("salary_max"));
    }

    #[test]
    fn test_non_finite_salary_is_a_field_error() {
        let mut payload = input("Acme", "Engineer");
        payload.salary_max = Some(f64::NAN);
        payload.position = None;
        let err = validate_create(payload).unwrap_err();
        assert!(err.has_field("salary_max"));
        assert!(err.has_field("position"));
    }

    #[test]
    fn test_patch_dates_and_tags() {
        let existing = stored(validate_create(input("Acme", "Engineer")).unwrap());
        let patch = ApplicationPatch {
            follow_up_date: Some(Some("2024-03-15".to_string())),
            tags: Some(Some(TagsInput::Csv("remote, rust, remote".to_string()))),
            ..Default::default()
        };
        let updated = apply_patch(&existing, &patch).unwrap();
        assert_eq!(
            updated.follow_up_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(updated.tags, vec!["remote", "rust"]);

        let patch = ApplicationPatch {
            follow_up_date: Some(Some("soon".to_string())),
            ..Default::default()
        };
        assert!(apply_patch(&updated, &patch).unwrap_err().has_field("follow_up_date"));
    }

    #[test]
    fn test_patch_never_moves_updated_at_backwards() {
        let mut existing = stored(validate_create(input("Acme", "Engineer")).unwrap());
        existing.updated_at = Utc::now() + Duration::hours(1);
        let updated = apply_patch(&existing, &ApplicationPatch::default()).unwrap();
        assert_eq!(updated.updated_at, existing.updated_at);
    }
}
