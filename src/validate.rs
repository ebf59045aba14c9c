//! Input validation for task payloads.
//!
//! Turns a raw JSON body into a sanitized [`NewTask`] or [`TaskPatch`], or a
//! set of per-field errors. Server-assigned fields (`id`, `owner_id`,
//! `created_at`, `updated_at`) and anything else unknown are silently
//! dropped during deserialization; they are simply not part of the payload
//! type.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::task::{NewTask, TaskPatch, TaskPriority, TaskStatus};

/// Maximum title length, in characters.
pub const TITLE_MAX: usize = 200;

/// Raw task fields as submitted by the client.
#[derive(Debug, Default, Deserialize)]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

/// Keeps an absent `due_date` distinguishable from an explicit `null`.
fn double_option<'de, D>(de: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(Some)
}

/// One message per offending field.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("validation failed")]
pub struct ValidationErrors {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

/// Deserialize a request body into a [`TaskPayload`].
///
/// A body that is not a JSON object (or carries wrongly typed fields) is a
/// validation failure like any other, reported under the `body` key.
pub fn payload_from_value(body: serde_json::Value) -> Result<TaskPayload, ValidationErrors> {
    serde_json::from_value(body).map_err(|e| ValidationErrors::single("body", e.to_string()))
}

/// Validate a creation payload into a full field set with defaults applied.
pub fn validate_create(payload: TaskPayload) -> Result<NewTask, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = match payload.title {
        Some(t) if title_in_range(&t) => t,
        Some(_) => {
            errors.push(
                "title",
                format!("title must be between 1 and {} characters", TITLE_MAX),
            );
            String::new()
        }
        None => {
            errors.push("title", "title is required");
            String::new()
        }
    };

    let status = parse_status(payload.status.as_deref(), &mut errors).unwrap_or_default();
    let priority = parse_priority(payload.priority.as_deref(), &mut errors).unwrap_or_default();
    let due_date = parse_due_date(payload.due_date, &mut errors).flatten();

    if errors.is_empty() {
        Ok(NewTask {
            title,
            description: payload.description.unwrap_or_default(),
            status,
            priority,
            due_date,
        })
    } else {
        Err(errors)
    }
}

/// Validate an update payload into a patch over the mutable fields.
///
/// Absent fields stay `None` (unchanged); present fields must pass the same
/// constraints as on create. Nothing is applied when any field fails.
pub fn validate_update(payload: TaskPayload) -> Result<TaskPatch, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = match payload.title {
        None => None,
        Some(t) if title_in_range(&t) => Some(t),
        Some(_) => {
            errors.push(
                "title",
                format!("title must be between 1 and {} characters", TITLE_MAX),
            );
            None
        }
    };

    let patch = TaskPatch {
        title,
        description: payload.description,
        status: parse_status(payload.status.as_deref(), &mut errors),
        priority: parse_priority(payload.priority.as_deref(), &mut errors),
        due_date: parse_due_date(payload.due_date, &mut errors),
    };

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

fn title_in_range(title: &str) -> bool {
    let len = title.chars().count();
    (1..=TITLE_MAX).contains(&len)
}

fn parse_status(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<TaskStatus> {
    let raw = raw?;
    match TaskStatus::parse(raw) {
        Some(status) => Some(status),
        None => {
            errors.push("status", "status must be one of todo, in_progress, completed");
            None
        }
    }
}

fn parse_priority(raw: Option<&str>, errors: &mut ValidationErrors) -> Option<TaskPriority> {
    let raw = raw?;
    match TaskPriority::parse(raw) {
        Some(priority) => Some(priority),
        None => {
            errors.push("priority", "priority must be one of low, medium, high");
            None
        }
    }
}

fn parse_due_date(
    raw: Option<Option<String>>,
    errors: &mut ValidationErrors,
) -> Option<Option<DateTime<Utc>>> {
    match raw {
        None => None,
        Some(None) => Some(None),
        Some(Some(s)) => match parse_timestamp(&s) {
            Some(dt) => Some(Some(dt)),
            None => {
                errors.push("due_date", "due_date must be an ISO 8601 timestamp");
                None
            }
        },
    }
}

/// Accepts RFC 3339, or an offset-less ISO timestamp taken as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> TaskPayload {
        payload_from_value(value).unwrap()
    }

    #[test]
    fn create_applies_defaults() {
        let new = validate_create(payload(json!({"title": "Buy milk"}))).unwrap();
        assert_eq!(new.title, "Buy milk");
        assert_eq!(new.description, "");
        assert_eq!(new.status, TaskStatus::Todo);
        assert_eq!(new.priority, TaskPriority::Medium);
        assert_eq!(new.due_date, None);
    }

    #[test]
    fn create_rejects_missing_and_empty_title() {
        let err = validate_create(payload(json!({}))).unwrap_err();
        assert!(err.contains("title"));

        let err = validate_create(payload(json!({"title": ""}))).unwrap_err();
        assert!(err.contains("title"));

        let long = "x".repeat(TITLE_MAX + 1);
        let err = validate_create(payload(json!({"title": long}))).unwrap_err();
        assert!(err.contains("title"));

        // 200 characters is still fine
        let max = "x".repeat(TITLE_MAX);
        assert!(validate_create(payload(json!({"title": max}))).is_ok());
    }

    #[test]
    fn create_rejects_bad_enums() {
        let err =
            validate_create(payload(json!({"title": "t", "status": "bogus"}))).unwrap_err();
        assert!(err.contains("status"));

        let err =
            validate_create(payload(json!({"title": "t", "priority": "urgent"}))).unwrap_err();
        assert!(err.contains("priority"));
    }

    #[test]
    fn create_collects_one_error_per_field() {
        let err = validate_create(payload(json!({
            "title": "",
            "status": "nope",
            "priority": "nope",
            "due_date": "not-a-date"
        })))
        .unwrap_err();
        assert!(err.contains("title"));
        assert!(err.contains("status"));
        assert!(err.contains("priority"));
        assert!(err.contains("due_date"));
    }

    #[test]
    fn create_parses_due_date_and_allows_null() {
        let new = validate_create(payload(json!({
            "title": "t",
            "due_date": "2026-09-01T12:00:00Z"
        })))
        .unwrap();
        assert!(new.due_date.is_some());

        let new = validate_create(payload(json!({"title": "t", "due_date": null}))).unwrap();
        assert_eq!(new.due_date, None);
    }

    #[test]
    fn due_date_without_offset_is_taken_as_utc() {
        let new = validate_create(payload(json!({
            "title": "t",
            "due_date": "2026-09-01T12:00:00"
        })))
        .unwrap();
        let explicit = validate_create(payload(json!({
            "title": "t",
            "due_date": "2026-09-01T12:00:00Z"
        })))
        .unwrap();
        assert_eq!(new.due_date, explicit.due_date);

        // Fractional seconds are fine too.
        assert!(validate_create(payload(json!({
            "title": "t",
            "due_date": "2026-09-01T12:00:00.250"
        })))
        .is_ok());
    }

    #[test]
    fn server_assigned_fields_are_ignored() {
        // id, owner_id and timestamps are not part of the payload type,
        // so a client supplying them gets them silently dropped.
        let new = validate_create(payload(json!({
            "title": "t",
            "id": 42,
            "owner_id": 999,
            "created_at": "2020-01-01T00:00:00Z",
            "unknown": "field"
        })))
        .unwrap();
        assert_eq!(new.title, "t");
    }

    #[test]
    fn update_distinguishes_absent_from_null_due_date() {
        let patch = validate_update(payload(json!({"status": "completed"}))).unwrap();
        assert_eq!(patch.due_date, None);
        assert_eq!(patch.status, Some(TaskStatus::Completed));
        assert_eq!(patch.title, None);

        let patch = validate_update(payload(json!({"due_date": null}))).unwrap();
        assert_eq!(patch.due_date, Some(None));
    }

    #[test]
    fn update_rejects_invalid_present_fields() {
        let err = validate_update(payload(json!({"title": ""}))).unwrap_err();
        assert!(err.contains("title"));

        let err = validate_update(payload(json!({"due_date": "soon"}))).unwrap_err();
        assert!(err.contains("due_date"));
    }

    #[test]
    fn non_object_body_is_a_validation_error() {
        let err = payload_from_value(json!("just a string")).unwrap_err();
        assert!(err.contains("body"));

        let err = payload_from_value(json!({"title": 42})).unwrap_err();
        assert!(err.contains("body"));
    }
}
