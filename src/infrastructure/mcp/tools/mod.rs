//! Tool catalog: schemas and handlers for every exposed tool.

pub mod agent;
pub mod context;
pub mod dependency;
pub mod git_branch;
pub mod project;
pub mod subtask;
pub mod task;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{parse_id, TaskPriority, TaskStatus};

use super::coerce::ToolSpec;

/// Every tool the server can expose, in advertisement order.
pub fn all_specs() -> Vec<&'static ToolSpec> {
    vec![
        &project::SPEC,
        &git_branch::SPEC,
        &task::SPEC,
        &subtask::SPEC,
        &context::SPEC,
        &dependency::SPEC,
        &agent::MANAGE_SPEC,
        &agent::CALL_SPEC,
    ]
}

// --- shared argument helpers -------------------------------------------------

pub(crate) fn require_str<'a>(args: &'a Map<String, Value>, field: &'static str) -> DomainResult<&'a str> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| DomainError::missing_field(field))
}

pub(crate) fn opt_str<'a>(args: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

pub(crate) fn require_id(args: &Map<String, Value>, field: &'static str) -> DomainResult<Uuid> {
    let raw = require_str(args, field)?;
    parse_id(field, raw)
}

pub(crate) fn opt_id(args: &Map<String, Value>, field: &'static str) -> DomainResult<Option<Uuid>> {
    match opt_str(args, field) {
        Some(raw) => parse_id(field, raw).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn opt_string_array(
    args: &Map<String, Value>,
    field: &'static str,
) -> DomainResult<Option<Vec<String>>> {
    let Some(value) = args.get(field) else {
        return Ok(None);
    };
    let Value::Array(items) = value else {
        return Err(DomainError::Validation(format!("field '{field}' must be an array")));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(s) => out.push(s.to_string()),
            None => {
                return Err(DomainError::Validation(format!(
                    "field '{field}' must contain only strings"
                )))
            }
        }
    }
    Ok(Some(out))
}

pub(crate) fn opt_id_array(
    args: &Map<String, Value>,
    field: &'static str,
) -> DomainResult<Option<Vec<Uuid>>> {
    match opt_string_array(args, field)? {
        Some(raw) => raw
            .iter()
            .map(|s| parse_id(field, s))
            .collect::<DomainResult<Vec<_>>>()
            .map(Some),
        None => Ok(None),
    }
}

pub(crate) fn opt_u8(args: &Map<String, Value>, field: &'static str) -> DomainResult<Option<u8>> {
    match args.get(field).and_then(Value::as_i64) {
        Some(n) => u8::try_from(n)
            .map(Some)
            .map_err(|_| DomainError::Validation(format!("field '{field}' out of range 0..=100"))),
        None => Ok(None),
    }
}

pub(crate) fn opt_i64(args: &Map<String, Value>, field: &str) -> Option<i64> {
    args.get(field).and_then(Value::as_i64)
}

pub(crate) fn opt_bool(args: &Map<String, Value>, field: &str) -> Option<bool> {
    args.get(field).and_then(Value::as_bool)
}

pub(crate) fn opt_object(args: &Map<String, Value>, field: &str) -> Option<Value> {
    args.get(field).filter(|v| v.is_object()).cloned()
}

pub(crate) fn parse_status(raw: &str) -> DomainResult<TaskStatus> {
    TaskStatus::from_str(raw).ok_or_else(|| {
        DomainError::Validation(format!(
            "invalid status '{raw}'; expected one of: todo, in_progress, blocked, done, cancelled"
        ))
    })
}

pub(crate) fn parse_priority(raw: &str) -> DomainResult<TaskPriority> {
    TaskPriority::from_str(raw).ok_or_else(|| {
        DomainError::Validation(format!(
            "invalid priority '{raw}'; expected one of: low, medium, high, critical"
        ))
    })
}

/// Accept RFC3339 timestamps or bare `YYYY-MM-DD` dates.
pub(crate) fn parse_due_date(raw: &str) -> DomainResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(DomainError::invalid_format("due_date", raw))
}

pub(crate) fn unknown_action(tool: &str, action: &str, allowed: &[&str]) -> DomainError {
    DomainError::Validation(format!(
        "unknown action '{action}' for {tool}; allowed actions: {}",
        allowed.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn due_date_accepts_both_formats() {
        assert!(parse_due_date("2026-03-01").is_ok());
        assert!(parse_due_date("2026-03-01T12:30:00Z").is_ok());
        assert_eq!(parse_due_date("next tuesday").unwrap_err().code(), "INVALID_FORMAT");
    }

    #[test]
    fn id_helpers_normalize_compact_form() {
        let id = Uuid::new_v4();
        let compact = id.simple().to_string();
        let map = args(json!({ "task_id": compact }));
        assert_eq!(require_id(&map, "task_id").unwrap(), id);
    }

    #[test]
    fn string_array_rejects_mixed_content() {
        let map = args(json!({ "assignees": ["a", 3] }));
        assert!(opt_string_array(&map, "assignees").is_err());
    }

    #[test]
    fn status_parse_lists_valid_values_in_error() {
        let err = parse_status("sleeping").unwrap_err();
        assert!(err.to_string().contains("in_progress"));
    }
}
