//! The standard response envelope every tool call returns.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
    Warning,
    Partial,
}

#[derive(Debug, Clone, Serialize)]
pub struct StandardResponse {
    pub status: ResponseStatus,
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

impl StandardResponse {
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            status: ResponseStatus::Success,
            success: true,
            message: message.into(),
            data: Some(data),
            error_code: None,
            details: None,
            timestamp: now(),
        }
    }

    /// Operation succeeded, but the caller should look at `details`.
    pub fn warning(message: impl Into<String>, data: Value, details: Value) -> Self {
        Self {
            status: ResponseStatus::Warning,
            success: true,
            message: message.into(),
            data: Some(data),
            error_code: None,
            details: Some(details),
            timestamp: now(),
        }
    }

    /// Some items succeeded, some failed. Never reported as plain success.
    pub fn partial(message: impl Into<String>, data: Value, details: Value) -> Self {
        Self {
            status: ResponseStatus::Partial,
            success: false,
            message: message.into(),
            data: Some(data),
            error_code: None,
            details: Some(details),
            timestamp: now(),
        }
    }

    /// Shape a domain error. Internal causes are logged under the
    /// correlation id and never surfaced to the caller.
    pub fn from_error(err: &DomainError, correlation_id: Uuid) -> Self {
        let (message, details) = if err.is_internal() {
            tracing::error!(correlation_id = %correlation_id, error = %err, "Internal error");
            (
                "An internal error occurred".to_string(),
                json!({ "correlation_id": correlation_id }),
            )
        } else {
            (err.to_string(), error_details(err))
        };

        Self {
            status: ResponseStatus::Error,
            success: false,
            message,
            data: None,
            error_code: Some(err.code().to_string()),
            details: Some(details),
            timestamp: now(),
        }
    }
}

fn error_details(err: &DomainError) -> Value {
    match err {
        DomainError::InvalidFormat { field, value } => json!({
            "field": field,
            "value": value,
            "accepted_formats": [
                "canonical UUID (xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx)",
                "compact UUID (32 hex digits)"
            ],
        }),
        DomainError::MissingField { field } => json!({ "field": field }),
        DomainError::NotFound { entity, id } => json!({ "entity": entity, "id": id }),
        _ => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape() {
        let resp = StandardResponse::success("ok", json!({"x": 1}));
        assert!(resp.success);
        assert_eq!(resp.status, ResponseStatus::Success);
        assert!(resp.error_code.is_none());
    }

    #[test]
    fn error_carries_stable_code() {
        let err = DomainError::not_found("Task", "abc");
        let resp = StandardResponse::from_error(&err, Uuid::new_v4());
        assert!(!resp.success);
        assert_eq!(resp.error_code.as_deref(), Some("NOT_FOUND"));
        assert_eq!(resp.details.unwrap()["entity"], "Task");
    }

    #[test]
    fn internal_errors_hide_cause_and_expose_correlation_id() {
        let correlation_id = Uuid::new_v4();
        let err = DomainError::Database("secret table exploded".to_string());
        let resp = StandardResponse::from_error(&err, correlation_id);
        assert!(!resp.message.contains("secret"));
        assert_eq!(
            resp.details.unwrap()["correlation_id"],
            json!(correlation_id)
        );
    }

    #[test]
    fn partial_is_never_success() {
        let resp = StandardResponse::partial("3 of 5", json!({}), json!({"failed": 2}));
        assert!(!resp.success);
        assert_eq!(resp.status, ResponseStatus::Partial);
    }
}
