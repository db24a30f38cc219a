//! Delegation: promote knowledge from a lower context tier to a higher one.
//!
//! Delegations are appended synchronously and applied by a per-user serial
//! worker, so cause-and-effect stays ordered without global locking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::context::{ensure_map, ContextLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStatus {
    Pending,
    Processed,
    Failed,
}

impl DelegationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delegation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_level: ContextLevel,
    pub source_id: Uuid,
    pub target_level: ContextLevel,
    pub payload: Value,
    pub status: DelegationStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Delegation {
    pub fn new(
        user_id: Uuid,
        source_level: ContextLevel,
        source_id: Uuid,
        target_level: ContextLevel,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            source_level,
            source_id,
            target_level,
            payload: ensure_map(payload),
            status: DelegationStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Delegation only promotes upward: the target tier must be a strict
    /// ancestor of the source tier.
    pub fn validate(&self) -> Result<(), String> {
        if self.target_level >= self.source_level {
            return Err(format!(
                "delegation target tier '{}' must be above source tier '{}'",
                self.target_level.as_str(),
                self.source_level.as_str()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delegation_must_promote_upward() {
        let up = Delegation::new(
            Uuid::new_v4(),
            ContextLevel::Task,
            Uuid::new_v4(),
            ContextLevel::Project,
            serde_json::json!({"lesson": "cache the JWKS"}),
        );
        assert!(up.validate().is_ok());

        let sideways = Delegation::new(
            Uuid::new_v4(),
            ContextLevel::Branch,
            Uuid::new_v4(),
            ContextLevel::Branch,
            Value::Null,
        );
        assert!(sideways.validate().is_err());

        let down = Delegation::new(
            Uuid::new_v4(),
            ContextLevel::Project,
            Uuid::new_v4(),
            ContextLevel::Task,
            Value::Null,
        );
        assert!(down.validate().is_err());
    }

    #[test]
    fn null_payload_becomes_empty_map() {
        let d = Delegation::new(
            Uuid::new_v4(),
            ContextLevel::Task,
            Uuid::new_v4(),
            ContextLevel::Global,
            Value::Null,
        );
        assert!(d.payload.is_object());
    }
}
