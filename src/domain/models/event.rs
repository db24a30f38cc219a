//! Change events emitted by use cases and fanned out through the
//! notification sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Branch,
    Task,
    Subtask,
    Context,
    Agent,
    Dependency,
    Delegation,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Branch => "branch",
            Self::Task => "task",
            Self::Subtask => "subtask",
            Self::Context => "context",
            Self::Agent => "agent",
            Self::Dependency => "dependency",
            Self::Delegation => "delegation",
        }
    }
}

/// A fire-and-forget change notification. Delivery is filtered so only the
/// owning user's subscriptions observe it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// e.g. `created`, `updated`, `deleted`, `completed`, `delegation_failed`.
    pub event: String,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub owner_user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(event: impl Into<String>, entity_kind: EntityKind, entity_id: Uuid, owner_user_id: Uuid) -> Self {
        Self {
            event: event.into(),
            entity_kind,
            entity_id,
            owner_user_id,
            timestamp: Utc::now(),
        }
    }
}
