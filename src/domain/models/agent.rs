//! Agent registry and branch assignment models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ids::canonical_agent_name;

/// A registered agent. The id is either caller-supplied (UUID input) or
/// derived from the canonical name via v5 under the project namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    /// Canonical kebab-case name, e.g. `coding-agent`.
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        user_id: Uuid,
        project_id: Uuid,
        id: Uuid,
        name: &str,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            project_id,
            name: canonical_agent_name(name),
            description: description.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Wire descriptor returned by `call_agent`.
    pub fn descriptor(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "call_name": format!("@{}", self.name),
            "project_id": self.project_id,
            "description": self.description,
        })
    }
}

/// Assignment of a registered agent to a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAssignment {
    pub branch_id: Uuid,
    pub agent_id: Uuid,
    pub user_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_name_is_canonicalized_on_construction() {
        let agent = Agent::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "@Coding Agent", "");
        assert_eq!(agent.name, "coding-agent");
        assert_eq!(agent.descriptor()["call_name"], "@coding-agent");
    }
}
