//! SQLite implementation of the AgentRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Agent, AgentAssignment};
use crate::domain::ports::AgentRepository;

use super::project_repository::{parse_timestamp, parse_uuid};
use super::scope::UserScope;

#[derive(Clone)]
pub struct SqliteAgentRepository {
    pool: SqlitePool,
    scope: UserScope,
}

impl SqliteAgentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, scope: UserScope::system() }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.scope = UserScope::user(user_id);
        self
    }
}

#[derive(sqlx::FromRow)]
struct AgentRow {
    id: String,
    user_id: String,
    project_id: String,
    name: String,
    description: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AgentRow> for Agent {
    type Error = DomainError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        Ok(Agent {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            project_id: parse_uuid(&row.project_id)?,
            name: row.name,
            description: row.description,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    branch_id: String,
    agent_id: String,
    user_id: String,
    assigned_at: String,
}

impl TryFrom<AssignmentRow> for AgentAssignment {
    type Error = DomainError;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        Ok(AgentAssignment {
            branch_id: parse_uuid(&row.branch_id)?,
            agent_id: parse_uuid(&row.agent_id)?,
            user_id: parse_uuid(&row.user_id)?,
            assigned_at: parse_timestamp(&row.assigned_at)?,
        })
    }
}

#[async_trait]
impl AgentRepository for SqliteAgentRepository {
    async fn register(&self, agent: &Agent) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        sqlx::query(
            "INSERT INTO agents (id, user_id, project_id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET description = excluded.description,
                                           updated_at = excluded.updated_at",
        )
        .bind(agent.id.to_string())
        .bind(user_id.to_string())
        .bind(agent.project_id.to_string())
        .bind(&agent.name)
        .bind(&agent.description)
        .bind(agent.created_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as(
            "SELECT * FROM agents WHERE id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Agent::try_from).transpose()
    }

    async fn get_by_name(&self, project_id: Uuid, name: &str) -> DomainResult<Option<Agent>> {
        let row: Option<AgentRow> = sqlx::query_as(
            "SELECT * FROM agents
             WHERE project_id = ? AND name = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(project_id.to_string())
        .bind(name)
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Agent::try_from).transpose()
    }

    async fn list_by_project(&self, project_id: Uuid) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            "SELECT * FROM agents
             WHERE project_id = ? AND (? IS NULL OR user_id = ?) ORDER BY name",
        )
        .bind(project_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Agent::try_from).collect()
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Vec<Agent>> {
        let rows: Vec<AgentRow> = sqlx::query_as(
            "SELECT * FROM agents WHERE name = ? AND (? IS NULL OR user_id = ?) ORDER BY created_at",
        )
        .bind(name)
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Agent::try_from).collect()
    }

    async fn unregister(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM agents WHERE id = ? AND (? IS NULL OR user_id = ?)")
            .bind(id.to_string())
            .bind(self.scope.filter())
            .bind(self.scope.filter())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Agent", id));
        }
        Ok(())
    }

    async fn assign(&self, assignment: &AgentAssignment) -> DomainResult<()> {
        let user_id = self.scope.require()?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO agent_assignments (branch_id, agent_id, user_id, assigned_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(assignment.branch_id.to_string())
        .bind(assignment.agent_id.to_string())
        .bind(user_id.to_string())
        .bind(assignment.assigned_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::Conflict(format!(
                "agent {} already assigned to branch {}",
                assignment.agent_id, assignment.branch_id
            )));
        }
        Ok(())
    }

    async fn unassign(&self, branch_id: Uuid, agent_id: Uuid) -> DomainResult<()> {
        let result = sqlx::query(
            "DELETE FROM agent_assignments
             WHERE branch_id = ? AND agent_id = ? AND (? IS NULL OR user_id = ?)",
        )
        .bind(branch_id.to_string())
        .bind(agent_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(
                "AgentAssignment",
                format!("{agent_id} on {branch_id}"),
            ));
        }
        Ok(())
    }

    async fn assignments_for_branch(&self, branch_id: Uuid) -> DomainResult<Vec<AgentAssignment>> {
        let rows: Vec<AssignmentRow> = sqlx::query_as(
            "SELECT * FROM agent_assignments
             WHERE branch_id = ? AND (? IS NULL OR user_id = ?) ORDER BY assigned_at",
        )
        .bind(branch_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AgentAssignment::try_from).collect()
    }

    async fn assignments_for_project(&self, project_id: Uuid) -> DomainResult<Vec<AgentAssignment>> {
        let rows: Vec<AssignmentRow> = sqlx::query_as(
            "SELECT aa.* FROM agent_assignments aa
             JOIN branches b ON b.id = aa.branch_id
             WHERE b.project_id = ? AND (? IS NULL OR aa.user_id = ?)
             ORDER BY aa.assigned_at",
        )
        .bind(project_id.to_string())
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AgentAssignment::try_from).collect()
    }

    async fn clear_project_assignments(&self, project_id: Uuid) -> DomainResult<usize> {
        let result = sqlx::query(
            "DELETE FROM agent_assignments
             WHERE (? IS NULL OR user_id = ?) AND branch_id IN
                   (SELECT id FROM branches WHERE project_id = ?)",
        )
        .bind(self.scope.filter())
        .bind(self.scope.filter())
        .bind(project_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() as usize)
    }
}
