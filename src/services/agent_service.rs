//! Agent registry and assignment use cases.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    agent_id_for, canonical_agent_name, parse_id, Agent, AgentAssignment, ChangeEvent, EntityKind,
};
use crate::domain::ports::{AgentRepository, BranchRepository, ChangeNotifier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceReport {
    pub project_id: Uuid,
    pub agents: usize,
    pub branches: usize,
    pub assignments_made: usize,
}

#[derive(Clone)]
pub struct AgentService {
    user_id: Uuid,
    agents: Arc<dyn AgentRepository>,
    branches: Arc<dyn BranchRepository>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl AgentService {
    pub fn new(
        user_id: Uuid,
        agents: Arc<dyn AgentRepository>,
        branches: Arc<dyn BranchRepository>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self { user_id, agents, branches, notifier }
    }

    /// Register an agent under a project. The id is derived from the
    /// canonical name, so re-registering the same name is an upsert.
    pub async fn register(
        &self,
        project_id: Uuid,
        name: &str,
        description: &str,
    ) -> DomainResult<Agent> {
        let canonical = canonical_agent_name(name);
        if canonical.is_empty() {
            return Err(DomainError::Validation("agent name cannot be empty".to_string()));
        }
        let id = agent_id_for(project_id, &canonical);
        let agent = Agent::new(self.user_id, project_id, id, &canonical, description);
        self.agents.register(&agent).await?;
        self.notifier.notify(ChangeEvent::new("registered", EntityKind::Agent, id, self.user_id));
        Ok(agent)
    }

    /// Resolve an identifier (UUID, compact UUID, `@name`, or bare name)
    /// to a registered agent within a project.
    pub async fn resolve(&self, project_id: Uuid, identifier: &str) -> DomainResult<Agent> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Err(DomainError::missing_field("agent"));
        }

        let agent = if let Ok(id) = parse_id("agent", trimmed) {
            self.agents.get(id).await?
        } else {
            self.agents.get_by_name(project_id, &canonical_agent_name(trimmed)).await?
        };

        agent.ok_or_else(|| DomainError::not_found("Agent", trimmed))
    }

    /// Assign an agent to a branch. The identifier must resolve to a
    /// registered agent first.
    pub async fn assign(&self, branch_id: Uuid, identifier: &str) -> DomainResult<AgentAssignment> {
        let branch = self
            .branches
            .get(branch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Branch", branch_id))?;

        let agent = self.resolve(branch.project_id, identifier).await?;

        let assignment = AgentAssignment {
            branch_id,
            agent_id: agent.id,
            user_id: self.user_id,
            assigned_at: Utc::now(),
        };
        self.agents.assign(&assignment).await?;
        self.notifier.notify(ChangeEvent::new("assigned", EntityKind::Agent, agent.id, self.user_id));
        Ok(assignment)
    }

    pub async fn unassign(&self, branch_id: Uuid, identifier: &str) -> DomainResult<()> {
        let branch = self
            .branches
            .get(branch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Branch", branch_id))?;
        let agent = self.resolve(branch.project_id, identifier).await?;
        self.agents.unassign(branch_id, agent.id).await?;
        self.notifier.notify(ChangeEvent::new("unassigned", EntityKind::Agent, agent.id, self.user_id));
        Ok(())
    }

    pub async fn list_for_branch(&self, branch_id: Uuid) -> DomainResult<Vec<Agent>> {
        let assignments = self.agents.assignments_for_branch(branch_id).await?;
        let mut agents = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            if let Some(agent) = self.agents.get(assignment.agent_id).await? {
                agents.push(agent);
            }
        }
        Ok(agents)
    }

    pub async fn list_for_project(&self, project_id: Uuid) -> DomainResult<Vec<Agent>> {
        self.agents.list_by_project(project_id).await
    }

    /// `call_agent`: return the canonical descriptor for a name or UUID,
    /// searched across the user's projects.
    pub async fn call_agent(&self, identifier: &str) -> DomainResult<Agent> {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return Err(DomainError::missing_field("agent_name"));
        }

        if let Ok(id) = parse_id("agent_name", trimmed) {
            return self
                .agents
                .get(id)
                .await?
                .ok_or_else(|| DomainError::not_found("Agent", trimmed));
        }

        let matches = self.agents.find_by_name(&canonical_agent_name(trimmed)).await?;
        matches
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found("Agent", trimmed))
    }

    /// Evenly redistribute a project's registered agents across its
    /// branches, replacing all existing assignments.
    pub async fn rebalance(&self, project_id: Uuid) -> DomainResult<RebalanceReport> {
        let agents = self.agents.list_by_project(project_id).await?;
        let branches = self.branches.list_by_project(project_id).await?;

        self.agents.clear_project_assignments(project_id).await?;

        let mut assignments_made = 0;
        if !branches.is_empty() {
            for (i, agent) in agents.iter().enumerate() {
                let branch = &branches[i % branches.len()];
                let assignment = AgentAssignment {
                    branch_id: branch.id,
                    agent_id: agent.id,
                    user_id: self.user_id,
                    assigned_at: Utc::now(),
                };
                self.agents.assign(&assignment).await?;
                assignments_made += 1;
            }
        }

        self.notifier.notify(ChangeEvent::new("rebalanced", EntityKind::Project, project_id, self.user_id));
        Ok(RebalanceReport {
            project_id,
            agents: agents.len(),
            branches: branches.len(),
            assignments_made,
        })
    }
}
