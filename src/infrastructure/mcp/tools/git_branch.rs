//! `manage_git_branch` tool.

use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::infrastructure::mcp::coerce::{ParamSpec, ParamType, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::services::UserFacades;

use super::{opt_str, require_id, require_str, unknown_action};

const ACTIONS: &[&str] = &[
    "create",
    "get",
    "list",
    "update",
    "delete",
    "assign_agent",
    "unassign_agent",
    "list_agents",
];

pub const SPEC: ToolSpec = ToolSpec {
    name: "manage_git_branch",
    description: "Manage branches (workstreams) under a project",
    params: &[
        ParamSpec { name: "action", param_type: ParamType::String, required: true, description: "One of: create, get, list, update, delete, assign_agent, unassign_agent, list_agents" },
        ParamSpec { name: "project_id", param_type: ParamType::String, required: false, description: "Owning project id" },
        ParamSpec { name: "branch_id", param_type: ParamType::String, required: false, description: "Branch id" },
        ParamSpec { name: "name", param_type: ParamType::String, required: false, description: "Branch name, unique per project" },
        ParamSpec { name: "description", param_type: ParamType::String, required: false, description: "Free-form description" },
        ParamSpec { name: "agent", param_type: ParamType::String, required: false, description: "Agent identifier: @name, bare name, or UUID" },
    ],
};

pub async fn handle(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let action = require_str(&args, "action")?;

    match action {
        "create" => {
            let project_id = require_id(&args, "project_id")?;
            let name = require_str(&args, "name")?;
            let description = opt_str(&args, "description").unwrap_or_default();
            let branch = facades.branches.create(project_id, name, description).await?;
            Ok(StandardResponse::success(
                format!("Branch '{}' created", branch.name),
                json!({ "branch": branch }),
            ))
        }
        "get" => {
            let id = require_id(&args, "branch_id")?;
            let branch = facades.branches.get(id).await?;
            Ok(StandardResponse::success("Branch found", json!({ "branch": branch })))
        }
        "list" => {
            let project_id = require_id(&args, "project_id")?;
            let branches = facades.branches.list(project_id).await?;
            Ok(StandardResponse::success(
                format!("{} branch(es)", branches.len()),
                json!({ "branches": branches }),
            ))
        }
        "update" => {
            let id = require_id(&args, "branch_id")?;
            let branch = facades
                .branches
                .update(id, opt_str(&args, "name"), opt_str(&args, "description"))
                .await?;
            Ok(StandardResponse::success("Branch updated", json!({ "branch": branch })))
        }
        "delete" => {
            let id = require_id(&args, "branch_id")?;
            facades.branches.delete(id).await?;
            Ok(StandardResponse::success("Branch deleted", json!({ "branch_id": id })))
        }
        "assign_agent" => {
            let id = require_id(&args, "branch_id")?;
            let agent = require_str(&args, "agent")?;
            let assignment = facades.agents.assign(id, agent).await?;
            Ok(StandardResponse::success(
                "Agent assigned",
                json!({ "assignment": assignment }),
            ))
        }
        "unassign_agent" => {
            let id = require_id(&args, "branch_id")?;
            let agent = require_str(&args, "agent")?;
            facades.agents.unassign(id, agent).await?;
            Ok(StandardResponse::success("Agent unassigned", json!({ "branch_id": id })))
        }
        "list_agents" => {
            let id = require_id(&args, "branch_id")?;
            let agents = facades.agents.list_for_branch(id).await?;
            Ok(StandardResponse::success(
                format!("{} agent(s) assigned", agents.len()),
                json!({ "agents": agents }),
            ))
        }
        other => Err(unknown_action("manage_git_branch", other, ACTIONS)),
    }
}
