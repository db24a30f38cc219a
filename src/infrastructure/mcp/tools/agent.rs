//! `manage_agent` and `call_agent` tools.

use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::infrastructure::mcp::coerce::{ParamSpec, ParamType, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::services::UserFacades;

use super::{opt_str, require_id, require_str, unknown_action};

const ACTIONS: &[&str] = &["register", "assign", "unassign", "list"];

pub const MANAGE_SPEC: ToolSpec = ToolSpec {
    name: "manage_agent",
    description: "Register agents and manage their branch assignments",
    params: &[
        ParamSpec { name: "action", param_type: ParamType::String, required: true, description: "One of: register, assign, unassign, list" },
        ParamSpec { name: "project_id", param_type: ParamType::String, required: false, description: "Owning project id" },
        ParamSpec { name: "branch_id", param_type: ParamType::String, required: false, description: "Branch for assign/unassign" },
        ParamSpec { name: "agent", param_type: ParamType::String, required: false, description: "Agent identifier: @name, bare name, or UUID" },
        ParamSpec { name: "name", param_type: ParamType::String, required: false, description: "Agent name for register" },
        ParamSpec { name: "description", param_type: ParamType::String, required: false, description: "Agent description" },
    ],
};

pub const CALL_SPEC: ToolSpec = ToolSpec {
    name: "call_agent",
    description: "Resolve an agent name or id to its canonical descriptor",
    params: &[
        ParamSpec { name: "agent_name", param_type: ParamType::String, required: true, description: "@name, bare name, or UUID" },
    ],
};

pub async fn handle_manage(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let action = require_str(&args, "action")?;

    match action {
        "register" => {
            let project_id = require_id(&args, "project_id")?;
            let name = require_str(&args, "name")?;
            let description = opt_str(&args, "description").unwrap_or_default();
            let agent = facades.agents.register(project_id, name, description).await?;
            Ok(StandardResponse::success(
                format!("Agent '@{}' registered", agent.name),
                json!({ "agent": agent }),
            ))
        }
        "assign" => {
            let branch_id = require_id(&args, "branch_id")?;
            let identifier = require_str(&args, "agent")?;
            let assignment = facades.agents.assign(branch_id, identifier).await?;
            Ok(StandardResponse::success("Agent assigned", json!({ "assignment": assignment })))
        }
        "unassign" => {
            let branch_id = require_id(&args, "branch_id")?;
            let identifier = require_str(&args, "agent")?;
            facades.agents.unassign(branch_id, identifier).await?;
            Ok(StandardResponse::success("Agent unassigned", json!({ "branch_id": branch_id })))
        }
        "list" => {
            let project_id = require_id(&args, "project_id")?;
            let agents = facades.agents.list_for_project(project_id).await?;
            Ok(StandardResponse::success(
                format!("{} registered agent(s)", agents.len()),
                json!({ "agents": agents }),
            ))
        }
        other => Err(unknown_action("manage_agent", other, ACTIONS)),
    }
}

pub async fn handle_call(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let identifier = require_str(&args, "agent_name")?;
    let agent = facades.agents.call_agent(identifier).await?;
    Ok(StandardResponse::success(
        format!("Agent '@{}' resolved", agent.name),
        json!({ "agent": agent.descriptor() }),
    ))
}
