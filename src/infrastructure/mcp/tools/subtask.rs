//! `manage_subtask` tool.

use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::infrastructure::mcp::coerce::{ParamSpec, ParamType, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::services::subtask_service::{CreateSubtaskInput, UpdateSubtaskInput};
use crate::services::UserFacades;

use super::{
    opt_str, opt_string_array, opt_u8, parse_priority, parse_status, require_id, require_str,
    unknown_action,
};

const ACTIONS: &[&str] = &["create", "get", "list", "update", "delete"];

pub const SPEC: ToolSpec = ToolSpec {
    name: "manage_subtask",
    description: "Manage subtasks under a task",
    params: &[
        ParamSpec { name: "action", param_type: ParamType::String, required: true, description: "One of: create, get, list, update, delete" },
        ParamSpec { name: "task_id", param_type: ParamType::String, required: false, description: "Parent task id" },
        ParamSpec { name: "subtask_id", param_type: ParamType::String, required: false, description: "Subtask id" },
        ParamSpec { name: "title", param_type: ParamType::String, required: false, description: "Subtask title" },
        ParamSpec { name: "description", param_type: ParamType::String, required: false, description: "Detailed description" },
        ParamSpec { name: "status", param_type: ParamType::String, required: false, description: "todo | in_progress | blocked | done | cancelled" },
        ParamSpec { name: "priority", param_type: ParamType::String, required: false, description: "low | medium | high | critical" },
        ParamSpec { name: "assignees", param_type: ParamType::Array, required: false, description: "Assignees" },
        ParamSpec { name: "progress_percentage", param_type: ParamType::Integer, required: false, description: "Progress 0..=100" },
    ],
};

pub async fn handle(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let action = require_str(&args, "action")?;

    match action {
        "create" => {
            let input = CreateSubtaskInput {
                task_id: require_id(&args, "task_id")?,
                title: require_str(&args, "title")?.to_string(),
                description: opt_str(&args, "description").unwrap_or_default().to_string(),
                priority: opt_str(&args, "priority").map(parse_priority).transpose()?,
                assignees: opt_string_array(&args, "assignees")?.unwrap_or_default(),
            };
            let subtask = facades.subtasks.create(input).await?;
            Ok(StandardResponse::success(
                format!("Subtask '{}' created", subtask.title),
                json!({ "subtask": subtask }),
            ))
        }
        "get" => {
            let id = require_id(&args, "subtask_id")?;
            let subtask = facades.subtasks.get(id).await?;
            Ok(StandardResponse::success("Subtask found", json!({ "subtask": subtask })))
        }
        "list" => {
            let task_id = require_id(&args, "task_id")?;
            let listing = facades.subtasks.list(task_id).await?;
            Ok(StandardResponse::success(
                format!("{} subtask(s)", listing.subtasks.len()),
                json!({ "subtasks": listing.subtasks, "summary": listing.summary }),
            ))
        }
        "update" => {
            let id = require_id(&args, "subtask_id")?;
            let patch = UpdateSubtaskInput {
                title: opt_str(&args, "title").map(String::from),
                description: opt_str(&args, "description").map(String::from),
                status: opt_str(&args, "status").map(parse_status).transpose()?,
                priority: opt_str(&args, "priority").map(parse_priority).transpose()?,
                assignees: opt_string_array(&args, "assignees")?,
                progress_percentage: opt_u8(&args, "progress_percentage")?,
            };
            let subtask = facades.subtasks.update(id, patch).await?;
            Ok(StandardResponse::success("Subtask updated", json!({ "subtask": subtask })))
        }
        "delete" => {
            let id = require_id(&args, "subtask_id")?;
            facades.subtasks.delete(id).await?;
            Ok(StandardResponse::success("Subtask deleted", json!({ "subtask_id": id })))
        }
        other => Err(unknown_action("manage_subtask", other, ACTIONS)),
    }
}
