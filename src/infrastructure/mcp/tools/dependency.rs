//! `manage_dependency` tool.

use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::infrastructure::mcp::coerce::{ParamSpec, ParamType, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::services::UserFacades;

use super::{require_id, require_str, unknown_action};

const ACTIONS: &[&str] = &[
    "add_dependency",
    "remove_dependency",
    "get_dependencies",
    "clear_dependencies",
    "get_blocking_tasks",
];

pub const SPEC: ToolSpec = ToolSpec {
    name: "manage_dependency",
    description: "Maintain the task dependency graph",
    params: &[
        ParamSpec { name: "action", param_type: ParamType::String, required: true, description: "One of: add_dependency, remove_dependency, get_dependencies, clear_dependencies, get_blocking_tasks" },
        ParamSpec { name: "task_id", param_type: ParamType::String, required: true, description: "Task id" },
        ParamSpec { name: "dependency_id", param_type: ParamType::String, required: false, description: "Dependency target task id" },
    ],
};

pub async fn handle(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let action = require_str(&args, "action")?;
    let task_id = require_id(&args, "task_id")?;

    match action {
        "add_dependency" => {
            let dep = require_id(&args, "dependency_id")?;
            facades.dependencies.add_dependency(task_id, dep).await?;
            let report = facades.dependencies.report(task_id).await?;
            Ok(StandardResponse::success("Dependency added", json!({ "dependencies": report })))
        }
        "remove_dependency" => {
            let dep = require_id(&args, "dependency_id")?;
            facades.dependencies.remove_dependency(task_id, dep).await?;
            let report = facades.dependencies.report(task_id).await?;
            Ok(StandardResponse::success("Dependency removed", json!({ "dependencies": report })))
        }
        "get_dependencies" => {
            let report = facades.dependencies.report(task_id).await?;
            Ok(StandardResponse::success(
                format!("{} direct dependenc(ies)", report.dependencies.len()),
                json!({ "dependencies": report }),
            ))
        }
        "clear_dependencies" => {
            let removed = facades.dependencies.clear_dependencies(task_id).await?;
            Ok(StandardResponse::success(
                format!("Removed {removed} dependenc(ies)"),
                json!({ "task_id": task_id, "removed": removed }),
            ))
        }
        "get_blocking_tasks" => {
            let blocking = facades.dependencies.blocking_tasks(task_id).await?;
            Ok(StandardResponse::success(
                format!("{} blocking task(s)", blocking.len()),
                json!({ "blocking_tasks": blocking }),
            ))
        }
        other => Err(unknown_action("manage_dependency", other, ACTIONS)),
    }
}
