//! `manage_task` tool.

use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::domain::ports::TaskFilter;
use crate::infrastructure::mcp::coerce::{ParamSpec, ParamType, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::services::task_service::{CreateTaskInput, UpdateTaskInput};
use crate::services::UserFacades;

use super::{
    opt_id_array, opt_str, opt_string_array, opt_u8, parse_due_date, parse_priority,
    parse_status, require_id, require_str, unknown_action,
};

const ACTIONS: &[&str] = &[
    "create",
    "get",
    "list",
    "update",
    "complete",
    "delete",
    "add_dependency",
    "remove_dependency",
    "append_progress",
    "list_subtasks",
];

pub const SPEC: ToolSpec = ToolSpec {
    name: "manage_task",
    description: "Create, track, and complete tasks on a branch",
    params: &[
        ParamSpec { name: "action", param_type: ParamType::String, required: true, description: "One of: create, get, list, update, complete, delete, add_dependency, remove_dependency, append_progress, list_subtasks" },
        ParamSpec { name: "task_id", param_type: ParamType::String, required: false, description: "Task id" },
        ParamSpec { name: "git_branch_id", param_type: ParamType::String, required: false, description: "Owning branch id (create/list)" },
        ParamSpec { name: "title", param_type: ParamType::String, required: false, description: "Task title" },
        ParamSpec { name: "description", param_type: ParamType::String, required: false, description: "Detailed description" },
        ParamSpec { name: "status", param_type: ParamType::String, required: false, description: "todo | in_progress | blocked | done | cancelled" },
        ParamSpec { name: "priority", param_type: ParamType::String, required: false, description: "low | medium | high | critical" },
        ParamSpec { name: "assignees", param_type: ParamType::Array, required: false, description: "Assignees; at least one required at creation" },
        ParamSpec { name: "labels", param_type: ParamType::Array, required: false, description: "Free-form labels" },
        ParamSpec { name: "estimated_effort", param_type: ParamType::String, required: false, description: "Effort estimate, e.g. '2d'" },
        ParamSpec { name: "due_date", param_type: ParamType::String, required: false, description: "RFC3339 timestamp or YYYY-MM-DD" },
        ParamSpec { name: "dependencies", param_type: ParamType::Array, required: false, description: "Task ids this task depends on; accepts array or comma-joined string" },
        ParamSpec { name: "dependency_id", param_type: ParamType::String, required: false, description: "Dependency target for add/remove_dependency" },
        ParamSpec { name: "progress_percentage", param_type: ParamType::Integer, required: false, description: "Progress 0..=100" },
        ParamSpec { name: "progress_notes", param_type: ParamType::String, required: false, description: "Content for append_progress" },
    ],
};

pub async fn handle(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let action = require_str(&args, "action")?;

    match action {
        "create" => {
            let input = CreateTaskInput {
                branch_id: require_id(&args, "git_branch_id")?,
                title: require_str(&args, "title")?.to_string(),
                description: opt_str(&args, "description").unwrap_or_default().to_string(),
                priority: opt_str(&args, "priority").map(parse_priority).transpose()?,
                assignees: opt_string_array(&args, "assignees")?.unwrap_or_default(),
                labels: opt_string_array(&args, "labels")?.unwrap_or_default(),
                estimated_effort: opt_str(&args, "estimated_effort").map(String::from),
                due_date: opt_str(&args, "due_date").map(parse_due_date).transpose()?,
                dependencies: opt_id_array(&args, "dependencies")?.unwrap_or_default(),
            };
            let task = facades.tasks.create(input).await?;
            Ok(StandardResponse::success(
                format!("Task '{}' created", task.title),
                json!({ "task": task }),
            ))
        }
        "get" => {
            let id = require_id(&args, "task_id")?;
            let view = facades.tasks.get(id).await?;
            Ok(StandardResponse::success("Task found", json!({ "task": view })))
        }
        "list" => {
            let filter = TaskFilter {
                branch_id: super::opt_id(&args, "git_branch_id")?,
                status: opt_str(&args, "status").map(parse_status).transpose()?,
                priority: opt_str(&args, "priority").map(parse_priority).transpose()?,
                ..Default::default()
            };
            let tasks = facades.tasks.list(filter).await?;
            Ok(StandardResponse::success(
                format!("{} task(s)", tasks.len()),
                json!({ "tasks": tasks }),
            ))
        }
        "update" => {
            let id = require_id(&args, "task_id")?;
            let patch = UpdateTaskInput {
                title: opt_str(&args, "title").map(String::from),
                description: opt_str(&args, "description").map(String::from),
                status: opt_str(&args, "status").map(parse_status).transpose()?,
                priority: opt_str(&args, "priority").map(parse_priority).transpose()?,
                assignees: opt_string_array(&args, "assignees")?,
                labels: opt_string_array(&args, "labels")?,
                estimated_effort: opt_str(&args, "estimated_effort").map(String::from),
                due_date: opt_str(&args, "due_date").map(parse_due_date).transpose()?,
                progress_percentage: opt_u8(&args, "progress_percentage")?,
            };
            let task = facades.tasks.update(id, patch).await?;
            Ok(StandardResponse::success("Task updated", json!({ "task": task })))
        }
        "complete" => {
            let id = require_id(&args, "task_id")?;
            let outcome = facades.tasks.complete(id).await?;
            if outcome.open_subtasks > 0 {
                let details = json!({
                    "open_subtasks": outcome.open_subtasks,
                    "subtask_summary": outcome.subtask_summary,
                });
                Ok(StandardResponse::warning(
                    format!(
                        "Task completed with {} open subtask(s)",
                        outcome.open_subtasks
                    ),
                    json!({ "task": outcome.task }),
                    details,
                ))
            } else {
                Ok(StandardResponse::success(
                    "Task completed",
                    json!({ "task": outcome.task, "subtask_summary": outcome.subtask_summary }),
                ))
            }
        }
        "delete" => {
            let id = require_id(&args, "task_id")?;
            facades.tasks.delete(id).await?;
            Ok(StandardResponse::success("Task deleted", json!({ "task_id": id })))
        }
        "add_dependency" => {
            let id = require_id(&args, "task_id")?;
            let dep = require_id(&args, "dependency_id")?;
            facades.dependencies.add_dependency(id, dep).await?;
            let report = facades.dependencies.report(id).await?;
            Ok(StandardResponse::success("Dependency added", json!({ "dependencies": report })))
        }
        "remove_dependency" => {
            let id = require_id(&args, "task_id")?;
            let dep = require_id(&args, "dependency_id")?;
            facades.dependencies.remove_dependency(id, dep).await?;
            let report = facades.dependencies.report(id).await?;
            Ok(StandardResponse::success("Dependency removed", json!({ "dependencies": report })))
        }
        "append_progress" => {
            let id = require_id(&args, "task_id")?;
            let notes = require_str(&args, "progress_notes")?;
            let percentage = opt_u8(&args, "progress_percentage")?;
            let task = facades.tasks.append_progress(id, notes, percentage).await?;
            Ok(StandardResponse::success(
                format!("Progress entry {} recorded", task.progress_history.len()),
                json!({ "task": task }),
            ))
        }
        "list_subtasks" => {
            let id = require_id(&args, "task_id")?;
            let listing = facades.subtasks.list(id).await?;
            Ok(StandardResponse::success(
                format!("{} subtask(s)", listing.subtasks.len()),
                json!({ "subtasks": listing.subtasks, "summary": listing.summary }),
            ))
        }
        other => Err(unknown_action("manage_task", other, ACTIONS)),
    }
}
