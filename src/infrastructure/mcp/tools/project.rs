//! `manage_project` tool.

use serde_json::{json, Map, Value};

use crate::domain::errors::DomainResult;
use crate::infrastructure::mcp::coerce::{ParamSpec, ParamType, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::services::UserFacades;

use super::{opt_i64, opt_str, require_id, require_str, unknown_action};

const ACTIONS: &[&str] = &[
    "create",
    "get",
    "list",
    "update",
    "delete",
    "project_health_check",
    "cleanup_obsolete",
    "validate_integrity",
    "rebalance_agents",
];

pub const SPEC: ToolSpec = ToolSpec {
    name: "manage_project",
    description: "Create, inspect, maintain, and delete projects",
    params: &[
        ParamSpec { name: "action", param_type: ParamType::String, required: true, description: "One of: create, get, list, update, delete, project_health_check, cleanup_obsolete, validate_integrity, rebalance_agents" },
        ParamSpec { name: "project_id", param_type: ParamType::String, required: false, description: "Project id (canonical or compact UUID)" },
        ParamSpec { name: "name", param_type: ParamType::String, required: false, description: "Project name, unique per user" },
        ParamSpec { name: "description", param_type: ParamType::String, required: false, description: "Free-form description" },
        ParamSpec { name: "older_than_days", param_type: ParamType::Integer, required: false, description: "Age cutoff for cleanup_obsolete (default 30)" },
    ],
};

pub async fn handle(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let action = require_str(&args, "action")?;

    match action {
        "create" => {
            let name = require_str(&args, "name")?;
            let description = opt_str(&args, "description").unwrap_or_default();
            let project = facades.projects.create(name, description).await?;
            Ok(StandardResponse::success(
                format!("Project '{}' created", project.name),
                json!({ "project": project }),
            ))
        }
        "get" => {
            let id = require_id(&args, "project_id")?;
            let project = facades.projects.get(id).await?;
            Ok(StandardResponse::success("Project found", json!({ "project": project })))
        }
        "list" => {
            let projects = facades.projects.list().await?;
            Ok(StandardResponse::success(
                format!("{} project(s)", projects.len()),
                json!({ "projects": projects }),
            ))
        }
        "update" => {
            let id = require_id(&args, "project_id")?;
            let project = facades
                .projects
                .update(id, opt_str(&args, "name"), opt_str(&args, "description"))
                .await?;
            Ok(StandardResponse::success("Project updated", json!({ "project": project })))
        }
        "delete" => {
            let id = require_id(&args, "project_id")?;
            facades.projects.delete(id).await?;
            Ok(StandardResponse::success("Project deleted", json!({ "project_id": id })))
        }
        "project_health_check" => {
            let id = require_id(&args, "project_id")?;
            let report = facades.projects.health_check(id).await?;
            if report.healthy {
                Ok(StandardResponse::success("Project healthy", json!({ "health": report })))
            } else {
                let details = json!({ "counter_discrepancies": report.counter_discrepancies });
                Ok(StandardResponse::warning(
                    "Project has counter discrepancies",
                    json!({ "health": report }),
                    details,
                ))
            }
        }
        "cleanup_obsolete" => {
            let id = require_id(&args, "project_id")?;
            let days = opt_i64(&args, "older_than_days").unwrap_or(30);
            let deleted = facades.projects.cleanup_obsolete(id, days).await?;
            Ok(StandardResponse::success(
                format!("Removed {deleted} obsolete task(s)"),
                json!({ "deleted_tasks": deleted }),
            ))
        }
        "validate_integrity" => {
            let report = facades.projects.validate_integrity().await?;
            let drifted = report.counters.discrepancies.len();
            if drifted == 0 {
                Ok(StandardResponse::success("Integrity verified", json!({ "integrity": report })))
            } else {
                Ok(StandardResponse::warning(
                    format!("Repaired counters on {drifted} branch(es)"),
                    json!({ "integrity": report }),
                    json!({ "repaired_branches": drifted }),
                ))
            }
        }
        "rebalance_agents" => {
            let id = require_id(&args, "project_id")?;
            let report = facades.agents.rebalance(id).await?;
            Ok(StandardResponse::success(
                format!(
                    "Distributed {} agent(s) across {} branch(es)",
                    report.agents, report.branches
                ),
                json!({ "rebalance": report }),
            ))
        }
        other => Err(unknown_action("manage_project", other, ACTIONS)),
    }
}
