//! `manage_context` tool.

use serde_json::{json, Map, Value};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{normalize_context_id, ContextLevel};
use crate::infrastructure::mcp::coerce::{ParamSpec, ParamType, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::services::UserFacades;

use super::{opt_bool, opt_object, require_str, unknown_action};

const ACTIONS: &[&str] = &["create", "get", "update", "delete", "resolve", "delegate"];

pub const SPEC: ToolSpec = ToolSpec {
    name: "manage_context",
    description: "Read and write the four-tier context hierarchy",
    params: &[
        ParamSpec { name: "action", param_type: ParamType::String, required: true, description: "One of: create, get, update, delete, resolve, delegate" },
        ParamSpec { name: "level", param_type: ParamType::String, required: true, description: "global | project | branch | task" },
        ParamSpec { name: "context_id", param_type: ParamType::String, required: true, description: "Context id; 'global' names the caller's singleton" },
        ParamSpec { name: "data", param_type: ParamType::Object, required: false, description: "JSON data blob (accepts a JSON string)" },
        ParamSpec { name: "include_inherited", param_type: ParamType::Boolean, required: false, description: "Include the resolved overlay on get" },
        ParamSpec { name: "target_level", param_type: ParamType::String, required: false, description: "Delegation target tier (must be above level)" },
        ParamSpec { name: "delegate_data", param_type: ParamType::Object, required: false, description: "Delegation payload" },
    ],
};

fn parse_level(raw: &str) -> DomainResult<ContextLevel> {
    ContextLevel::from_str(raw).ok_or_else(|| {
        DomainError::Validation(format!(
            "invalid level '{raw}'; expected one of: global, project, branch, task"
        ))
    })
}

pub async fn handle(facades: &UserFacades, args: Map<String, Value>) -> DomainResult<StandardResponse> {
    let action = require_str(&args, "action")?;
    let level = parse_level(require_str(&args, "level")?)?;
    let context_id = normalize_context_id(level, require_str(&args, "context_id")?)?;

    match action {
        "create" => {
            let data = opt_object(&args, "data").unwrap_or(Value::Null);
            let record = facades.contexts.create(level, context_id, data).await?;
            Ok(StandardResponse::success(
                format!("{} context created", level.as_str()),
                json!({ "context": record }),
            ))
        }
        "get" => {
            let include_inherited = opt_bool(&args, "include_inherited").unwrap_or(false);
            let view = facades.contexts.get(level, context_id, include_inherited).await?;
            let mut data = json!({ "context": view.record });
            if let Some(resolved) = view.resolved {
                data["resolved"] = serde_json::to_value(resolved.as_ref())?;
            }
            Ok(StandardResponse::success("Context found", data))
        }
        "update" => {
            let data = opt_object(&args, "data")
                .ok_or_else(|| DomainError::missing_field("data"))?;
            let record = facades.contexts.update(level, context_id, data).await?;
            Ok(StandardResponse::success(
                format!("{} context updated", level.as_str()),
                json!({ "context": record }),
            ))
        }
        "delete" => {
            facades.contexts.delete(level, context_id).await?;
            Ok(StandardResponse::success(
                format!("{} context deleted", level.as_str()),
                json!({ "context_id": context_id }),
            ))
        }
        "resolve" => {
            let resolved = facades.contexts.resolve(level, context_id).await?;
            Ok(StandardResponse::success(
                "Context resolved",
                json!({ "resolved": resolved.as_ref() }),
            ))
        }
        "delegate" => {
            let target = parse_level(require_str(&args, "target_level")?)?;
            let payload = opt_object(&args, "delegate_data")
                .ok_or_else(|| DomainError::missing_field("delegate_data"))?;
            let delegation = facades.contexts.delegate(level, context_id, target, payload).await?;
            Ok(StandardResponse::success(
                format!("Delegation to {} tier queued", target.as_str()),
                json!({ "delegation": delegation }),
            ))
        }
        other => Err(unknown_action("manage_context", other, ACTIONS)),
    }
}
