//! Tool dispatcher: JSON-RPC methods, authentication, coercion, routing.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Config;
use crate::infrastructure::mcp::coerce::{coerce_arguments, ToolSpec};
use crate::infrastructure::mcp::response::StandardResponse;
use crate::infrastructure::mcp::tools;
use crate::infrastructure::mcp::types::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use crate::services::broadcast::BroadcastNotifier;
use crate::services::{FacadeRegistry, RequestScope, TokenVerifier, UserFacades};

pub type UserRateLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

pub const HEALTH_SPEC: ToolSpec = ToolSpec {
    name: "health_check",
    description: "Liveness probe; requires no authentication",
    params: &[],
};

pub const CAPABILITIES_SPEC: ToolSpec = ToolSpec {
    name: "get_server_capabilities",
    description: "Protocol version, enabled tools, and accepted auth modes",
    params: &[],
};

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub verifier: Arc<TokenVerifier>,
    pub registry: Arc<FacadeRegistry>,
    pub events: BroadcastNotifier,
    pub limiter: Option<Arc<UserRateLimiter>>,
}

impl ServerState {
    pub fn build_limiter(config: &Config) -> Option<Arc<UserRateLimiter>> {
        let rps = config.limits.requests_per_second?;
        let quota = Quota::per_second(NonZeroU32::new(rps.max(1)).expect("max(1) is nonzero"))
            .allow_burst(NonZeroU32::new(config.limits.burst_size.max(1)).expect("max(1) is nonzero"));
        Some(Arc::new(RateLimiter::keyed(quota)))
    }
}

/// Pull the bearer token out of the accepted header set:
/// `Authorization: Bearer <t>` or the legacy `X-API-Token`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        let value = value.to_str().ok()?;
        if let Some(token) = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer ")) {
            return Some(token.trim().to_string());
        }
    }
    headers
        .get("x-api-token")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
}

pub async fn handle_rpc(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> JsonRpcResponse {
    tracing::debug!(method = %request.method, "Received request");
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => JsonRpcResponse::result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "taskhub",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "tools/list" => tools_list(&state, id),
        "tools/call" => tools_call(state, headers, request).await,
        other => JsonRpcResponse::method_not_found(id, other),
    }
}

fn enabled_specs(state: &ServerState) -> Vec<&'static ToolSpec> {
    let mut specs = tools::all_specs();
    specs.push(&HEALTH_SPEC);
    specs.push(&CAPABILITIES_SPEC);
    specs
        .into_iter()
        .filter(|spec| state.config.tool_enabled(spec.name))
        .collect()
}

fn tools_list(state: &ServerState, id: Option<Value>) -> JsonRpcResponse {
    let tools: Vec<Value> = enabled_specs(state)
        .into_iter()
        .map(|spec| {
            json!({
                "name": spec.name,
                "description": spec.description,
                "inputSchema": spec.input_schema(),
            })
        })
        .collect();
    JsonRpcResponse::result(id, json!({ "tools": tools }))
}

async fn tools_call(state: ServerState, headers: HeaderMap, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    let Some(params) = request.params else {
        return JsonRpcResponse::invalid_request(id, "Missing params");
    };
    let Some(tool_name) = params.get("name").and_then(Value::as_str).map(String::from) else {
        return JsonRpcResponse::invalid_request(id, "Missing tool name");
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    let response = dispatch_tool(&state, &headers, &tool_name, arguments).await;
    wrap_standard_response(id, &response)
}

/// Every tool outcome, success or failure, is a standard response.
async fn dispatch_tool(
    state: &ServerState,
    headers: &HeaderMap,
    tool_name: &str,
    arguments: Value,
) -> StandardResponse {
    let correlation_id = Uuid::new_v4();

    if !state.config.tool_enabled(tool_name) {
        return StandardResponse::from_error(
            &DomainError::Forbidden(format!("tool '{tool_name}' is disabled")),
            correlation_id,
        );
    }

    // Liveness tools answer without authentication.
    match tool_name {
        "health_check" => return health_check(state),
        "get_server_capabilities" => return capabilities(state),
        _ => {}
    }

    let Some(spec) = tools::all_specs().into_iter().find(|s| s.name == tool_name) else {
        return StandardResponse::from_error(
            &DomainError::not_found("Tool", tool_name),
            correlation_id,
        );
    };

    let scope = match authenticate(state, headers).await {
        Ok(scope) => scope,
        Err(err) => return StandardResponse::from_error(&err, correlation_id),
    };

    if let Some(limiter) = &state.limiter {
        if limiter.check_key(&scope.user_id()).is_err() {
            return StandardResponse::from_error(&DomainError::RateLimited, scope.correlation_id);
        }
    }

    let args = match coerce_arguments(spec, arguments) {
        Ok(args) => args,
        Err(err) => return StandardResponse::from_error(&err, scope.correlation_id),
    };

    let facades = state.registry.for_user(scope.user_id());
    let deadline = scope.remaining().unwrap_or(Duration::ZERO);

    match tokio::time::timeout(deadline, route(spec.name, &facades, args)).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => StandardResponse::from_error(&err, scope.correlation_id),
        Err(_) => StandardResponse::from_error(&DomainError::Timeout, scope.correlation_id),
    }
}

async fn authenticate(state: &ServerState, headers: &HeaderMap) -> DomainResult<RequestScope> {
    let token = bearer_token(headers)
        .ok_or_else(|| DomainError::Unauthenticated("no bearer token supplied".to_string()))?;
    let principal = state.verifier.verify(&token).await?;
    Ok(RequestScope::new(
        principal,
        Duration::from_secs(state.config.server.request_timeout_secs),
    ))
}

async fn route(
    tool_name: &str,
    facades: &UserFacades,
    args: serde_json::Map<String, Value>,
) -> DomainResult<StandardResponse> {
    match tool_name {
        "manage_project" => tools::project::handle(facades, args).await,
        "manage_git_branch" => tools::git_branch::handle(facades, args).await,
        "manage_task" => tools::task::handle(facades, args).await,
        "manage_subtask" => tools::subtask::handle(facades, args).await,
        "manage_context" => tools::context::handle(facades, args).await,
        "manage_dependency" => tools::dependency::handle(facades, args).await,
        "manage_agent" => tools::agent::handle_manage(facades, args).await,
        "call_agent" => tools::agent::handle_call(facades, args).await,
        other => Err(DomainError::not_found("Tool", other)),
    }
}

fn health_check(state: &ServerState) -> StandardResponse {
    StandardResponse::success(
        "Server is healthy",
        json!({
            "server": "taskhub",
            "version": env!("CARGO_PKG_VERSION"),
            "protocol_version": PROTOCOL_VERSION,
            "tools_enabled": enabled_specs(state).len(),
        }),
    )
}

fn capabilities(state: &ServerState) -> StandardResponse {
    let tools: Vec<&str> = enabled_specs(state).iter().map(|s| s.name).collect();
    StandardResponse::success(
        "Server capabilities",
        json!({
            "protocol_version": PROTOCOL_VERSION,
            "tools": tools,
            "auth_modes": ["platform_oidc", "api_token"],
            "streaming": { "sse": "/events" },
        }),
    )
}

fn wrap_standard_response(id: Option<Value>, response: &StandardResponse) -> JsonRpcResponse {
    let text = serde_json::to_string(response)
        .unwrap_or_else(|_| "{\"status\":\"error\",\"success\":false}".to_string());
    JsonRpcResponse::result(
        id,
        json!({
            "content": [ { "type": "text", "text": text } ],
            "isError": !response.success,
        }),
    )
}
