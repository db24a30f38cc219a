//! End-to-end tool calls through the JSON-RPC endpoint: authentication,
//! coercion, and the standard response envelope.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use taskhub::domain::models::Config;
use taskhub::infrastructure::mcp::{build_router, build_state};

use common::setup_test_db;

const SECRET: &str = "integration-secret";

fn test_config() -> Arc<Config> {
    let mut config = Config::default();
    config.auth.api_token_secret = SECRET.to_string();
    Arc::new(config)
}

fn api_token(user_id: Uuid) -> String {
    let claims = json!({
        "user_id": user_id.to_string(),
        "type": "api_token",
        "aud": "mcp-server",
        "exp": (Utc::now().timestamp() + 3600),
    });
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn call_tool(
    app: &axum::Router,
    token: Option<&str>,
    name: &str,
    arguments: Value,
) -> Value {
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
    });

    let mut request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Content-Type", "application/json");
    if let Some(token) = token {
        request = request.header("Authorization", format!("Bearer {token}"));
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();
    let text = envelope["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test]
async fn full_lifecycle_through_the_wire() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    // Create project -> branch -> task, then complete it; counters track.
    let resp = call_tool(&app, Some(&token), "manage_project", json!({"action": "create", "name": "P1"})).await;
    assert_eq!(resp["status"], "success", "create project: {resp}");
    let project_id = resp["data"]["project"]["id"].as_str().unwrap().to_string();

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "create", "project_id": project_id, "name": "main"}),
    )
    .await;
    assert_eq!(resp["status"], "success");
    let branch_id = resp["data"]["branch"]["id"].as_str().unwrap().to_string();
    assert_eq!(resp["data"]["branch"]["task_count"], 0);

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_task",
        json!({
            "action": "create",
            "git_branch_id": branch_id,
            "title": "T1",
            "assignees": ["coding-agent"],
        }),
    )
    .await;
    assert_eq!(resp["status"], "success");
    let task_id = resp["data"]["task"]["id"].as_str().unwrap().to_string();

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "get", "branch_id": branch_id}),
    )
    .await;
    assert_eq!(resp["data"]["branch"]["task_count"], 1);
    assert_eq!(resp["data"]["branch"]["completed_task_count"], 0);

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_task",
        json!({"action": "complete", "task_id": task_id}),
    )
    .await;
    assert_eq!(resp["success"], true);

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "get", "branch_id": branch_id}),
    )
    .await;
    assert_eq!(resp["data"]["branch"]["task_count"], 1);
    assert_eq!(resp["data"]["branch"]["completed_task_count"], 1);
}

#[tokio::test]
async fn dependencies_field_accepts_all_loose_shapes() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(&app, Some(&token), "manage_project", json!({"action": "create", "name": "P"})).await;
    let project_id = resp["data"]["project"]["id"].as_str().unwrap().to_string();
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "create", "project_id": project_id, "name": "main"}),
    )
    .await;
    let branch_id = resp["data"]["branch"]["id"].as_str().unwrap().to_string();

    let mut dep_ids = Vec::new();
    for title in ["D1", "D2"] {
        let resp = call_tool(
            &app,
            Some(&token),
            "manage_task",
            json!({"action": "create", "git_branch_id": branch_id, "title": title, "assignees": "a"}),
        )
        .await;
        dep_ids.push(resp["data"]["task"]["id"].as_str().unwrap().to_string());
    }

    // Array, lone string, comma-joined, comma-joined with spaces: all
    // produce the same edge set.
    let variants = vec![
        json!([dep_ids[0], dep_ids[1]]),
        json!(format!("{},{}", dep_ids[0], dep_ids[1])),
        json!(format!("{}, {}", dep_ids[0], dep_ids[1])),
    ];

    for (i, deps) in variants.into_iter().enumerate() {
        let resp = call_tool(
            &app,
            Some(&token),
            "manage_task",
            json!({
                "action": "create",
                "git_branch_id": branch_id,
                "title": format!("consumer-{i}"),
                "assignees": ["a"],
                "dependencies": deps,
            }),
        )
        .await;
        assert_eq!(resp["status"], "success", "variant {i}: {resp}");
        let mut got: Vec<String> = resp["data"]["task"]["dependencies"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        got.sort();
        let mut expected = dep_ids.clone();
        expected.sort();
        assert_eq!(got, expected, "variant {i}");
    }
}

#[tokio::test]
async fn missing_token_is_unauthenticated() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));

    let resp = call_tool(&app, None, "manage_project", json!({"action": "list"})).await;
    assert_eq!(resp["status"], "error");
    assert_eq!(resp["error_code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn health_check_requires_no_auth() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));

    let resp = call_tool(&app, None, "health_check", json!({})).await;
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["data"]["server"], "taskhub");

    let resp = call_tool(&app, None, "get_server_capabilities", json!({})).await;
    assert_eq!(resp["status"], "success");
    assert!(resp["data"]["tools"].as_array().unwrap().len() >= 8);
}

#[tokio::test]
async fn token_with_wrong_audience_is_rejected() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));

    let claims = json!({
        "user_id": Uuid::new_v4().to_string(),
        "type": "api_token",
        "aud": "other-service",
        "exp": (Utc::now().timestamp() + 3600),
    });
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let resp = call_tool(&app, Some(&token), "manage_project", json!({"action": "list"})).await;
    assert_eq!(resp["error_code"], "UNAUTHENTICATED");
    assert!(resp["message"].as_str().unwrap().contains("audience"));
}

#[tokio::test]
async fn unknown_field_lists_allowed_names() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_project",
        json!({"action": "list", "bogus_field": 1}),
    )
    .await;
    assert_eq!(resp["error_code"], "VALIDATION_ERROR");
    let message = resp["message"].as_str().unwrap();
    assert!(message.contains("bogus_field"));
    assert!(message.contains("project_id"));
}

#[tokio::test]
async fn malformed_uuid_never_touches_storage() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_project",
        json!({"action": "get", "project_id": "zzz-not-a-uuid"}),
    )
    .await;
    assert_eq!(resp["error_code"], "INVALID_FORMAT");
    assert_eq!(resp["details"]["field"], "project_id");
}

#[tokio::test]
async fn compact_uuids_are_accepted_and_canonicalized() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(&app, Some(&token), "manage_project", json!({"action": "create", "name": "P"})).await;
    let canonical = resp["data"]["project"]["id"].as_str().unwrap().to_string();
    let compact = canonical.replace('-', "");

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_project",
        json!({"action": "get", "project_id": compact}),
    )
    .await;
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["data"]["project"]["id"], canonical);
}

#[tokio::test]
async fn global_context_alias_via_the_wire() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_context",
        json!({
            "action": "create",
            "level": "global",
            "context_id": "global",
            "data": {"org": "acme"},
        }),
    )
    .await;
    assert_eq!(resp["status"], "success", "{resp}");
    assert_eq!(
        resp["data"]["context"]["id"],
        "00000000-0000-0000-0000-000000000001"
    );

    // JSON-string data is parsed into the object slot.
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_context",
        json!({
            "action": "update",
            "level": "global",
            "context_id": "global",
            "data": "{\"tier\": \"gold\"}",
        }),
    )
    .await;
    assert_eq!(resp["status"], "success", "{resp}");

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_context",
        json!({"action": "resolve", "level": "global", "context_id": "global"}),
    )
    .await;
    assert_eq!(resp["data"]["resolved"]["data"]["org"], "acme");
    assert_eq!(resp["data"]["resolved"]["data"]["tier"], "gold");
}

#[tokio::test]
async fn zero_assignee_task_is_a_validation_error() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(&app, Some(&token), "manage_project", json!({"action": "create", "name": "P"})).await;
    let project_id = resp["data"]["project"]["id"].as_str().unwrap().to_string();
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "create", "project_id": project_id, "name": "main"}),
    )
    .await;
    let branch_id = resp["data"]["branch"]["id"].as_str().unwrap().to_string();

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_task",
        json!({"action": "create", "git_branch_id": branch_id, "title": "T"}),
    )
    .await;
    assert_eq!(resp["error_code"], "VALIDATION_ERROR");
    assert!(resp["message"].as_str().unwrap().contains("assignee"));
}

#[tokio::test]
async fn agent_name_and_uuid_both_resolve() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(&app, Some(&token), "manage_project", json!({"action": "create", "name": "P"})).await;
    let project_id = resp["data"]["project"]["id"].as_str().unwrap().to_string();
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "create", "project_id": project_id, "name": "main"}),
    )
    .await;
    let branch_id = resp["data"]["branch"]["id"].as_str().unwrap().to_string();

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_agent",
        json!({"action": "register", "project_id": project_id, "name": "@coding-agent"}),
    )
    .await;
    assert_eq!(resp["status"], "success");
    let agent_id = resp["data"]["agent"]["id"].as_str().unwrap().to_string();

    // Assign by @name.
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "assign_agent", "branch_id": branch_id, "agent": "@coding-agent"}),
    )
    .await;
    assert_eq!(resp["status"], "success");
    assert_eq!(resp["data"]["assignment"]["agent_id"], agent_id);

    // call_agent resolves both spellings to the same descriptor.
    let by_name = call_tool(&app, Some(&token), "call_agent", json!({"agent_name": "coding-agent"})).await;
    let by_id = call_tool(&app, Some(&token), "call_agent", json!({"agent_name": agent_id})).await;
    assert_eq!(by_name["data"]["agent"]["id"], by_id["data"]["agent"]["id"]);
    assert_eq!(by_name["data"]["agent"]["call_name"], "@coding-agent");

    // Unregistered agents cannot be assigned.
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "assign_agent", "branch_id": branch_id, "agent": "@ghost-agent"}),
    )
    .await;
    assert_eq!(resp["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn completing_with_open_subtasks_warns() {
    let pool = setup_test_db().await;
    let app = build_router(build_state(test_config(), pool));
    let token = api_token(Uuid::new_v4());

    let resp = call_tool(&app, Some(&token), "manage_project", json!({"action": "create", "name": "P"})).await;
    let project_id = resp["data"]["project"]["id"].as_str().unwrap().to_string();
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_git_branch",
        json!({"action": "create", "project_id": project_id, "name": "main"}),
    )
    .await;
    let branch_id = resp["data"]["branch"]["id"].as_str().unwrap().to_string();
    let resp = call_tool(
        &app,
        Some(&token),
        "manage_task",
        json!({"action": "create", "git_branch_id": branch_id, "title": "T", "assignees": ["a"]}),
    )
    .await;
    let task_id = resp["data"]["task"]["id"].as_str().unwrap().to_string();

    call_tool(
        &app,
        Some(&token),
        "manage_subtask",
        json!({"action": "create", "task_id": task_id, "title": "open child"}),
    )
    .await;

    let resp = call_tool(
        &app,
        Some(&token),
        "manage_task",
        json!({"action": "complete", "task_id": task_id}),
    )
    .await;
    assert_eq!(resp["status"], "warning");
    assert_eq!(resp["success"], true);
    assert_eq!(resp["details"]["open_subtasks"], 1);
}
