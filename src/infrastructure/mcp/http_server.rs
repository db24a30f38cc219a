//! HTTP server wiring: routes, state construction, and serve loop.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::adapters::sqlite::Migrator;
use crate::domain::models::Config;
use crate::domain::ports::ChangeNotifier;
use crate::infrastructure::mcp::dispatcher::{bearer_token, handle_rpc, ServerState};
use crate::services::broadcast::BroadcastNotifier;
use crate::services::{DelegationProcessor, FacadeRegistry, InheritanceCache, TokenVerifier};

/// Build the full application state from a live pool.
pub fn build_state(config: Arc<Config>, pool: SqlitePool) -> ServerState {
    let cache = Arc::new(InheritanceCache::new(config.cache.inheritance_capacity));
    let events = BroadcastNotifier::new(256);
    let notifier: Arc<dyn ChangeNotifier> = Arc::new(events.clone());

    let processor = Arc::new(DelegationProcessor::new(
        pool.clone(),
        cache.clone(),
        notifier.clone(),
        config.limits.delegation_max_attempts,
    ));

    let registry = Arc::new(FacadeRegistry::new(
        pool,
        config.clone(),
        cache,
        processor,
        notifier,
    ));

    let verifier = Arc::new(TokenVerifier::new(config.auth.clone()));
    let limiter = ServerState::build_limiter(&config);

    ServerState { config, verifier, registry, events, limiter }
}

pub fn build_router(state: ServerState) -> Router {
    let body_limit = state.config.server.max_payload_bytes;
    Router::new()
        .route("/", post(handle_rpc))
        .route("/health", get(health))
        .route("/events", get(events))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run migrations and serve until shutdown.
pub async fn serve(config: Arc<Config>, pool: SqlitePool) -> Result<()> {
    let applied = Migrator::new(pool.clone())
        .run()
        .await
        .context("Failed to run database migrations")?;
    if applied > 0 {
        info!(applied, "Applied schema migrations");
    }

    let state = build_state(config.clone(), pool);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(addr = %addr, "Taskhub MCP server listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Plain liveness endpoint; no auth required.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "taskhub",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Server-Sent-Events stream of the caller's own change events.
async fn events(State(state): State<ServerState>, headers: HeaderMap) -> axum::response::Response {
    let Some(token) = bearer_token(&headers) else {
        return unauthorized();
    };
    let principal = match state.verifier.verify(&token).await {
        Ok(principal) => principal,
        Err(_) => return unauthorized(),
    };

    let stream = user_event_stream(&state.events, principal.user_id);
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

fn user_event_stream(
    events: &BroadcastNotifier,
    user_id: uuid::Uuid,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let subscription = events.subscribe(user_id);
    futures::stream::unfold(subscription, |mut sub| async move {
        let event = sub.recv().await?;
        let sse_event = Event::default()
            .event(event.event.clone())
            .json_data(&event)
            .unwrap_or_else(|_| Event::default().data("serialization error"));
        Some((Ok(sse_event), sub))
    })
}

fn unauthorized() -> axum::response::Response {
    (
        axum::http::StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "status": "error",
            "success": false,
            "error_code": "UNAUTHENTICATED",
            "message": "Authentication required",
        })),
    )
        .into_response()
}
