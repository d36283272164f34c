use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::ReplyEngine;
use crate::config::SolaceConfig;
use crate::context::{ContextConfig, ContextManager};
use crate::error::StoreError;
use crate::generate::{Generator, OpenAiGenerator};
use crate::store::{ChatStore, MemoryStore};

pub struct AppState {
    pub token: Option<String>,
    pub store: Arc<dyn ChatStore>,
    pub engine: ReplyEngine,
}

#[derive(Deserialize)]
struct SendBody {
    content: String,
}

pub async fn run(config: SolaceConfig, token: Option<String>) -> anyhow::Result<()> {
    let is_loopback = config.gateway.bind == "127.0.0.1" || config.gateway.bind == "::1";

    if !is_loopback && token.is_none() {
        anyhow::bail!(
            "Auth token required when binding to non-loopback address. \
             Set --token or SOLACE_TOKEN env var."
        );
    }

    let api_key = match &config.generator.api_key {
        Some(key) => key.clone(),
        None => {
            warn!("no generator API key configured; replies will use degraded fallbacks");
            String::new()
        }
    };
    let generator: Arc<dyn Generator> = match &config.generator.base_url {
        Some(base) => Arc::new(OpenAiGenerator::with_base_url(
            base.clone(),
            api_key,
            config.generator.model.clone(),
        )),
        None => Arc::new(OpenAiGenerator::new(
            api_key,
            config.generator.model.clone(),
        )),
    };

    let store: Arc<dyn ChatStore> = Arc::new(MemoryStore::new());
    let state = Arc::new(build_state(
        token,
        store,
        generator,
        config.context_config(),
        &config,
    ));

    let addr = format!("{}:{}", config.gateway.bind, config.gateway.port);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("solace gateway listening on {addr}");
    if is_loopback {
        info!("bound to loopback — local access only");
    } else {
        warn!("bound to {addr} — ensure auth token is set");
    }

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_state(
    token: Option<String>,
    store: Arc<dyn ChatStore>,
    generator: Arc<dyn Generator>,
    context_config: ContextConfig,
    config: &SolaceConfig,
) -> AppState {
    let manager = Arc::new(ContextManager::new(
        Arc::clone(&store),
        Arc::clone(&generator),
        context_config,
    ));
    let engine = ReplyEngine::new(
        manager,
        generator,
        Arc::clone(&store),
        config.persona.clone(),
    );
    AppState {
        token,
        store,
        engine,
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat/{conversation}/history", get(history))
        .route("/chat/{conversation}/messages", post(send_message))
        .route("/chat/{conversation}/reply", post(reply))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn history(
    State(state): State<Arc<AppState>>,
    Path(conversation): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(denied) = authorize(&headers, &state.token) {
        return denied.into_response();
    }

    match state.store.fetch_recent(&conversation, 20).await {
        Ok(messages) => Json(serde_json::json!({ "messages": messages })).into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(conversation): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SendBody>,
) -> impl IntoResponse {
    if let Err(denied) = authorize(&headers, &state.token) {
        return denied.into_response();
    }

    match state.engine.send_message(&conversation, &body.content).await {
        Ok(receipt) => Json(serde_json::json!({
            "message": receipt.message,
            "first_of_day": receipt.first_of_day,
            "chat_days": receipt.chat_days,
        }))
        .into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

async fn reply(
    State(state): State<Arc<AppState>>,
    Path(conversation): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SendBody>,
) -> impl IntoResponse {
    if let Err(denied) = authorize(&headers, &state.token) {
        return denied.into_response();
    }

    match state.engine.reply(&conversation, &body.content).await {
        Ok(message) => Json(serde_json::json!({ "message": message })).into_response(),
        Err(e) => store_error(e).into_response(),
    }
}

/// Bearer-token check. No token configured means open (loopback mode).
fn authorize(
    headers: &HeaderMap,
    expected: &Option<String>,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "auth_failed" })),
        )),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

fn store_error(e: StoreError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
}
