use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::ai::{ActionPlanner, FALLBACK_MESSAGE};
use crate::models::TaskSummary;
use crate::util::extract_json_payload;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    /// `None` when the LLM key is absent; requests then get a 500.
    pub planner: Option<Arc<dyn ActionPlanner>>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AiActionsRequest {
    pub message: String,
    #[serde(rename = "existingTasks", default)]
    pub existing_tasks: Vec<TaskSummary>,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/ai-actions", post(ai_actions))
        .route("/health", get(health))
}

async fn health() -> &'static str {
    "ok"
}

/// Translate one user message into the LLM's action JSON. The client
/// executes the actions itself; this endpoint only holds the key.
async fn ai_actions(
    State(state): State<SharedState>,
    Json(req): Json<AiActionsRequest>,
) -> Result<Json<Value>, ApiError> {
    let planner = state
        .planner
        .as_ref()
        .ok_or_else(|| ApiError::Internal("AI endpoint is not configured".to_string()))?;

    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let raw = planner
        .plan(&req.message, &req.existing_tasks)
        .await
        .map_err(|e| {
            eprintln!("[api] ai-actions planner call failed: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    // Unparseable replies degrade to the fixed message object; clients
    // never see raw LLM prose.
    let response = extract_json_payload(&raw)
        .and_then(|payload| serde_json::from_str::<Value>(&payload).ok())
        .unwrap_or_else(|| json!({"message": FALLBACK_MESSAGE}));

    Ok(Json(json!({"response": response})))
}
