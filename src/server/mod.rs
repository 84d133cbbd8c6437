//! The AI-actions HTTP surface: one POST endpoint that holds the LLM
//! key on behalf of browser clients, plus a health probe.

pub mod api;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Json, Router, http::StatusCode};
use tower_http::cors::CorsLayer;

use crate::ai::{ActionPlanner, LlmClient, LlmPlanner};
use crate::config::Config;
use crate::errors::ConfigError;

pub use api::{AppState, SharedState};

/// Build the application router. Every route allows cross-origin calls;
/// browser clients live on a different origin than this endpoint.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not found"})),
    )
}

/// Start the server. A missing LLM key is not fatal here: the server
/// comes up and reports the misconfiguration per request instead.
pub async fn serve(config: &Config) -> Result<()> {
    let planner: Option<Arc<dyn ActionPlanner>> = match LlmClient::new(config) {
        Ok(client) => Some(Arc::new(LlmPlanner::new(client))),
        Err(ConfigError::AiNotConfigured) => {
            tracing::warn!("LLM_API_BASE/LLM_API_KEY not set; /api/ai-actions will return 500");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let app = build_router(Arc::new(AppState { planner }));

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("taskcanvas AI endpoint running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    println!("\nShutting down...");
}
