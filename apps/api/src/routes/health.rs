use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::gemini::MODEL;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and live session count.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "ats-scanner",
        "model": MODEL,
        "sessions": state.sessions.len().await
    }))
}
