use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::{Action, Rendered};
use crate::errors::AppError;
use crate::session::handlers::session_not_found;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub action: Action,
    #[serde(default)]
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub action: Action,
    pub result: Rendered,
}

/// POST /api/v1/sessions/:id/analyze
///
/// Holds the session's slot for the whole call, so a second press on the same
/// session waits for the first to finish.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| session_not_found(id))?;
    let mut slot = session.slot().lock().await;

    let result = state
        .analyzer
        .analyze(request.action, &request.job_description, &mut slot)
        .await?;

    Ok(Json(AnalyzeResponse {
        action: request.action,
        result,
    }))
}
