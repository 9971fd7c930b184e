use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::session::{log_upload, ResumeSummary, UploadedResume};
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";
const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub resume: Option<ResumeSummary>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub resume: ResumeSummary,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreated>) {
    let session = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id,
        }),
    )
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStatus>, AppError> {
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| session_not_found(id))?;
    let slot = session.slot().lock().await;
    Ok(Json(SessionStatus {
        session_id: id,
        resume: slot.resume().map(UploadedResume::summary),
    }))
}

/// PUT /api/v1/sessions/:id/resume
///
/// Stores the multipart `resume` field, replacing any earlier upload.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let upload_limit = state.config.max_upload_bytes;
    let session = state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| session_not_found(id))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, upload_limit))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("resume.pdf").to_string();
        let is_pdf = filename.to_lowercase().ends_with(".pdf")
            || field.content_type() == Some(PDF_CONTENT_TYPE);
        if !is_pdf {
            return Err(AppError::Validation(format!(
                "'{filename}' is not a PDF; only .pdf files are accepted"
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, upload_limit))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("The uploaded file is empty".to_string()));
        }

        let resume = UploadedResume::new(filename, bytes);
        log_upload(id, &resume);
        let summary = resume.summary();
        session.slot().lock().await.replace(resume);

        return Ok(Json(UploadResponse {
            message: "PDF uploaded successfully",
            resume: summary,
        }));
    }

    Err(AppError::Validation(format!(
        "multipart field '{RESUME_FIELD}' is required"
    )))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.end(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}

/// Oversized bodies surface as a multipart read failure carrying 413.
fn multipart_error(e: MultipartError, limit_bytes: usize) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit_bytes }
    } else {
        AppError::Validation(e.body_text())
    }
}

pub(crate) fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {id} not found"))
}
