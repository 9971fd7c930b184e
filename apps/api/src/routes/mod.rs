pub mod health;
pub mod ui;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::analysis::handlers::handle_analyze;
use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_end_session),
        )
        .route(
            "/api/v1/sessions/:id/resume",
            put(handlers::handle_upload_resume),
        )
        .route("/api/v1/sessions/:id/analyze", post(handle_analyze))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
