use crate::analysis::Analyzer;
use crate::config::Config;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Converter plus model client. The model is an `Arc<dyn GenerativeModel>`
    /// so tests can script its replies.
    pub analyzer: Analyzer,
    pub config: Config,
}
