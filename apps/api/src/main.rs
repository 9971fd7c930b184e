mod analysis;
mod config;
mod converter;
mod errors;
mod gemini;
mod routes;
mod session;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::Analyzer;
use crate::config::Config;
use crate::converter::pdfium::PdfiumRasterizer;
use crate::converter::DocumentConverter;
use crate::gemini::GeminiClient;
use crate::routes::build_router;
use crate::session::{spawn_sweeper, SessionStore};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on a missing API key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ATS Resume Scanner v{}", env!("CARGO_PKG_VERSION"));

    // Rasterizer: PDFium is loaded per conversion; check once that it is reachable.
    let rasterizer = PdfiumRasterizer::new(config.pdfium_library_path.clone(), config.render_dpi);
    match rasterizer.probe() {
        Ok(()) => info!("PDFium available (rendering at {} DPI)", config.render_dpi),
        Err(e) => warn!("{e}; résumé conversion will fail until libpdfium is installed"),
    }
    let converter = DocumentConverter::new(Arc::new(rasterizer));

    // Initialize model client
    let gemini = GeminiClient::new(config.gemini_api_base.clone(), config.google_api_key.clone())?;
    info!("Gemini client initialized (model: {})", gemini::MODEL);

    let analyzer = Analyzer::new(converter, Arc::new(gemini), config.quota_cooldown);

    let sessions = SessionStore::default();
    spawn_sweeper(sessions.clone(), config.session_ttl);
    info!("Session idle timeout: {}s", config.session_ttl.as_secs());

    // Build app state
    let state = AppState {
        sessions,
        analyzer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
