use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Application configuration loaded from environment variables.
/// Fails at startup if the API key is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_api_base: String,
    pub port: u16,
    pub rust_log: String,
    /// Inert wait applied before answering with the quota warning.
    pub quota_cooldown: Duration,
    /// Sessions idle for longer than this are discarded with their upload.
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    /// Full path to the PDFium shared library; the system library is used when unset.
    pub pdfium_library_path: Option<String>,
    pub render_dpi: f32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            google_api_key: require_env("GOOGLE_API_KEY")?,
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            quota_cooldown: Duration::from_secs(parse_env("QUOTA_COOLDOWN_SECS", 10)?),
            session_ttl: Duration::from_secs(parse_env("SESSION_TTL_SECS", 3600)?),
            max_upload_bytes: megabytes_to_bytes(parse_env("MAX_UPLOAD_MB", 200)?)?,
            pdfium_library_path: std::env::var("PDFIUM_LIBRARY_PATH").ok(),
            render_dpi: parse_env("RENDER_DPI", 200.0)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn megabytes_to_bytes(megabytes: usize) -> Result<usize> {
    megabytes
        .checked_mul(1024 * 1024)
        .with_context(|| format!("MAX_UPLOAD_MB={megabytes} does not fit in memory addresses"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by handler and router tests; never reads the environment.
    pub fn for_tests() -> Self {
        Config {
            google_api_key: "test-key".to_string(),
            gemini_api_base: "http://127.0.0.1:0".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            quota_cooldown: Duration::from_secs(10),
            session_ttl: Duration::from_secs(3600),
            max_upload_bytes: 1024 * 1024,
            pdfium_library_path: None,
            render_dpi: 200.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_limit_in_bytes() {
        assert_eq!(megabytes_to_bytes(200).unwrap(), 200 * 1024 * 1024);
    }

    #[test]
    fn test_upload_limit_overflow_is_an_error() {
        let err = megabytes_to_bytes(usize::MAX).unwrap_err();
        assert!(err.to_string().contains("MAX_UPLOAD_MB"), "got {err}");
    }
}
