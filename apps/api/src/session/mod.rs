//! Per-session input store.
//!
//! A session holds at most one uploaded résumé and the page image derived from
//! it. Sessions are created when the form loads, the upload is replaced on
//! re-upload, and everything is dropped when the session ends or goes idle.

pub mod handlers;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::converter::{short_digest, PageImage};

/// Raw PDF bytes as uploaded through the form.
#[derive(Debug, Clone)]
pub struct UploadedResume {
    pub filename: String,
    pub bytes: Bytes,
    /// Lowercase hex SHA-256 of `bytes`. Keys the page image cache.
    pub digest: String,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedResume {
    pub fn new(filename: String, bytes: Bytes) -> Self {
        let digest = format!("{:x}", Sha256::digest(&bytes));
        Self {
            filename,
            bytes,
            digest,
            uploaded_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> ResumeSummary {
        ResumeSummary {
            filename: self.filename.clone(),
            size_bytes: self.bytes.len(),
            uploaded_at: self.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeSummary {
    pub filename: String,
    pub size_bytes: usize,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CachedPage {
    digest: String,
    image: PageImage,
}

/// The single upload slot of a session.
#[derive(Debug, Default)]
pub struct ResumeSlot {
    resume: Option<UploadedResume>,
    page: Option<CachedPage>,
}

impl ResumeSlot {
    pub fn resume(&self) -> Option<&UploadedResume> {
        self.resume.as_ref()
    }

    /// Stores a new upload. A cached page survives only if the content is identical.
    pub fn replace(&mut self, resume: UploadedResume) {
        if self
            .page
            .as_ref()
            .is_some_and(|page| page.digest != resume.digest)
        {
            self.page = None;
        }
        self.resume = Some(resume);
    }

    pub fn cached_page(&self, digest: &str) -> Option<&PageImage> {
        self.page
            .as_ref()
            .filter(|page| page.digest == digest)
            .map(|page| &page.image)
    }

    pub fn store_page(&mut self, digest: String, image: PageImage) {
        self.page = Some(CachedPage { digest, image });
    }
}

pub struct Session {
    pub id: Uuid,
    /// Held for the whole of an analysis, so presses within a session run one at a time.
    slot: Mutex<ResumeSlot>,
    last_seen: std::sync::Mutex<Instant>,
}

impl Session {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            slot: Mutex::new(ResumeSlot::default()),
            last_seen: std::sync::Mutex::new(Instant::now()),
        }
    }

    pub fn slot(&self) -> &Mutex<ResumeSlot> {
        &self.slot
    }

    fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .map(|last_seen| last_seen.elapsed())
            .unwrap_or_default()
    }
}

/// All live sessions, keyed by id.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
}

impl SessionStore {
    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new());
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));
        info!("Session {} started", session.id);
        session
    }

    /// Looks a session up and marks it as active.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Ends a session, discarding its upload and cached page.
    pub async fn end(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Session {id} ended");
        }
        removed
    }

    /// Drops every session idle for longer than `ttl`. Returns how many were dropped.
    pub async fn expire_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = session.idle_for() <= ttl;
            if !keep {
                info!("Session {id} expired after {}s idle", session.idle_for().as_secs());
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Periodically expires idle sessions for as long as the server runs.
pub fn spawn_sweeper(store: SessionStore, ttl: Duration) -> JoinHandle<()> {
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            store.expire_idle(ttl).await;
        }
    })
}

pub(crate) fn log_upload(session_id: Uuid, resume: &UploadedResume) {
    info!(
        "Session {session_id}: stored '{}' ({} bytes, digest {})",
        resume.filename,
        resume.bytes.len(),
        short_digest(&resume.digest)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(content: &'static [u8]) -> UploadedResume {
        UploadedResume::new("cv.pdf".to_string(), Bytes::from_static(content))
    }

    fn page(data: &str) -> PageImage {
        PageImage {
            mime_type: "image/jpeg".to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_digest_is_content_based() {
        let a = upload(b"%PDF-1.4 a");
        let b = upload(b"%PDF-1.4 a");
        let c = upload(b"%PDF-1.4 c");
        assert_eq!(a.digest, b.digest);
        assert_ne!(a.digest, c.digest);
        assert_eq!(a.digest.len(), 64);
    }

    #[test]
    fn test_replace_with_new_content_drops_cached_page() {
        let mut slot = ResumeSlot::default();
        let first = upload(b"%PDF-1.4 a");
        let digest = first.digest.clone();
        slot.replace(first);
        slot.store_page(digest.clone(), page("AAAA"));
        assert!(slot.cached_page(&digest).is_some());

        slot.replace(upload(b"%PDF-1.4 b"));
        assert!(slot.cached_page(&digest).is_none());
        assert_eq!(slot.resume().unwrap().filename, "cv.pdf");
    }

    #[tokio::test]
    async fn test_store_lifecycle() {
        let store = SessionStore::default();
        let session = store.create().await;
        assert_eq!(store.len().await, 1);
        assert!(session.slot().lock().await.resume().is_none());

        session.slot().lock().await.replace(upload(b"%PDF-1.4"));
        let fetched = store.get(session.id).await.unwrap();
        assert!(fetched.slot().lock().await.resume().is_some());

        assert!(store.end(session.id).await);
        assert!(!store.end(session.id).await);
        assert!(store.get(session.id).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_expire() {
        let store = SessionStore::default();
        let idle = store.create().await;
        let active = store.create().await;

        tokio::time::advance(Duration::from_secs(50)).await;
        store.get(active.id).await;
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(store.expire_idle(Duration::from_secs(60)).await, 1);
        assert!(store.get(idle.id).await.is_none());
        assert!(store.get(active.id).await.is_some());
    }
}
