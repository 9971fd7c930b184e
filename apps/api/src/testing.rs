//! Fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::converter::{ConversionError, PageImage, PageRasterizer};
use crate::gemini::{GenerativeModel, ModelError};

/// Pretends to rasterize anything that starts with the PDF magic and counts calls.
#[derive(Default)]
pub struct CountingRasterizer {
    pub calls: AtomicUsize,
}

impl CountingRasterizer {
    pub fn jpeg_for(pdf: &[u8]) -> Vec<u8> {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(pdf);
        jpeg
    }
}

impl PageRasterizer for CountingRasterizer {
    fn render_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !pdf.starts_with(b"%PDF") {
            return Err(ConversionError::Pdf("missing %PDF header".to_string()));
        }
        Ok(Self::jpeg_for(pdf))
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Quota,
    ApiError(u16),
}

/// Answers every call with the same scripted reply and records the last request.
pub struct ScriptedModel {
    reply: Reply,
    pub calls: AtomicUsize,
    last: Mutex<Option<(String, String, String)>>,
}

impl ScriptedModel {
    pub fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    /// (instruction, image MIME type, job description) of the latest call.
    pub fn last_request(&self) -> Option<(String, String, String)> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        instruction: &str,
        image: &PageImage,
        job_description: &str,
    ) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((
            instruction.to_string(),
            image.mime_type.clone(),
            job_description.to_string(),
        ));
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Quota => Err(ModelError::QuotaExhausted("quota exceeded".to_string())),
            Reply::ApiError(status) => Err(ModelError::Api {
                status: *status,
                message: "rejected".to_string(),
            }),
        }
    }
}
