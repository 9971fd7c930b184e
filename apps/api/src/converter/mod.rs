//! Document converter: turns page 1 of an uploaded PDF into a base64 JPEG
//! the model can read.
//!
//! Rasterization is pluggable through `PageRasterizer`. The production backend
//! is PDFium (`pdfium::PdfiumRasterizer`); tests use an in-memory fake.

pub mod pdfium;

use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::session::{ResumeSlot, UploadedResume};

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("No file uploaded")]
    NoFile,

    #[error("PDF rendering backend unavailable: {0}")]
    Backend(String),

    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("PDF has no pages")]
    EmptyDocument,

    #[error("JPEG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Rasterization worker failed: {0}")]
    Worker(String),
}

/// An encoded page ready to be attached to a model request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageImage {
    pub mime_type: String,
    pub data: String,
}

impl PageImage {
    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        Self {
            mime_type: JPEG_MIME_TYPE.to_string(),
            data: STANDARD.encode(jpeg),
        }
    }
}

/// Renders the first page of a PDF document to JPEG bytes.
///
/// Implementations are blocking; the converter runs them on the blocking pool.
pub trait PageRasterizer: Send + Sync {
    fn render_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>, ConversionError>;
}

#[derive(Clone)]
pub struct DocumentConverter {
    rasterizer: Arc<dyn PageRasterizer>,
}

impl DocumentConverter {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self { rasterizer }
    }

    /// Rasterizes page 1 of `resume`. Always does the work; see `page_image`
    /// for the cached variant.
    pub async fn convert(
        &self,
        resume: Option<&UploadedResume>,
    ) -> Result<PageImage, ConversionError> {
        let resume = resume.ok_or(ConversionError::NoFile)?;
        let rasterizer = Arc::clone(&self.rasterizer);
        let pdf = resume.bytes.clone();

        let jpeg = tokio::task::spawn_blocking(move || rasterizer.render_first_page(&pdf))
            .await
            .map_err(|e| ConversionError::Worker(e.to_string()))??;

        info!(
            "Rasterized page 1 of '{}' ({} bytes PDF -> {} bytes JPEG)",
            resume.filename,
            resume.bytes.len(),
            jpeg.len()
        );
        Ok(PageImage::from_jpeg(&jpeg))
    }

    /// Returns the page image for the slot's current upload, reusing the
    /// slot's cached image when the upload's content digest is unchanged.
    pub async fn page_image(&self, slot: &mut ResumeSlot) -> Result<PageImage, ConversionError> {
        let resume = slot.resume().ok_or(ConversionError::NoFile)?;
        let digest = resume.digest.clone();

        if let Some(cached) = slot.cached_page(&digest) {
            debug!("Page image cache hit for digest {}", short_digest(&digest));
            return Ok(cached.clone());
        }

        debug!("Page image cache miss for digest {}", short_digest(&digest));
        let image = self.convert(slot.resume()).await?;
        slot.store_page(digest, image.clone());
        Ok(image)
    }
}

/// Encodes an RGB raster as a baseline JPEG.
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, ConversionError> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}

pub fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use bytes::Bytes;

    use super::*;
    use crate::testing::CountingRasterizer;

    fn resume(content: &'static [u8]) -> UploadedResume {
        UploadedResume::new("cv.pdf".to_string(), Bytes::from_static(content))
    }

    #[tokio::test]
    async fn test_convert_without_upload_is_no_file() {
        let converter = DocumentConverter::new(Arc::new(CountingRasterizer::default()));
        let err = converter.convert(None).await.unwrap_err();
        assert!(matches!(err, ConversionError::NoFile));
        assert_eq!(err.to_string(), "No file uploaded");
    }

    #[tokio::test]
    async fn test_convert_produces_base64_jpeg() {
        let converter = DocumentConverter::new(Arc::new(CountingRasterizer::default()));
        let upload = resume(b"%PDF-1.7 one page");
        let image = converter.convert(Some(&upload)).await.unwrap();

        assert_eq!(image.mime_type, "image/jpeg");
        let decoded = STANDARD.decode(&image.data).unwrap();
        assert_eq!(decoded, CountingRasterizer::jpeg_for(b"%PDF-1.7 one page"));
    }

    #[tokio::test]
    async fn test_page_image_is_cached_per_digest() {
        let rasterizer = Arc::new(CountingRasterizer::default());
        let converter = DocumentConverter::new(rasterizer.clone());
        let mut slot = ResumeSlot::default();
        slot.replace(resume(b"%PDF-1.7 first"));

        let first = converter.page_image(&mut slot).await.unwrap();
        let second = converter.page_image(&mut slot).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);

        // Same bytes uploaded again keep the cache.
        slot.replace(resume(b"%PDF-1.7 first"));
        converter.page_image(&mut slot).await.unwrap();
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);

        slot.replace(resume(b"%PDF-1.7 second"));
        let third = converter.page_image(&mut slot).await.unwrap();
        assert_ne!(first, third);
        assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_malformed_pdf_surfaces_error() {
        let converter = DocumentConverter::new(Arc::new(CountingRasterizer::default()));
        let mut slot = ResumeSlot::default();
        slot.replace(resume(b"not a pdf"));

        let err = converter.page_image(&mut slot).await.unwrap_err();
        assert!(matches!(err, ConversionError::Pdf(_)));
        assert!(slot.cached_page(&slot.resume().unwrap().digest).is_none());
    }

    #[test]
    fn test_encode_jpeg_writes_jpeg_magic() {
        let image = RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
        let jpeg = encode_jpeg(&image).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
