//! PDFium-backed rasterizer (dynamically linked).

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;

use super::{encode_jpeg, ConversionError, PageRasterizer};

const POINTS_PER_INCH: f32 = 72.0;

pub struct PdfiumRasterizer {
    library_path: Option<String>,
    dpi: f32,
}

impl PdfiumRasterizer {
    pub fn new(library_path: Option<String>, dpi: f32) -> Self {
        Self { library_path, dpi }
    }

    /// Binds to libpdfium: the configured path if any, otherwise the working
    /// directory and then the system library paths.
    fn bind(&self) -> Result<Pdfium, ConversionError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ConversionError::Backend(format!("Failed to load PDFium library: {e:?}")))?;

        Ok(Pdfium::new(bindings))
    }

    /// Checks that the library can be loaded. Used once at startup.
    pub fn probe(&self) -> Result<(), ConversionError> {
        self.bind().map(|_| ())
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_first_page(&self, pdf: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ConversionError::Pdf(format!("{e:?}")))?;
        let page = document
            .pages()
            .first()
            .map_err(|_| ConversionError::EmptyDocument)?;

        let config = PdfRenderConfig::new().scale_page_by_factor(self.dpi / POINTS_PER_INCH);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ConversionError::Pdf(format!("{e:?}")))?;

        let (width, height) = (bitmap.width() as u32, bitmap.height() as u32);
        let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
            ConversionError::Backend(format!("bitmap buffer does not match {width}x{height}"))
        })?;

        // JPEG has no alpha channel.
        encode_jpeg(&DynamicImage::ImageRgba8(rgba).to_rgb8())
    }
}
