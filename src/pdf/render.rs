//! Page rasterization
//!
//! Turns parsed PDF pages into encoded JPEG bytes at a configured DPI and
//! quality. Pure transform: nothing here touches disk; the preview store
//! owns persistence.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use mupdf::{Colorspace, Matrix};

use crate::config::RenderConfig;

use super::document::PdfDoc;
use super::error::{PdfError, PdfResult};

/// PDF points per inch; DPI divided by this gives the raster scale.
const POINTS_PER_INCH: f32 = 72.0;

/// Renders document pages to JPEG at fixed settings.
///
/// Settings are immutable after construction; a renderer is cheap to clone
/// and safe to share.
#[derive(Debug, Clone)]
pub struct PageRenderer {
    settings: RenderConfig,
}

impl PageRenderer {
    /// Validate the settings and build a renderer.
    ///
    /// DPI must be positive and quality in (0, 1]; quality 1.0 selects the
    /// encoder default.
    pub fn new(settings: RenderConfig) -> PdfResult<Self> {
        if settings.dpi == 0 {
            return Err(PdfError::InvalidInput("dpi must be positive".to_string()));
        }
        if !(settings.quality > 0.0 && settings.quality <= 1.0) {
            return Err(PdfError::InvalidInput(format!(
                "quality {} is outside (0, 1]",
                settings.quality
            )));
        }

        Ok(Self { settings })
    }

    pub fn settings(&self) -> RenderConfig {
        self.settings
    }

    /// Render a single page (1-based) to JPEG bytes.
    pub async fn render_page(&self, doc: &Arc<PdfDoc>, page: usize) -> PdfResult<Vec<u8>> {
        let pages = doc.page_count();
        if page == 0 || page > pages {
            return Err(PdfError::PageOutOfRange { page, pages });
        }

        let doc = Arc::clone(doc);
        let scale = self.settings.dpi as f32 / POINTS_PER_INCH;
        let quality = self.settings.quality;

        tokio::task::spawn_blocking(move || {
            doc.with_doc(|mupdf_doc| {
                let pdf_page = mupdf_doc.load_page((page - 1) as i32)?;

                let matrix = Matrix::new_scale(scale, scale);
                let colorspace = Colorspace::device_rgb();

                // Opaque RGB; extras stay on so widget annotations (form
                // fields with regenerated appearances) are part of the raster.
                let pixmap = pdf_page.to_pixmap(&matrix, &colorspace, false, true)?;

                encode_jpeg(&pixmap, quality)
            })
        })
        .await
        .map_err(|e| PdfError::WorkerLost(format!("Task join error: {}", e)))?
    }

    /// Render an inclusive 1-based page range, clamped to the document.
    ///
    /// A start past the last page yields an empty sequence; any page failure
    /// fails the whole call. Callers that want to keep partial output render
    /// page by page instead.
    pub async fn render_range(
        &self,
        doc: &Arc<PdfDoc>,
        start: usize,
        end: usize,
    ) -> PdfResult<Vec<Vec<u8>>> {
        if start == 0 {
            return Err(PdfError::InvalidInput(
                "page range is 1-based".to_string(),
            ));
        }

        let end = end.min(doc.page_count());
        if start > end {
            return Ok(Vec::new());
        }

        let mut pages = Vec::with_capacity(end - start + 1);
        for page in start..=end {
            pages.push(self.render_page(doc, page).await?);
        }

        Ok(pages)
    }
}

fn encode_jpeg(pixmap: &mupdf::Pixmap, quality: f32) -> PdfResult<Vec<u8>> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    let img = image::RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| PdfError::Encode("Failed to create image buffer".to_string()))?;
    let dynamic_img = DynamicImage::ImageRgb8(img);

    let mut output = Vec::new();
    if quality >= 1.0 {
        // Encoder default quality.
        dynamic_img
            .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Jpeg)
            .map_err(|e| PdfError::Encode(e.to_string()))?;
    } else {
        let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
        let mut cursor = Cursor::new(&mut output);
        let encoder = JpegEncoder::new_with_quality(&mut cursor, q);
        dynamic_img
            .write_with_encoder(encoder)
            .map_err(|e| PdfError::Encode(e.to_string()))?;
    }

    Ok(output)
}
