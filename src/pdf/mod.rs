//! PDF engine
//!
//! Parses uploaded PDF bytes and rasterizes pages to JPEG via mupdf.
//! All engine work runs on blocking threads; the rest of the crate only
//! sees `PdfDoc` handles and encoded page bytes.

mod document;
mod error;
mod render;

pub use document::PdfDoc;
pub use error::{PdfError, PdfResult};
pub use render::PageRenderer;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JPEG: &str = "image/jpeg";
