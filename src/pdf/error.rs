//! PDF engine error taxonomy

use thiserror::Error;

pub type PdfResult<T> = std::result::Result<T, PdfError>;

#[derive(Debug, Error)]
pub enum PdfError {
    /// The bytes did not open as a PDF document.
    #[error("Failed to open PDF document: {0}")]
    Parse(String),

    /// A page index outside 1..=page_count was requested directly.
    #[error("Page {page} does not exist (document has {pages} pages)")]
    PageOutOfRange { page: usize, pages: usize },

    /// Render settings or range arguments outside their contract.
    #[error("Invalid render input: {0}")]
    InvalidInput(String),

    /// The engine failed while rasterizing a page.
    #[error("Failed to render page: {0}")]
    Render(String),

    /// The raster could not be encoded to the output image format.
    #[error("Failed to encode page image: {0}")]
    Encode(String),

    /// The blocking worker running the engine went away before the native
    /// document's release could be confirmed. Unlike Render/Encode this is
    /// not recoverable bookkeeping; callers must surface it.
    #[error("Render worker lost: {0}")]
    WorkerLost(String),
}

impl From<mupdf::Error> for PdfError {
    fn from(err: mupdf::Error) -> Self {
        PdfError::Render(err.to_string())
    }
}
