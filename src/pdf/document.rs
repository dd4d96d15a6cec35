//! Parsed PDF handle
//!
//! MuPDF documents are not thread-safe, so the handle never holds a native
//! document across operations. It keeps the raw bytes plus the page count
//! probed at parse time, opens a fresh engine document for each operation,
//! and serializes operations through a mutex. The native document is created
//! and dropped entirely inside the closure that uses it.

use std::sync::Arc;

use mupdf::Document;
use parking_lot::Mutex;

use super::error::{PdfError, PdfResult};
use super::MIME_PDF;

/// A validated PDF: the source bytes and the page count.
pub struct PdfDoc {
    data: Arc<Vec<u8>>,
    page_count: usize,
    lock: Mutex<()>,
}

impl PdfDoc {
    /// Parse the bytes as a PDF, probing the page count.
    ///
    /// Fails with [`PdfError::Parse`] when the engine rejects the bytes.
    pub fn parse(data: Vec<u8>) -> PdfResult<Self> {
        let doc =
            Document::from_bytes(&data, MIME_PDF).map_err(|e| PdfError::Parse(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| PdfError::Parse(e.to_string()))? as usize;

        Ok(Self {
            data: Arc::new(data),
            page_count,
            lock: Mutex::new(()),
        })
    }

    /// Number of pages found at parse time.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Run a closure against a freshly opened engine document.
    ///
    /// Access is serialized; the native document never escapes the closure
    /// and is dropped when the closure returns.
    pub fn with_doc<F, R>(&self, f: F) -> PdfResult<R>
    where
        F: FnOnce(&Document) -> PdfResult<R>,
    {
        let _guard = self.lock.lock();

        let doc = Document::from_bytes(&self.data, MIME_PDF)
            .map_err(|e| PdfError::Parse(e.to_string()))?;

        f(&doc)
    }
}
