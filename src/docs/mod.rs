//! Doc domain module
//!
//! Wire types, validation, and the ingest pipeline that ties the metadata
//! store, the PDF engine, and the preview store together.

mod ingest;
mod types;

pub use ingest::IngestService;
pub use types::{DocDto, DESCRIPTION_MAX_LEN, TITLE_MIN_LEN};
