//! Preview storage module
//!
//! Filesystem-backed store for rendered page images and fingerprint
//! sidecars, behind a trait so delivery code never touches paths.

mod store;

pub use store::{FilesystemPreviewStore, PreviewStore};
