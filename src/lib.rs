//! Docpreview Server Library
//!
//! Document store with per-page PDF preview rendering and
//! conditional-caching delivery. The server binary is in main.rs; this
//! crate exposes the modules that integration tests drive directly.
//!
//! # Modules
//!
//! - `docs`: wire types and the ingest pipeline
//! - `pdf`: PDF parsing and page rasterization via MuPDF
//! - `preview`: on-disk store for rendered pages and their fingerprints
//! - `routes`: the REST surface

pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod hash;
pub mod pdf;
pub mod preview;
pub mod routes;
pub mod state;
