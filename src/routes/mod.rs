//! Route modules for the docpreview server

pub mod docs;
