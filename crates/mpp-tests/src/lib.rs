//! Integration tests for MPP-RS crates.
//!
//! This crate contains end-to-end tests that fit models to synthetic
//! measurements and push them through the file format and query
//! interfaces of the other crates.
