//! Luma viewer: windowed host around the `luma-core` pipeline.
//!
//! Split into a library so the handler and config logic stay
//! testable; `main.rs` is glue.

pub mod app;
pub mod config;
