//! HTTP surface (axum).
//!
//! Thin adapter over `tgcast-core`: parses request bodies, rejects missing
//! fields with 400 and maps core errors onto one success/failure verdict.

pub mod handlers;
pub mod router;

pub use router::{build_router, serve, AppState};
