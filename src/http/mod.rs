//! HTTP server module
//!
//! This module is the upload/download boundary around the conversion core:
//! - Axum router with the conversion and status endpoints
//! - Multipart upload handling and WAV extension check
//! - MP3 download responses and failure status mapping
//! - CORS, tracing and body-size middleware

pub mod handlers;
pub mod routes;

pub use routes::create_router;
