//! HTTP server plumbing.
//!
//! - Plain HTTP listener served by `axum::serve`
//! - Graceful shutdown on SIGTERM/SIGINT
//! - CORS policy and static file service used by the router

pub mod cors;
mod server;
mod shutdown;
pub mod static_files;

pub use server::{start_server, ServerError};
