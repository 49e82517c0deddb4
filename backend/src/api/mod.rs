//! HTTP API module.
//!
//! Upload, preview and download endpoints around the file-level pipeline.

pub mod server;
pub mod types;

pub use server::{router, start_server, AppState};
pub use types::*;
