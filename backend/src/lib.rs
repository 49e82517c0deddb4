//! # csvclean - Sales CSV normalization
//!
//! csvclean turns messy spreadsheet exports of sales records (inconsistent
//! headers, mixed-case text, currency-formatted numbers, ambiguous dates,
//! duplicate rows) into one canonical, analysis-ready table.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Raw CSV    │────▶│   Parser    │────▶│  Transform  │────▶│ Cleaned CSV │
//! │ (any enc.)  │     │ (fallbacks) │     │ (4 stages)  │     │   (UTF-8)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvclean::{clean_file, CleanOptions};
//! use std::path::Path;
//!
//! let report = clean_file(
//!     Path::new("raw.csv"),
//!     Path::new("cleaned.csv"),
//!     &CleanOptions::default(),
//! )?;
//! println!("Rows: {} | Columns: {}", report.rows, report.columns);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types and non-fatal diagnostics
//! - [`models`] - Canonical fields, cells and the column-oriented table
//! - [`parser`] - Resilient reader and canonical writer
//! - [`transform`] - Header normalization, cleaners, reconciliation, pipeline
//! - [`report`] - Summary statistics
//! - [`api`] - HTTP upload/preview/download server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Statistics
pub mod report;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    Diagnostics, IngestionError, OutputError, PipelineError, SchemaWarning, ServerError,
    ValueCoercionWarning,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CanonicalField, Cell, Column, FieldKind, Table};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    detect_delimiter, read_bytes, read_table, write_table, write_table_to, ParseResult,
    ReadOptions, ReadStrategy, TextEncoding,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::headers::{normalize_headers, normalize_token, resolve_header, ResolvedHeader};
pub use transform::cleaners::{Cleaner, DateHeuristic};
pub use transform::reconcile::reconcile;

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{clean_file, clean_table, CleanOptions, CleanOutcome, CleanReport};

// =============================================================================
// Re-exports - Report
// =============================================================================

pub use report::{summarize, TableSummary};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
