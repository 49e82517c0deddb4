//! Error and diagnostic types for the cleaning pipeline.
//!
//! Fatal errors abort a run and surface to the caller:
//!
//! - [`IngestionError`] - the input could not be read or decoded
//! - [`OutputError`] - the cleaned table could not be written
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP collaborator errors
//!
//! Non-fatal anomalies are plain values collected in [`Diagnostics`]:
//! [`SchemaWarning`] for column-level problems and [`ValueCoercionWarning`]
//! for cells that could not be parsed as their field's type.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::FieldKind;

// =============================================================================
// Ingestion Errors
// =============================================================================

/// Errors while loading the raw table.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Input path does not exist.
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Input exists but could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every decoding strategy failed, including the lossy byte fallback.
    #[error("Could not decode input with any strategy (last error: {last_error})")]
    Undecodable { last_error: String },

    /// The input has no header row.
    #[error("Input has no header row")]
    NoHeaders,
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors while writing the cleaned table.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Parent directory could not be created.
    #[error("Cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be written.
    #[error("Cannot write output file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::clean_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading the input failed.
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    /// Writing the output failed.
    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP collaborator errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Staging area I/O failed.
    #[error("Staging error: {0}")]
    Staging(#[from] std::io::Error),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Non-fatal diagnostics
// =============================================================================

/// Column-level anomaly. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaWarning {
    /// A canonical field was absent and an empty column was inserted.
    #[error("Canonical field '{field}' missing from input, inserted empty column")]
    MissingField { field: String },

    /// Several raw headers resolved to the same column and were merged.
    #[error("Header '{raw_header}' duplicates column '{column}', merged into it")]
    DuplicateColumn { column: String, raw_header: String },

    /// A column with no values at all was removed from the output.
    #[error("Column '{column}' is entirely empty, dropped")]
    DroppedEmptyColumn { column: String },
}

/// A cell that could not be parsed as its field's type and became missing.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("Row {row}, column '{column}': cannot read '{value}' as {kind}")]
pub struct ValueCoercionWarning {
    /// Zero-based data row index.
    pub row: usize,
    pub column: String,
    pub value: String,
    pub kind: FieldKind,
}

/// Everything that went wrong without stopping the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub schema: Vec<SchemaWarning>,
    pub coercions: Vec<ValueCoercionWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&mut self, warning: SchemaWarning) {
        self.schema.push(warning);
    }

    pub fn coercion(&mut self, warning: ValueCoercionWarning) {
        self.coercions.push(warning);
    }

    /// Number of coerced cells in one column.
    pub fn coercions_in(&self, column: &str) -> usize {
        self.coercions.iter().filter(|w| w.column == column).count()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty() && self.coercions.is_empty()
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for ingestion.
pub type IngestResult<T> = Result<T, IngestionError>;

/// Result type for output writing.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
