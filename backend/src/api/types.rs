//! REST API types for the upload / preview / download flow.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{Diagnostics, IngestionError, PipelineError, ServerError};
use crate::models::Table;
use crate::report::TableSummary;

/// Rows included in the preview.
pub const PREVIEW_ROWS: usize = 10;

/// Response sent after a successful clean.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready", or "warning" when values were coerced or columns merged
    pub status: String,

    pub files: StagedFiles,

    /// Read strategy and delimiter used for the upload
    pub input: InputInfo,

    pub preview: Preview,

    pub summary: TableSummary,

    pub warnings: WarningCounts,

    /// Relative URL of the cleaned file
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFiles {
    pub original_name: Option<String>,
    pub raw: String,
    pub cleaned: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInfo {
    pub encoding: String,
    pub delimiter: String,
    pub skipped_rows: usize,
    pub duplicates_removed: usize,
}

/// First rows of the cleaned table, as written.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Preview {
    pub fn from_table(table: &Table, limit: usize) -> Self {
        Self {
            columns: table.column_names().into_iter().map(String::from).collect(),
            rows: (0..table.height().min(limit))
                .map(|idx| table.row(idx).iter().map(|c| c.to_field()).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningCounts {
    pub missing_fields: usize,
    pub duplicate_columns: usize,
    pub dropped_columns: usize,
    pub coerced_values: usize,
}

impl WarningCounts {
    pub fn total(&self) -> usize {
        self.duplicate_columns + self.coerced_values
    }
}

impl From<&Diagnostics> for WarningCounts {
    fn from(diagnostics: &Diagnostics) -> Self {
        use crate::error::SchemaWarning::*;

        let mut counts = WarningCounts {
            coerced_values: diagnostics.coercions.len(),
            ..Default::default()
        };
        for warning in &diagnostics.schema {
            match warning {
                MissingField { .. } => counts.missing_fields += 1,
                DuplicateColumn { .. } => counts.duplicate_columns += 1,
                DroppedEmptyColumn { .. } => counts.dropped_columns += 1,
            }
        }
        counts
    }
}

/// Remediation hints shown next to an error.
pub fn hints_for(error: &ServerError) -> Vec<&'static str> {
    match error {
        ServerError::Pipeline(PipelineError::Ingestion(IngestionError::NoHeaders)) => vec![
            "Check that the first row of the file holds column headers",
            "Make sure the file is not empty",
        ],
        ServerError::Pipeline(PipelineError::Ingestion(_)) => vec![
            "Re-save the file as UTF-8 CSV from your spreadsheet tool",
            "Check that the file uses a comma, semicolon, tab or pipe delimiter",
        ],
        ServerError::BadRequest(_) => vec!["Send the CSV as a multipart field named 'file'"],
        _ => vec!["Retry the upload; if it keeps failing, check the server logs"],
    }
}

/// Create an error response
pub fn error_response(error: &str, hints: &[&str]) -> Value {
    json!({
        "status": "error",
        "error": error,
        "hints": hints,
    })
}

/// Map a server error to a status code and error body.
pub fn rejection(error: ServerError) -> (StatusCode, Json<Value>) {
    let status = match &error {
        ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
        ServerError::Pipeline(PipelineError::Ingestion(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = error_response(&error.to_string(), &hints_for(&error));
    (status, Json(body))
}
