//! HTTP server for the upload / preview / download flow.
//!
//! The server only stages files: uploads land in `<data-dir>/raw`, the
//! pipeline writes to `<data-dir>/cleaned`, and the response is built by
//! reading the cleaned file back.
//!
//! # API Endpoints
//!
//! | Method | Path               | Description                          |
//! |--------|--------------------|--------------------------------------|
//! | GET    | `/health`          | Health check                         |
//! | POST   | `/api/clean`       | Upload a CSV, clean it, get preview  |
//! | GET    | `/download/{file}` | Download a cleaned file              |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Local};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use uuid::Uuid;

use super::types::{
    rejection, CleanResponse, InputInfo, Preview, StagedFiles, WarningCounts, PREVIEW_ROWS,
};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::models::Table;
use crate::parser::{read_table, ReadOptions};
use crate::report::{infer_numeric, summarize};
use crate::transform::pipeline::{clean_file, CleanOptions, CleanReport};

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Root of the `raw` and `cleaned` staging directories.
    pub data_dir: PathBuf,
    pub options: CleanOptions,
}

impl AppState {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            options: CleanOptions::default(),
        }
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.data_dir.join("cleaned")
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    let downloads = ServeDir::new(state.cleaned_dir());

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/clean", post(clean_upload))
        .nest_service("/download", downloads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Start the HTTP server
pub async fn start_server(port: u16, data_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(data_dir);
    tokio::fs::create_dir_all(state.raw_dir()).await?;
    tokio::fs::create_dir_all(state.cleaned_dir()).await?;

    let data_dir = state.data_dir.clone();
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 csvclean server running on http://localhost:{}", port);
    println!("   POST /api/clean       - Upload and clean a CSV file");
    println!("   GET  /download/<file> - Download a cleaned file");
    println!("   GET  /health          - Health check");
    println!();
    println!("📁 Staging area: {}", data_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "csvclean",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "clean": "POST /api/clean",
            "download": "GET /download/<file>"
        }
    }))
}

/// Upload, clean and preview endpoint
async fn clean_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<CleanResponse>, (StatusCode, Json<Value>)> {
    match handle_upload(&state, multipart).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!(error = %e, "clean request failed");
            Err(rejection(e))
        }
    }
}

async fn handle_upload(state: &AppState, mut multipart: Multipart) -> ServerResult<CleanResponse> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;

    let job_id = Uuid::new_v4();
    let staged = StagedPaths::new(&state.data_dir, Local::now(), &job_id);
    tracing::info!(
        %job_id,
        file = file_name.as_deref().unwrap_or("unknown"),
        bytes = bytes.len(),
        raw = %staged.raw.display(),
        "upload received"
    );

    if let Some(parent) = staged.raw.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&staged.raw, &bytes).await?;

    let options = state.options.clone();
    let (raw, cleaned) = (staged.raw.clone(), staged.cleaned.clone());
    let (report, table) = tokio::task::spawn_blocking(move || clean_and_read_back(&raw, &cleaned, &options))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    let warnings = WarningCounts::from(&report.diagnostics);
    let status = if warnings.total() > 0 { "warning" } else { "ready" };

    Ok(CleanResponse {
        job_id: job_id.to_string(),
        status: status.to_string(),
        download_url: format!("/download/{}", staged.cleaned_name),
        files: StagedFiles {
            original_name: file_name,
            raw: staged.raw_name,
            cleaned: staged.cleaned_name,
        },
        input: InputInfo {
            encoding: report.encoding,
            delimiter: report.delimiter.to_string(),
            skipped_rows: report.skipped_rows,
            duplicates_removed: report.duplicates_removed,
        },
        preview: Preview::from_table(&table, PREVIEW_ROWS),
        summary: summarize(&table),
        warnings,
    })
}

/// Run the pipeline, then load the written file as the preview source.
fn clean_and_read_back(
    raw: &Path,
    cleaned: &Path,
    options: &CleanOptions,
) -> ServerResult<(CleanReport, Table)> {
    let report = clean_file(raw, cleaned, options)?;

    let mut table = read_table(cleaned, ReadOptions { delimiter: Some(',') })
        .map_err(PipelineError::from)?
        .table;
    infer_numeric(&mut table);

    Ok((report, table))
}

/// Staging locations of one upload.
#[derive(Debug, Clone, PartialEq)]
struct StagedPaths {
    raw: PathBuf,
    raw_name: String,
    cleaned: PathBuf,
    cleaned_name: String,
}

impl StagedPaths {
    /// `uploaded_<stamp>.csv` and `uploaded_cleaned_<stamp>.csv`, where the
    /// stamp is the local time plus a short random suffix.
    fn new(data_dir: &Path, now: DateTime<Local>, job_id: &Uuid) -> Self {
        let suffix: String = job_id.simple().to_string().chars().take(8).collect();
        let stamp = format!("{}_{}", now.format("%Y%m%d_%H%M%S"), suffix);
        let raw_name = format!("uploaded_{}.csv", stamp);
        let cleaned_name = format!("uploaded_cleaned_{}.csv", stamp);

        Self {
            raw: data_dir.join("raw").join(&raw_name),
            cleaned: data_dir.join("cleaned").join(&cleaned_name),
            raw_name,
            cleaned_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_staged_paths_share_stamp() {
        let now = Local.with_ymd_and_hms(2024, 12, 31, 8, 5, 9).unwrap();
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();

        let staged = StagedPaths::new(Path::new("data"), now, &id);

        assert_eq!(staged.raw_name, "uploaded_20241231_080509_a1b2c3d4.csv");
        assert_eq!(staged.cleaned_name, "uploaded_cleaned_20241231_080509_a1b2c3d4.csv");
        assert_eq!(staged.raw, Path::new("data/raw/uploaded_20241231_080509_a1b2c3d4.csv"));
        assert!(staged.cleaned.starts_with("data/cleaned"));
    }

    #[test]
    fn test_clean_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw").join("in.csv");
        std::fs::create_dir_all(raw.parent().unwrap()).unwrap();
        std::fs::write(&raw, "User_ID,Cust_name,Orders,Amount\nU1,  bob ,3,$45.00\n").unwrap();
        let cleaned = dir.path().join("cleaned").join("out.csv");

        let (report, table) = clean_and_read_back(&raw, &cleaned, &CleanOptions::default()).unwrap();

        assert_eq!(report.rows, 1);
        assert_eq!(table.column_names(), vec!["customer_id", "customer_name", "quantity", "sales"]);
        let summary = summarize(&table);
        assert!(summary.numeric.iter().any(|s| s.column == "sales" && s.max == 45.0));
    }

    #[test]
    fn test_clean_and_read_back_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = clean_and_read_back(
            &dir.path().join("nope.csv"),
            &dir.path().join("out.csv"),
            &CleanOptions::default(),
        );
        assert!(matches!(result, Err(ServerError::Pipeline(PipelineError::Ingestion(_)))));
    }
}
