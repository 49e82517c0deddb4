//! High-level pipeline API: raw sales export in, canonical table out.
//!
//! ```text
//! read ─► normalize headers ─► clean fields ─► reconcile
//!      ─► drop empty columns ─► dedupe rows ─► sort by order_date ─► write
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use csvclean::transform::pipeline::{clean_file, CleanOptions};
//! use std::path::Path;
//!
//! let report = clean_file(
//!     Path::new("data/raw/sales.csv"),
//!     Path::new("data/cleaned/sales_cleaned.csv"),
//!     &CleanOptions::default(),
//! )?;
//! println!("Rows: {} | Columns: {}", report.rows, report.columns);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::cleaners::{clean_fields, DateHeuristic};
use super::headers::normalize_headers;
use super::reconcile::reconcile;
use crate::error::{Diagnostics, PipelineResult, SchemaWarning};
use crate::models::{CanonicalField, Cell, Table};
use crate::parser::{read_table, write_table, ReadOptions, ReadStrategy};

/// Options for a cleaning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanOptions {
    /// Input delimiter; auto-detected when `None`.
    pub delimiter: Option<char>,

    /// Date failure ratio above which the day-first retry is considered.
    pub date_retry_threshold: f64,

    /// Raw date values inspected for a `/` separator.
    pub date_sample_size: usize,
}

impl Default for CleanOptions {
    fn default() -> Self {
        let dates = DateHeuristic::default();
        Self {
            delimiter: None,
            date_retry_threshold: dates.retry_threshold,
            date_sample_size: dates.sample_size,
        }
    }
}

impl CleanOptions {
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            delimiter: self.delimiter,
        }
    }

    pub fn date_heuristic(&self) -> DateHeuristic {
        DateHeuristic {
            retry_threshold: self.date_retry_threshold,
            sample_size: self.date_sample_size,
        }
    }
}

/// Cleaned table plus everything that degraded along the way.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub table: Table,
    pub diagnostics: Diagnostics,
    /// Exact duplicate rows removed.
    pub duplicates_removed: usize,
}

/// Summary of a file-level run.
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub input: PathBuf,
    pub output: PathBuf,

    /// Encoding that decoded the input.
    pub encoding: String,
    pub strategy: ReadStrategy,
    pub delimiter: char,

    /// Malformed rows skipped while reading.
    pub skipped_rows: usize,
    pub duplicates_removed: usize,

    pub rows: usize,
    pub columns: usize,

    pub diagnostics: Diagnostics,
}

/// Run every in-memory stage on a raw table.
///
/// Never fails: anomalies end up in [`CleanOutcome::diagnostics`].
pub fn clean_table(raw: Table, options: &CleanOptions) -> CleanOutcome {
    let mut diagnostics = Diagnostics::new();

    let mut table = normalize_headers(raw, &mut diagnostics);
    clean_fields(&mut table, &options.date_heuristic(), &mut diagnostics);
    reconcile(&mut table);
    drop_empty_columns(&mut table, &mut diagnostics);
    let duplicates_removed = dedupe_rows(&mut table);
    sort_by_order_date(&mut table);

    log_schema_warnings(&diagnostics);
    tracing::info!(
        rows = table.height(),
        columns = table.width(),
        duplicates_removed,
        coerced = diagnostics.coercions.len(),
        "table cleaned"
    );

    CleanOutcome {
        table,
        diagnostics,
        duplicates_removed,
    }
}

/// Read `input`, clean it and write the canonical table to `output`.
///
/// Fails only when the input cannot be read or the output cannot be written.
pub fn clean_file(input: &Path, output: &Path, options: &CleanOptions) -> PipelineResult<CleanReport> {
    let parsed = read_table(input, options.read_options())?;
    tracing::info!(
        path = %input.display(),
        encoding = parsed.encoding(),
        strategy = %parsed.strategy,
        rows = parsed.table.height(),
        "input read"
    );

    let encoding = parsed.encoding().to_string();
    let outcome = clean_table(parsed.table, options);
    write_table(&outcome.table, output)?;

    Ok(CleanReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        encoding,
        strategy: parsed.strategy,
        delimiter: parsed.delimiter,
        skipped_rows: parsed.skipped_rows,
        duplicates_removed: outcome.duplicates_removed,
        rows: outcome.table.height(),
        columns: outcome.table.width(),
        diagnostics: outcome.diagnostics,
    })
}

/// Remove columns without a single value.
fn drop_empty_columns(table: &mut Table, diagnostics: &mut Diagnostics) {
    let empty: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| c.is_all_missing())
        .map(|c| c.name.clone())
        .collect();

    for column in empty {
        table.remove_column(&column);
        diagnostics.schema(SchemaWarning::DroppedEmptyColumn { column });
    }
}

/// Keep the first occurrence of every fully identical row. Returns the number removed.
fn dedupe_rows(table: &mut Table) -> usize {
    let keep: Vec<usize> = {
        let mut seen: HashSet<Vec<&Cell>> = HashSet::with_capacity(table.height());
        (0..table.height())
            .filter(|&idx| seen.insert(table.row(idx)))
            .collect()
    };

    let removed = table.height() - keep.len();
    if removed > 0 {
        table.select_rows(&keep);
    }
    removed
}

/// Stable ascending sort on `order_date`; rows without a date go last.
fn sort_by_order_date(table: &mut Table) {
    let Some(dates) = table.column(CanonicalField::OrderDate.as_str()) else {
        return;
    };
    let keys: Vec<_> = dates.cells.iter().map(Cell::as_date).collect();

    let mut order: Vec<usize> = (0..table.height()).collect();
    order.sort_by(|&a, &b| match (keys[a], keys[b]) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    if order.iter().enumerate().any(|(pos, &idx)| pos != idx) {
        table.select_rows(&order);
    }
}

fn log_schema_warnings(diagnostics: &Diagnostics) {
    for warning in &diagnostics.schema {
        match warning {
            // Expected for most exports; one line per field would be noise.
            SchemaWarning::MissingField { .. } | SchemaWarning::DroppedEmptyColumn { .. } => {
                tracing::debug!(%warning)
            }
            SchemaWarning::DuplicateColumn { .. } => tracing::warn!(%warning),
        }
    }

    let missing = diagnostics
        .schema
        .iter()
        .filter(|w| matches!(w, SchemaWarning::MissingField { .. }))
        .count();
    if missing > 0 {
        tracing::warn!(missing, "canonical fields absent from input");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|v| if v.is_empty() { Cell::Missing } else { Cell::from(*v) })
                        .collect()
                })
                .collect(),
        )
    }

    #[test]
    fn test_alias_adoption_scenario() {
        let table = raw(
            &["User_ID", "Cust_name", "Orders", "Amount"],
            &[&["U1", "  bob ", "3", "$45.00"]],
        );

        let outcome = clean_table(table, &CleanOptions::default());
        let t = &outcome.table;

        assert_eq!(
            t.column_names(),
            vec!["customer_id", "customer_name", "quantity", "sales"]
        );
        assert_eq!(t.row(0), vec![
            &Cell::from("U1"),
            &Cell::from("Bob"),
            &Cell::Integer(3),
            &Cell::Float(45.0),
        ]);
    }

    #[test]
    fn test_missing_price_never_zero() {
        let table = raw(
            &["customer_id", "quantity", "unit_price"],
            &[&["C1", "5", ""], &["C2", "2", "1.50"]],
        );

        let outcome = clean_table(table, &CleanOptions::default());
        let sales = outcome.table.column("sales").unwrap();

        assert_eq!(sales.cells, vec![Cell::Missing, Cell::Float(3.0)]);
    }

    #[test]
    fn test_duplicates_removed_keep_first() {
        let table = raw(
            &["customer_id", "city"],
            &[&["C1", "pune"], &["C2", "delhi"], &["C1", " Pune"]],
        );

        let outcome = clean_table(table, &CleanOptions::default());

        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(outcome.table.height(), 2);
        assert_eq!(
            outcome.table.column("city").unwrap().cells,
            vec![Cell::from("Pune"), Cell::from("Delhi")]
        );
    }

    #[test]
    fn test_sorted_by_date_missing_last_stable() {
        let table = raw(
            &["customer_id", "order_date"],
            &[
                &["A", ""],
                &["B", "2024-03-01"],
                &["C", "bad"],
                &["D", "2024-01-01"],
                &["E", "2024-03-01 "],
            ],
        );

        let outcome = clean_table(table, &CleanOptions::default());
        let ids: Vec<String> = outcome
            .table
            .column("customer_id")
            .unwrap()
            .cells
            .iter()
            .map(Cell::to_field)
            .collect();

        assert_eq!(ids, vec!["D", "B", "E", "A", "C"]);
        let first = outcome.table.column("order_date").unwrap().cells[0].as_date();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0));
    }

    #[test]
    fn test_empty_columns_dropped_with_warning() {
        let table = raw(&["customer_id", "notes"], &[&["C1", ""]]);

        let outcome = clean_table(table, &CleanOptions::default());

        assert_eq!(outcome.table.column_names(), vec!["customer_id"]);
        assert!(outcome.diagnostics.schema.contains(&SchemaWarning::DroppedEmptyColumn {
            column: "notes".into()
        }));
        assert!(outcome.diagnostics.schema.contains(&SchemaWarning::DroppedEmptyColumn {
            column: "zone".into()
        }));
    }

    #[test]
    fn test_passthrough_kept_unchanged() {
        let table = raw(&["customer_id", "Promo Code"], &[&["C1", "  abc "]]);

        let outcome = clean_table(table, &CleanOptions::default());

        assert_eq!(
            outcome.table.column("promo_code").unwrap().cells,
            vec![Cell::from("  abc ")]
        );
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: CleanOptions = serde_json::from_str(r#"{"delimiter": ";"}"#).unwrap();
        assert_eq!(options.delimiter, Some(';'));
        assert_eq!(options.date_sample_size, 20);
        assert!((options.date_retry_threshold - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_rows() {
        let table = raw(&["customer_id", "sales"], &[]);
        let outcome = clean_table(table, &CleanOptions::default());
        assert_eq!(outcome.table.height(), 0);
        assert_eq!(outcome.table.width(), 0);
    }
}
