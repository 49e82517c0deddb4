//! File-level tests of the cleaning pipeline.

use csvclean::{
    clean_file, clean_table, Cell, CleanOptions, IngestionError, PipelineError, Table,
};
use proptest::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_input(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn clean_to_string(input: &Path, dir: &TempDir) -> String {
    let output = dir.path().join("cleaned").join("out.csv");
    clean_file(input, &output, &CleanOptions::default()).unwrap();
    std::fs::read_to_string(output).unwrap()
}

#[test]
fn aliased_headers_become_canonical() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "sales.csv",
        b"User_ID,Cust_name,Orders,Amount\nU1,\"  bob \",3,\"$45.00\"\n",
    );

    let text = clean_to_string(&input, &dir);

    assert_eq!(text, "customer_id,customer_name,quantity,sales\nU1,Bob,3,45.0\n");
}

#[test]
fn day_first_dates_are_retried_and_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "dates.csv",
        b"customer_id,order_date\nA,31/12/2024\nB,15/01/2024\nC,01/02/2024\n",
    );

    let text = clean_to_string(&input, &dir);

    assert_eq!(
        text,
        "customer_id,order_date\nB,2024-01-15\nC,2024-02-01\nA,2024-12-31\n"
    );
}

#[test]
fn missing_price_gives_missing_sales() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "prices.csv",
        b"customer_id,quantity,unit_price\nC1,5,\nC2,2,$1.50\n",
    );

    let text = clean_to_string(&input, &dir);

    assert_eq!(
        text,
        "customer_id,quantity,unit_price,sales\nC1,5,,\nC2,2,1.5,3.0\n"
    );
}

#[test]
fn duplicate_rows_appear_once() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "dupes.csv",
        b"customer_id,city\nC1,pune\nC1,PUNE\nC2,goa\nC1,  pune\n",
    );

    let text = clean_to_string(&input, &dir);

    assert_eq!(text, "customer_id,city\nC1,Pune\nC2,Goa\n");
}

#[test]
fn no_column_is_entirely_empty() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "sparse.csv",
        b"customer_id,zone,notes,gender\nC1,,,F\nC2,,NA,\n",
    );

    let text = clean_to_string(&input, &dir);

    assert_eq!(text.lines().next(), Some("customer_id,gender"));
}

#[test]
fn latin1_input_is_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "latin1.csv", b"customer_id;city\nC1;montr\xe9al\n");

    let output = dir.path().join("out.csv");
    let report = clean_file(&input, &output, &CleanOptions::default()).unwrap();

    assert_eq!(report.delimiter, ';');
    assert_ne!(report.encoding, "utf-8");
    let text = std::fs::read_to_string(output).unwrap();
    assert_eq!(text, "customer_id,city\nC1,Montréal\n");
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "ragged.csv",
        b"customer_id,city\nC1,pune\nC2,goa,extra,fields\nC3,delhi\n",
    );

    let output = dir.path().join("out.csv");
    let report = clean_file(&input, &output, &CleanOptions::default()).unwrap();

    assert_eq!(report.skipped_rows, 1);
    assert_eq!(report.rows, 2);
}

#[test]
fn report_collects_coercion_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "bad.csv",
        b"customer_id,unit_price,order_date\nC1,abc,2024-01-01\nC2,$2.00,someday\n",
    );

    let output = dir.path().join("out.csv");
    let report = clean_file(&input, &output, &CleanOptions::default()).unwrap();

    assert_eq!(report.diagnostics.coercions_in("unit_price"), 1);
    assert_eq!(report.diagnostics.coercions_in("order_date"), 1);
    assert_eq!(report.rows, 2);
}

#[test]
fn missing_input_is_ingestion_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = clean_file(
        &dir.path().join("absent.csv"),
        &dir.path().join("out.csv"),
        &CleanOptions::default(),
    );

    assert!(matches!(
        result,
        Err(PipelineError::Ingestion(IngestionError::FileNotFound { .. }))
    ));
    assert!(!dir.path().join("out.csv").exists());
}

#[test]
fn empty_input_has_no_headers() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "empty.csv", b"");

    let result = clean_file(&input, &dir.path().join("out.csv"), &CleanOptions::default());

    assert!(matches!(
        result,
        Err(PipelineError::Ingestion(IngestionError::NoHeaders))
    ));
}

#[test]
fn cleaned_output_is_stable_when_cleaned_again() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(
        &dir,
        "sales.csv",
        b"Cust. Name,Qty,Price,Order Date\n  ann lee ,2,$3.50,2024-05-01\nbob,1,$10,2024-04-01\ncara,2,$0.00001,2024-03-01\n",
    );

    let first = dir.path().join("first.csv");
    clean_file(&input, &first, &CleanOptions::default()).unwrap();
    let second = dir.path().join("second.csv");
    clean_file(&first, &second, &CleanOptions::default()).unwrap();

    let first_text = std::fs::read_to_string(&first).unwrap();
    assert!(!first_text.contains("e-"));
    assert!(first_text.contains("Cara,2024-03-01,2,0.00001,0.00002\n"));
    assert_eq!(first_text, std::fs::read_to_string(&second).unwrap());
}

fn priced_table(rows: &[(u32, Option<u32>)]) -> Table {
    Table::from_rows(
        vec!["customer_id".into(), "quantity".into(), "unit_price".into()],
        rows.iter()
            .enumerate()
            .map(|(idx, (qty, cents))| {
                vec![
                    Cell::Text(format!("C{}", idx)),
                    Cell::Text(qty.to_string()),
                    cents
                        .map(|c| Cell::Text(format!("${}.{:02}", c / 100, c % 100)))
                        .unwrap_or(Cell::Missing),
                ]
            })
            .collect(),
    )
}

proptest! {
    #[test]
    fn sales_is_quantity_times_unit_price(
        rows in prop::collection::vec((0u32..1000, prop::option::of(0u32..100_000)), 1..40)
    ) {
        let outcome = clean_table(priced_table(&rows), &CleanOptions::default());
        let table = &outcome.table;
        let quantity = table.column("quantity").unwrap();

        for idx in 0..table.height() {
            let q = quantity.cells[idx].as_f64();
            let p = table.column("unit_price").and_then(|c| c.cells[idx].as_f64());
            let sales = table.column("sales").and_then(|c| c.cells[idx].as_f64());

            match (q, p) {
                (Some(q), Some(p)) => {
                    let s = sales.unwrap();
                    prop_assert!((s - q * p).abs() <= 1e-9 * (q * p).abs().max(1.0));
                }
                _ => prop_assert!(sales.is_none()),
            }
        }
    }
}
