//! Summary statistics for a cleaned table.
//!
//! Used by the `--summary` flag of the CLI and by the HTTP preview response.

use serde::Serialize;

use crate::models::{CanonicalField, Cell, Column, Table};

/// Rows shown in the formula check.
pub const FORMULA_CHECK_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    /// Ordered by missing count, highest first.
    pub missing: Vec<ColumnMissing>,
    pub numeric: Vec<NumericStats>,
    /// `None` when quantity, unit_price or sales is absent.
    pub formula_check: Option<Vec<FormulaRow>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub missing: usize,
    /// Percentage of rows, two decimals.
    pub missing_pct: f64,
}

/// Describe-style statistics of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// One row of the sales formula check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaRow {
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub sales: Option<f64>,
    /// `round(quantity × unit_price, 2)`
    pub calc_sales: Option<f64>,
    /// `round(round(sales, 2) − calc_sales, 2)`
    pub sales_diff: Option<f64>,
}

pub fn summarize(table: &Table) -> TableSummary {
    let mut missing: Vec<ColumnMissing> = table
        .columns()
        .iter()
        .map(|c| ColumnMissing {
            column: c.name.clone(),
            missing: c.missing_count(),
            missing_pct: percentage(c.missing_count(), table.height()),
        })
        .collect();
    // sort_by is stable, ties keep column order
    missing.sort_by(|a, b| b.missing.cmp(&a.missing));

    TableSummary {
        rows: table.height(),
        columns: table.width(),
        missing_cells: missing.iter().map(|m| m.missing).sum(),
        missing,
        numeric: table.columns().iter().filter_map(describe).collect(),
        formula_check: formula_check(table),
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / total as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Statistics for a column whose present cells are all numbers.
pub fn describe(column: &Column) -> Option<NumericStats> {
    let mut values = Vec::with_capacity(column.cells.len());
    for cell in &column.cells {
        match cell {
            Cell::Missing => {}
            Cell::Integer(_) | Cell::Float(_) => values.extend(cell.as_f64()),
            _ => return None,
        }
    }
    if values.is_empty() {
        return None;
    }

    values.sort_by(f64::total_cmp);
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count >= 2).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    Some(NumericStats {
        column: column.name.clone(),
        count,
        mean,
        std,
        min: values[0],
        p25: quantile(&values, 0.25),
        p50: quantile(&values, 0.50),
        p75: quantile(&values, 0.75),
        max: values[count - 1],
    })
}

/// Re-type a table read back from a written file.
///
/// A column whose present values all parse as integers becomes an integer
/// column; all floats, a float column. Other columns stay text.
pub fn infer_numeric(table: &mut Table) {
    for column in table.columns_mut() {
        let (all_int, all_float) = {
            let texts: Vec<&str> = column
                .cells
                .iter()
                .filter_map(|c| match c {
                    Cell::Text(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect();
            if texts.is_empty() {
                continue;
            }
            (
                texts.iter().all(|s| s.parse::<i64>().is_ok()),
                texts.iter().all(|s| s.parse::<f64>().is_ok_and(f64::is_finite)),
            )
        };

        if all_int {
            retype(column, |s| s.parse::<i64>().ok().map(Cell::Integer));
        } else if all_float {
            retype(column, |s| s.parse::<f64>().ok().map(Cell::Float));
        }
    }
}

fn retype<F: Fn(&str) -> Option<Cell>>(column: &mut Column, parse: F) {
    for cell in column.cells.iter_mut() {
        if let Cell::Text(s) = cell {
            if let Some(typed) = parse(s) {
                *cell = typed;
            }
        }
    }
}

/// Linear-interpolated quantile of sorted, non-empty values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn formula_check(table: &Table) -> Option<Vec<FormulaRow>> {
    let quantity = table.column(CanonicalField::Quantity.as_str())?;
    let unit_price = table.column(CanonicalField::UnitPrice.as_str())?;
    let sales = table.column(CanonicalField::Sales.as_str())?;

    let rows = (0..table.height().min(FORMULA_CHECK_ROWS))
        .map(|idx| {
            let q = quantity.cells[idx].as_f64();
            let p = unit_price.cells[idx].as_f64();
            let s = sales.cells[idx].as_f64();
            let calc_sales = q.zip(p).map(|(q, p)| round2(q * p));
            let sales_diff = s.zip(calc_sales).map(|(s, c)| round2(round2(s) - c));

            FormulaRow {
                quantity: q,
                unit_price: p,
                sales: s,
                calc_sales,
                sales_diff,
            }
        })
        .collect();

    Some(rows)
}
