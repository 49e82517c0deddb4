//! Per-field cleaning rules.
//!
//! Every canonical field gets one [`Cleaner`] chosen from its [`FieldKind`].
//! A cell that cannot be read as its field's type becomes [`Cell::Missing`]
//! and is reported as a [`ValueCoercionWarning`]; nothing ever defaults to
//! zero or to an empty string.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::reconcile::AUXILIARY_COLUMNS;
use crate::error::{Diagnostics, ValueCoercionWarning};
use crate::models::{CanonicalField, Cell, Column, FieldKind, Table};

// =============================================================================
// Cleaner selection
// =============================================================================

/// Cleaning rule for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cleaner {
    /// Trim only.
    Identifier,
    /// Trim, collapse whitespace, title-case.
    Text,
    /// Strip currency formatting and parse; counts narrow to integers.
    Numeric { count: bool },
    /// Heuristic date parsing with day-first retry.
    Date,
}

impl Cleaner {
    pub fn for_kind(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Identifier => Cleaner::Identifier,
            FieldKind::Text => Cleaner::Text,
            FieldKind::Count => Cleaner::Numeric { count: true },
            FieldKind::Currency => Cleaner::Numeric { count: false },
            FieldKind::Date => Cleaner::Date,
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Cleaner::Identifier => FieldKind::Identifier,
            Cleaner::Text => FieldKind::Text,
            Cleaner::Numeric { count: true } => FieldKind::Count,
            Cleaner::Numeric { count: false } => FieldKind::Currency,
            Cleaner::Date => FieldKind::Date,
        }
    }

    /// Clean a column in place.
    pub fn apply(self, column: &mut Column, dates: &DateHeuristic, diagnostics: &mut Diagnostics) {
        match self {
            Cleaner::Identifier => map_text(column, clean_identifier),
            Cleaner::Text => map_text(column, clean_text),
            Cleaner::Numeric { count } => clean_numeric_column(column, count, diagnostics),
            Cleaner::Date => clean_date_column(column, dates, diagnostics),
        }
    }
}

/// Column name → cleaner for every column that gets cleaned.
///
/// Canonical fields come first; the auxiliary numeric columns used by
/// reconciliation follow. Passthrough columns are never cleaned.
pub fn cleaning_plan() -> Vec<(&'static str, Cleaner)> {
    CanonicalField::ALL
        .iter()
        .map(|f| (f.as_str(), Cleaner::for_kind(f.kind())))
        .chain(
            AUXILIARY_COLUMNS
                .iter()
                .map(|&(name, kind)| (name, Cleaner::for_kind(kind))),
        )
        .collect()
}

/// Apply the cleaning plan to every column present in the table.
pub fn clean_fields(table: &mut Table, dates: &DateHeuristic, diagnostics: &mut Diagnostics) {
    for (name, cleaner) in cleaning_plan() {
        if let Some(column) = table.column_mut(name) {
            let before = diagnostics.coercions.len();
            cleaner.apply(column, dates, diagnostics);
            let coerced = diagnostics.coercions.len() - before;
            if coerced > 0 {
                tracing::warn!(
                    column = name,
                    kind = %cleaner.kind(),
                    coerced,
                    "values could not be parsed and were set to missing"
                );
            }
        }
    }
}

fn map_text<F: Fn(&str) -> Option<String>>(column: &mut Column, f: F) {
    for cell in column.cells.iter_mut() {
        let cleaned = cell.to_text().and_then(|s| f(&s));
        *cell = cleaned.map(Cell::Text).unwrap_or(Cell::Missing);
    }
}

fn coercion_warning(row: usize, column: &str, value: &str, kind: FieldKind) -> ValueCoercionWarning {
    ValueCoercionWarning {
        row,
        column: column.to_string(),
        value: value.to_string(),
        kind,
    }
}

// =============================================================================
// Text
// =============================================================================

/// Trim an identifier; blank becomes missing.
pub fn clean_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trim, collapse internal whitespace and title-case; blank becomes missing.
pub fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then(|| title_case(&collapsed))
}

/// Capitalize the first letter of every word, lower-case the rest.
///
/// A word starts after any character that is not a letter or digit, so
/// `o'neil` becomes `O'Neil` and `usb-c` becomes `Usb-C`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for ch in s.chars() {
        if in_word {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        in_word = ch.is_alphanumeric();
    }

    out
}

// =============================================================================
// Numeric
// =============================================================================

/// Parse a currency-formatted number.
///
/// Keeps digits and decimal points, and a minus sign that appears before the
/// first digit. Any minus sign after the first digit is ignored, so `"5-3"`
/// reads as `53`; repeated leading signs count once. `None` when nothing
/// parseable remains.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let negative = trimmed
        .find('-')
        .is_some_and(|pos| !trimmed[..pos].chars().any(|c| c.is_ascii_digit()));

    let body: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if body.is_empty() {
        return None;
    }

    let value: f64 = body.parse().ok().filter(|v: &f64| v.is_finite())?;
    Some(if negative { -value } else { value })
}

/// Largest float that converts to `i64` without loss.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn clean_numeric_column(column: &mut Column, count: bool, diagnostics: &mut Diagnostics) {
    let kind = if count {
        FieldKind::Count
    } else {
        FieldKind::Currency
    };

    for (row, cell) in column.cells.iter_mut().enumerate() {
        let parsed = match &*cell {
            Cell::Missing | Cell::Integer(_) | Cell::Float(_) => continue,
            Cell::Text(s) => parse_number(s).ok_or_else(|| s.clone()),
            other => Err(other.to_field()),
        };

        *cell = match parsed {
            Ok(value) => Cell::Float(value),
            Err(raw) => {
                if !raw.trim().is_empty() {
                    diagnostics.coercion(coercion_warning(row, &column.name, &raw, kind));
                }
                Cell::Missing
            }
        };
    }

    if count {
        narrow_to_integer(column);
    }
}

/// Convert a float column to integers when no present value has a fraction.
fn narrow_to_integer(column: &mut Column) {
    let integral = column.cells.iter().all(|cell| match cell {
        Cell::Float(v) => v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER,
        _ => true,
    });
    if !integral {
        return;
    }

    for cell in column.cells.iter_mut() {
        if let Cell::Float(v) = *cell {
            *cell = Cell::Integer(v as i64);
        }
    }
}

// =============================================================================
// Dates
// =============================================================================

/// Tunables for the day-first retry.
///
/// Month-first and day-first numeric dates cannot be told apart from a single
/// value; only the failure rate over the whole column discriminates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateHeuristic {
    /// Failure ratio above which the day-first retry is considered.
    pub retry_threshold: f64,
    /// Number of raw values checked for a `/` separator.
    pub sample_size: usize,
}

impl Default for DateHeuristic {
    fn default() -> Self {
        Self {
            retry_threshold: 0.20,
            sample_size: 20,
        }
    }
}

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const NAMED_MONTH_FORMATS: &[&str] = &[
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
];

// Two-digit years come first: `%Y` would otherwise read "24" as year 24.
const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];
const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y", "%m.%d.%Y"];
const DAY_FIRST_DATETIME_FORMATS: &[&str] = &["%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M"];
const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y", "%d.%m.%Y"];

fn parse_with(value: &str, datetime_formats: &[&str], date_formats: &[&str]) -> Option<NaiveDateTime> {
    datetime_formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            date_formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse one date-like value. Numeric slash/dash dates are read month-first;
/// with `day_first` they are read day-first when that is a valid date and
/// month-first otherwise.
pub fn parse_date(raw: &str, day_first: bool) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let month_first = || {
        parse_with(value, MONTH_FIRST_DATETIME_FORMATS, MONTH_FIRST_DATE_FORMATS)
    };
    let numeric = || {
        if day_first {
            parse_with(value, DAY_FIRST_DATETIME_FORMATS, DAY_FIRST_DATE_FORMATS)
                .or_else(month_first)
        } else {
            month_first()
        }
    };

    // Year-first formats only apply to a four-digit leading year; `%Y` would
    // otherwise read "01/02/03" as year 1.
    let year_first = value.len() >= 4 && value.as_bytes()[..4].iter().all(u8::is_ascii_digit);
    let iso = if year_first {
        parse_with(value, ISO_DATETIME_FORMATS, ISO_DATE_FORMATS)
    } else {
        None
    };

    iso.or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|d| d.naive_local()))
        .or_else(|| parse_with(value, &[], NAMED_MONTH_FORMATS))
        .or_else(numeric)
}

fn clean_date_column(column: &mut Column, heuristic: &DateHeuristic, diagnostics: &mut Diagnostics) {
    // (row, raw text) for every value still needing a parse
    let raw: Vec<(usize, String)> = column
        .cells
        .iter()
        .enumerate()
        .filter_map(|(row, cell)| match cell {
            Cell::Missing | Cell::Date(_) => None,
            other => other.to_text().map(|s| (row, s)),
        })
        .collect();
    if raw.is_empty() {
        return;
    }

    let parse_all = |day_first: bool| -> Vec<Option<NaiveDateTime>> {
        raw.iter().map(|(_, s)| parse_date(s, day_first)).collect()
    };

    let mut parsed = parse_all(false);
    let failures = parsed.iter().filter(|p| p.is_none()).count();
    let failure_ratio = failures as f64 / raw.len() as f64;
    let slash_in_sample = raw
        .iter()
        .take(heuristic.sample_size)
        .any(|(_, s)| s.contains('/'));

    if failure_ratio > heuristic.retry_threshold && slash_in_sample {
        tracing::info!(
            column = %column.name,
            failure_ratio,
            "retrying date column with day-first interpretation"
        );
        parsed = parse_all(true);
    }

    for ((row, text), value) in raw.iter().zip(parsed) {
        column.cells[*row] = match value {
            Some(date) => Cell::Date(date),
            None => {
                if !text.trim().is_empty() {
                    diagnostics.coercion(coercion_warning(*row, &column.name, text, FieldKind::Date));
                }
                Cell::Missing
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn text_column(name: &str, values: &[&str]) -> Column {
        Column::new(name, values.iter().map(|v| Cell::from(*v)).collect())
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("bob"), "Bob");
        assert_eq!(title_case("NEW DELHI"), "New Delhi");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("usb-c cable"), "Usb-C Cable");
        assert_eq!(title_case("3rd street"), "3rd Street");
    }

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  bob  \t smith ").as_deref(), Some("Bob Smith"));
        assert_eq!(clean_text("   "), None);
    }

    #[test]
    fn test_identifier_only_trimmed() {
        assert_eq!(clean_identifier("  aB-01 ").as_deref(), Some("aB-01"));
        assert_eq!(clean_identifier(" "), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("$45.00"), Some(45.0));
        assert_eq!(parse_number("1,234.50 USD"), Some(1234.5));
        assert_eq!(parse_number("-$12.5"), Some(-12.5));
        assert_eq!(parse_number("$-3"), Some(-3.0));
        assert_eq!(parse_number("--5"), Some(-5.0));
        assert_eq!(parse_number("5-3"), Some(53.0));
        assert_eq!(parse_number("₹ 999"), Some(999.0));
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("."), None);
        assert_eq!(parse_number("1.2.3"), None);
    }

    #[test]
    fn test_numeric_column_missing_never_zero() {
        let mut column = text_column("unit_price", &["$10.00", "", "abc"]);
        column.cells[1] = Cell::Missing;
        let mut diagnostics = Diagnostics::new();

        Cleaner::Numeric { count: false }.apply(&mut column, &DateHeuristic::default(), &mut diagnostics);

        assert_eq!(column.cells, vec![Cell::Float(10.0), Cell::Missing, Cell::Missing]);
        assert_eq!(diagnostics.coercions.len(), 1);
        assert_eq!(diagnostics.coercions[0].row, 2);
        assert_eq!(diagnostics.coercions[0].value, "abc");
    }

    #[test]
    fn test_count_narrows_to_integer() {
        let mut column = text_column("quantity", &["3", "4.0", "x"]);
        let mut diagnostics = Diagnostics::new();

        Cleaner::Numeric { count: true }.apply(&mut column, &DateHeuristic::default(), &mut diagnostics);

        assert_eq!(column.cells, vec![Cell::Integer(3), Cell::Integer(4), Cell::Missing]);
    }

    #[test]
    fn test_count_with_fraction_stays_float() {
        let mut column = text_column("quantity", &["3", "1.5"]);
        let mut diagnostics = Diagnostics::new();

        Cleaner::Numeric { count: true }.apply(&mut column, &DateHeuristic::default(), &mut diagnostics);

        assert_eq!(column.cells, vec![Cell::Float(3.0), Cell::Float(1.5)]);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-12-31", false), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("12/31/2024", false), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("12/31/24", false), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("31 Dec 2024", false), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("Dec 31, 2024", false), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("31/12/2024", false), None);
        assert_eq!(parse_date("31/12/2024", true), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("12/31/2024", true), Some(ymd(2024, 12, 31)));
        assert_eq!(parse_date("01/02/2024", true), Some(ymd(2024, 2, 1)));
        assert_eq!(parse_date("bad-date", false), None);
        assert_eq!(parse_date("01/02/03", false), Some(ymd(2003, 1, 2)));
        assert_eq!(
            parse_date("2024-01-02 14:30:00", false),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(14, 30, 0)
        );
    }

    #[test]
    fn test_date_column_retries_day_first() {
        let mut column = text_column("order_date", &["31/12/2024", "15/01/2024", "01/02/2024"]);
        let mut diagnostics = Diagnostics::new();

        Cleaner::Date.apply(&mut column, &DateHeuristic::default(), &mut diagnostics);

        assert_eq!(
            column.cells,
            vec![
                Cell::Date(ymd(2024, 12, 31)),
                Cell::Date(ymd(2024, 1, 15)),
                Cell::Date(ymd(2024, 2, 1)),
            ]
        );
        assert!(diagnostics.coercions.is_empty());
    }

    #[test]
    fn test_day_first_retry_keeps_month_first_only_values() {
        let mut column = text_column("order_date", &["12/31/2024", "11/30/2024", "31/12/2024"]);
        let mut diagnostics = Diagnostics::new();

        Cleaner::Date.apply(&mut column, &DateHeuristic::default(), &mut diagnostics);

        assert_eq!(
            column.cells,
            vec![
                Cell::Date(ymd(2024, 12, 31)),
                Cell::Date(ymd(2024, 11, 30)),
                Cell::Date(ymd(2024, 12, 31)),
            ]
        );
        assert!(diagnostics.coercions.is_empty());
    }

    #[test]
    fn test_date_column_low_failure_keeps_month_first() {
        let values = [
            "01/02/2024", "01/03/2024", "01/04/2024", "01/05/2024", "01/06/2024", "13/01/2024",
        ];
        let mut column = text_column("order_date", &values);
        let mut diagnostics = Diagnostics::new();

        Cleaner::Date.apply(&mut column, &DateHeuristic::default(), &mut diagnostics);

        // 1 of 6 fails (16.7%), under the threshold.
        assert_eq!(column.cells[0], Cell::Date(ymd(2024, 1, 2)));
        assert!(column.cells[5].is_missing());
        assert_eq!(diagnostics.coercions.len(), 1);
    }

    #[test]
    fn test_date_column_without_slash_does_not_retry() {
        let mut column = text_column("order_date", &["2025-01-01", "bad-date"]);
        let mut diagnostics = Diagnostics::new();

        Cleaner::Date.apply(&mut column, &DateHeuristic::default(), &mut diagnostics);

        assert_eq!(column.cells, vec![Cell::Date(ymd(2025, 1, 1)), Cell::Missing]);
        assert_eq!(diagnostics.coercions[0].kind, FieldKind::Date);
    }

    #[test]
    fn test_threshold_is_tunable() {
        let mut column = text_column("order_date", &["01/02/2024", "01/03/2024", "13/01/2024"]);
        let strict = DateHeuristic {
            retry_threshold: 0.5,
            sample_size: 20,
        };
        let mut diagnostics = Diagnostics::new();

        Cleaner::Date.apply(&mut column, &strict, &mut diagnostics);

        // 33% failures stays under a 50% threshold, so month-first is kept.
        assert_eq!(column.cells[0], Cell::Date(ymd(2024, 1, 2)));
        assert!(column.cells[2].is_missing());
    }

    #[test]
    fn test_cleaning_plan_covers_auxiliary_columns() {
        let plan = cleaning_plan();
        assert!(plan.contains(&("customer_id", Cleaner::Identifier)));
        assert!(plan.contains(&("order_date", Cleaner::Date)));
        assert!(plan.contains(&("orders", Cleaner::Numeric { count: true })));
        assert!(plan.contains(&("amount", Cleaner::Numeric { count: false })));
    }
}
