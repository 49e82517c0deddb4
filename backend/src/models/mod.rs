//! Domain models for the cleaning pipeline.
//!
//! - [`CanonicalField`] - the fixed set of standardized output columns
//! - [`FieldKind`] - semantic type of a canonical field
//! - [`Cell`] - a single loosely or natively typed value
//! - [`Table`] - ordered, column-oriented table shared by every stage

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

// =============================================================================
// Canonical Fields
// =============================================================================

/// Standardized output column.
///
/// Declaration order is the output column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    CustomerId,
    CustomerName,
    OrderDate,
    Quantity,
    UnitPrice,
    Sales,
    Product,
    Category,
    City,
    MaritalStatus,
    AgeGroup,
    Occupation,
    Gender,
    Zone,
}

impl CanonicalField {
    /// All canonical fields in output order.
    pub const ALL: [CanonicalField; 14] = [
        CanonicalField::CustomerId,
        CanonicalField::CustomerName,
        CanonicalField::OrderDate,
        CanonicalField::Quantity,
        CanonicalField::UnitPrice,
        CanonicalField::Sales,
        CanonicalField::Product,
        CanonicalField::Category,
        CanonicalField::City,
        CanonicalField::MaritalStatus,
        CanonicalField::AgeGroup,
        CanonicalField::Occupation,
        CanonicalField::Gender,
        CanonicalField::Zone,
    ];

    /// Column name used in the cleaned table.
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::CustomerId => "customer_id",
            CanonicalField::CustomerName => "customer_name",
            CanonicalField::OrderDate => "order_date",
            CanonicalField::Quantity => "quantity",
            CanonicalField::UnitPrice => "unit_price",
            CanonicalField::Sales => "sales",
            CanonicalField::Product => "product",
            CanonicalField::Category => "category",
            CanonicalField::City => "city",
            CanonicalField::MaritalStatus => "marital_status",
            CanonicalField::AgeGroup => "age_group",
            CanonicalField::Occupation => "occupation",
            CanonicalField::Gender => "gender",
            CanonicalField::Zone => "zone",
        }
    }

    /// Look up a canonical field by its exact column name.
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    pub fn kind(self) -> FieldKind {
        match self {
            CanonicalField::CustomerId => FieldKind::Identifier,
            CanonicalField::OrderDate => FieldKind::Date,
            CanonicalField::Quantity => FieldKind::Count,
            CanonicalField::UnitPrice | CanonicalField::Sales => FieldKind::Currency,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Opaque key, trimmed only.
    Identifier,
    /// Display text, trimmed and title-cased.
    Text,
    Date,
    /// Integer count.
    Count,
    /// Currency amount.
    Currency,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Count | FieldKind::Currency)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Identifier => "identifier",
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Count => "count",
            FieldKind::Currency => "currency",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Cells
// =============================================================================

/// A single table value.
///
/// Raw tables only hold [`Cell::Text`] and [`Cell::Missing`]; cleaners turn
/// them into native types.
#[derive(Debug, Clone, Default)]
pub enum Cell {
    /// Explicit missing marker. Written as an empty field.
    #[default]
    Missing,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric value of integer and float cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// String form of the cell, `None` when missing.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Integer(i) => Some(i.to_string()),
            Cell::Float(f) => Some(format_float(*f)),
            Cell::Date(d) => Some(format_date(d)),
        }
    }

    /// Field as written to the output file.
    pub fn to_field(&self) -> String {
        self.to_text().unwrap_or_default()
    }
}

/// Floats always keep a decimal part: `45.0`, not `45`.
/// Plain decimal notation, never an exponent; whole values keep `.0`.
fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

fn format_date(value: &NaiveDateTime) -> String {
    if value.num_seconds_from_midnight() == 0 && value.nanosecond() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

// Floats produced by the numeric cleaner are always finite, so bitwise
// equality is a valid equivalence for deduplication.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Missing, Cell::Missing) => true,
            (Cell::Text(a), Cell::Text(b)) => a == b,
            (Cell::Integer(a), Cell::Integer(b)) => a == b,
            (Cell::Float(a), Cell::Float(b)) => a.to_bits() == b.to_bits(),
            (Cell::Date(a), Cell::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Missing => {}
            Cell::Text(s) => s.hash(state),
            Cell::Integer(i) => i.hash(state),
            Cell::Float(f) => f.to_bits().hash(state),
            Cell::Date(d) => d.hash(state),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

// =============================================================================
// Table
// =============================================================================

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Column of `len` missing cells.
    pub fn missing(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, vec![Cell::Missing; len])
    }

    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(Cell::is_missing)
    }

    pub fn has_values(&self) -> bool {
        !self.is_all_missing()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }
}

/// Ordered, column-oriented table.
///
/// Every column holds exactly [`Table::height`] cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    height: usize,
}

impl Table {
    /// Empty table with a fixed number of rows and no columns.
    pub fn with_height(height: usize) -> Self {
        Self {
            columns: Vec::new(),
            height,
        }
    }

    /// Build a table from a header row and data rows.
    ///
    /// Short rows are padded with missing cells, long rows are truncated.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let height = rows.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(height)))
            .collect();

        for row in rows {
            let mut values = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(values.next().unwrap_or_default());
            }
        }

        Self { columns, height }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// True when the column exists and holds at least one value.
    pub fn has_values(&self, name: &str) -> bool {
        self.column(name).is_some_and(Column::has_values)
    }

    /// Append a column. Its length is padded or truncated to the table height.
    pub fn push_column(&mut self, mut column: Column) {
        column.cells.resize(self.height, Cell::Missing);
        self.columns.push(column);
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.position(name)?;
        Some(self.columns.remove(idx))
    }

    /// Keep only the columns matching the predicate.
    pub fn retain_columns<F: FnMut(&Column) -> bool>(&mut self, f: F) {
        self.columns.retain(f);
    }

    /// Cells of one row, in column order.
    pub fn row(&self, idx: usize) -> Vec<&Cell> {
        self.columns.iter().map(|c| &c.cells[idx]).collect()
    }

    /// Rebuild rows in the order given by `indices`.
    ///
    /// Indices may omit rows (filtering) but must be in range.
    pub fn select_rows(&mut self, indices: &[usize]) {
        for column in self.columns.iter_mut() {
            let cells = std::mem::take(&mut column.cells);
            column.cells = indices.iter().map(|&i| cells[i].clone()).collect();
        }
        self.height = indices.len();
    }
}
