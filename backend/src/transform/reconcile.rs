//! Cross-field reconciliation.
//!
//! Runs after cleaning, in this order:
//!
//! ```text
//! 1. quantity empty, orders has values  → quantity := orders  (orders removed)
//! 2. sales empty, amount has values     → sales := amount     (amount removed)
//! 3. quantity and unit_price have values → sales := quantity × unit_price
//!                                          (rows with a missing operand keep
//!                                           their supplied sales)
//! ```

use crate::models::{CanonicalField, Cell, Column, FieldKind, Table};

/// Auxiliary columns that may stand in for an empty canonical field.
pub const AUXILIARY_COLUMNS: &[(&str, FieldKind)] =
    &[("orders", FieldKind::Count), ("amount", FieldKind::Currency)];

const ADOPTIONS: &[(&str, CanonicalField)] = &[
    ("orders", CanonicalField::Quantity),
    ("amount", CanonicalField::Sales),
];

/// Apply every reconciliation rule. Never fails; a rule whose inputs are
/// absent is skipped.
pub fn reconcile(table: &mut Table) {
    for &(source, target) in ADOPTIONS {
        adopt(table, source, target.as_str());
    }
    derive_sales(table);
}

/// Move `source` into `target` when `target` is entirely missing.
fn adopt(table: &mut Table, source: &str, target: &str) {
    if table.has_values(target) || !table.has_values(source) {
        return;
    }
    let Some(column) = table.remove_column(source) else {
        return;
    };

    match table.column_mut(target) {
        Some(existing) => existing.cells = column.cells,
        None => table.push_column(Column::new(target, column.cells)),
    }
    tracing::info!(source, target, "empty field filled from auxiliary column");
}

/// Recompute sales from quantity and unit price wherever both are present.
fn derive_sales(table: &mut Table) {
    let quantity = CanonicalField::Quantity.as_str();
    let unit_price = CanonicalField::UnitPrice.as_str();
    let sales = CanonicalField::Sales.as_str();

    let products: Vec<Option<f64>> = match (table.column(quantity), table.column(unit_price)) {
        (Some(q), Some(p)) if q.has_values() && p.has_values() => q
            .cells
            .iter()
            .zip(&p.cells)
            .map(|(q, p)| Some(q.as_f64()? * p.as_f64()?))
            .collect(),
        _ => return,
    };

    let height = table.height();
    if table.column(sales).is_none() {
        table.push_column(Column::missing(sales, height));
    }
    let Some(column) = table.column_mut(sales) else {
        return;
    };

    let mut derived = 0usize;
    for (cell, product) in column.cells.iter_mut().zip(products) {
        if let Some(value) = product {
            *cell = Cell::Float(value);
            derived += 1;
        }
    }
    tracing::debug!(derived, "sales derived from quantity and unit price");
}
