//! Header normalization and the static alias table.
//!
//! Raw headers are tokenized (lower-cased, trimmed, non-word runs collapsed to
//! `_`) and then looked up in [`ALIAS_TABLE`]. Unknown tokens are kept as
//! passthrough columns so unexpected data is never discarded.
//!
//! ```text
//! "User_ID"        → user_id        → customer_id
//! " Cust. Name "   → cust_name      → customer_name
//! "Amount"         → amount         → amount (passthrough)
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::error::{Diagnostics, SchemaWarning};
use crate::models::{CanonicalField, Cell, Column, Table};

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("static regex"));

/// Known raw header spellings per canonical field.
///
/// Entries are normalized when the table is built, so spacing and case here
/// are free-form. `orders` and `amount` are deliberately absent: they are
/// adopted during reconciliation only when the canonical field is empty.
const ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::CustomerId,
        &[
            "customer_id", "customer id", "customerid", "cust_id", "cust id", "user_id",
            "userid", "client_id", "customer_no", "customer number", "customer_code",
        ],
    ),
    (
        CanonicalField::CustomerName,
        &[
            "customer_name", "customer name", "customername", "cust_name", "cust name",
            "customer", "client", "client_name", "buyer", "buyer_name", "full_name",
        ],
    ),
    (
        CanonicalField::OrderDate,
        &[
            "order_date", "order date", "orderdate", "date", "order_dt", "purchase_date",
            "sale_date", "sales_date", "transaction_date", "invoice_date",
        ],
    ),
    (
        CanonicalField::Quantity,
        &[
            "quantity", "qty", "quantity_ordered", "qty_ordered", "units", "units_sold",
            "no_of_units", "order_quantity",
        ],
    ),
    (
        CanonicalField::UnitPrice,
        &[
            "unit_price", "unit price", "unitprice", "price", "price_each", "price_per_unit",
            "unit_cost", "rate",
        ],
    ),
    (
        CanonicalField::Sales,
        &[
            "sales", "sale_amount", "sales_amount", "total", "total_sales", "total_amount",
            "revenue", "order_total", "line_total",
        ],
    ),
    (
        CanonicalField::Product,
        &["product", "product_name", "productname", "item", "item_name", "sku_name"],
    ),
    (
        CanonicalField::Category,
        &[
            "category", "product_category", "productcategory", "product_type", "category_name",
            "item_category",
        ],
    ),
    (
        CanonicalField::City,
        &["city", "town", "customer_city", "city_name", "ship_city"],
    ),
    (
        CanonicalField::MaritalStatus,
        &["marital_status", "marital status", "maritalstatus", "marital", "married"],
    ),
    (
        CanonicalField::AgeGroup,
        &["age_group", "age group", "agegroup", "age_bracket", "age_range", "age_band"],
    ),
    (
        CanonicalField::Occupation,
        &["occupation", "profession", "job", "job_title"],
    ),
    (CanonicalField::Gender, &["gender", "sex"]),
    (
        CanonicalField::Zone,
        &["zone", "region", "sales_zone", "sales_region", "territory"],
    ),
];

/// Normalized header token → canonical field. Built once per process.
pub static ALIAS_TABLE: Lazy<HashMap<String, CanonicalField>> =
    Lazy::new(|| build_alias_table(ALIASES));

/// Build a lookup from alias entries. A duplicated variant keeps the last field.
fn build_alias_table(entries: &[(CanonicalField, &[&str])]) -> HashMap<String, CanonicalField> {
    let mut table = HashMap::new();
    for &(field, variants) in entries {
        table.insert(field.as_str().to_string(), field);
        for variant in variants {
            if let Some(previous) = table.insert(normalize_token(variant), field) {
                if previous != field {
                    tracing::warn!(variant = *variant, %previous, %field, "alias listed under two fields");
                }
            }
        }
    }
    table
}

/// Lower-case, trim and collapse non-word runs to a single underscore.
pub fn normalize_token(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    NON_WORD
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Canonical field for a normalized token, if any.
pub fn lookup(token: &str) -> Option<CanonicalField> {
    ALIAS_TABLE.get(token).copied()
}

/// How one raw header was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeader {
    pub raw: String,
    /// Output column name.
    pub column: String,
    pub canonical: Option<CanonicalField>,
}

/// Resolve a raw header at position `idx` to its output column name.
pub fn resolve_header(raw: &str, idx: usize) -> ResolvedHeader {
    let token = normalize_token(raw);
    let canonical = lookup(&token);
    let column = match canonical {
        Some(field) => field.as_str().to_string(),
        None if token.is_empty() => format!("unnamed_{}", idx),
        None => token,
    };

    ResolvedHeader {
        raw: raw.to_string(),
        column,
        canonical,
    }
}

/// Rename every column, merge duplicates and guarantee all canonical columns.
///
/// Output order is canonical fields first, then passthrough columns in input
/// order. Running this on its own output is a no-op.
pub fn normalize_headers(table: Table, diagnostics: &mut Diagnostics) -> Table {
    let height = table.height();
    let mut renamed: Vec<Column> = Vec::with_capacity(table.width());

    for (idx, column) in table.into_columns().into_iter().enumerate() {
        let resolved = resolve_header(&column.name, idx);

        match renamed.iter_mut().find(|c| c.name == resolved.column) {
            Some(existing) => {
                merge_into(existing, &column.cells);
                diagnostics.schema(SchemaWarning::DuplicateColumn {
                    column: resolved.column,
                    raw_header: resolved.raw,
                });
            }
            None => renamed.push(Column::new(resolved.column, column.cells)),
        }
    }

    let mut result = Table::with_height(height);

    for field in CanonicalField::ALL {
        match renamed.iter().position(|c| c.name == field.as_str()) {
            Some(pos) => result.push_column(renamed.remove(pos)),
            None => {
                diagnostics.schema(SchemaWarning::MissingField {
                    field: field.as_str().to_string(),
                });
                result.push_column(Column::missing(field.as_str(), height));
            }
        }
    }

    for column in renamed {
        result.push_column(column);
    }

    tracing::debug!(columns = ?result.column_names(), "headers normalized");
    result
}

/// Fill gaps of `target` from `source`; existing values win.
fn merge_into(target: &mut Column, source: &[Cell]) {
    for (cell, incoming) in target.cells.iter_mut().zip(source) {
        if cell.is_missing() {
            *cell = incoming.clone();
        }
    }
}
