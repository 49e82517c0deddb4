//! Transformation module.
//!
//! Turns a raw table into the canonical sales table:
//! - Headers: normalization and the alias table
//! - Cleaners: per-field type coercion
//! - Reconcile: quantity/sales adoption and derivation
//! - Pipeline: the ordered stages end to end

pub mod cleaners;
pub mod headers;
pub mod pipeline;
pub mod reconcile;

pub use cleaners::{Cleaner, DateHeuristic};
pub use headers::{normalize_headers, normalize_token, resolve_header, ResolvedHeader};
pub use pipeline::*;
pub use reconcile::reconcile;
