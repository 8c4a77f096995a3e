//! Metrics pipeline.
//!
//! - Cleaning: numeric coercion, dedupe, derived per-row fields
//! - Aggregate: cluster summaries, overall totals, distribution
//! - Pipeline: parse + clean + aggregate in one call

pub mod aggregate;
pub mod cleaning;
pub mod pipeline;

pub use aggregate::{aggregate_by_cluster, aggregate_totals, distribution};
pub use cleaning::{
    check_columns, clean_rows, deduplicate_by_hospital, derive_record_fields, parse_numeric,
    CleanedRecords,
};
pub use pipeline::*;
