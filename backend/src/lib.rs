//! # Installboard - oxygen-tank installation progress dashboard
//!
//! Turns an installation-progress CSV (one row per hospital) into the
//! numbers a dashboard needs: headline totals, a per-cluster breakdown,
//! a hospital-level table and an installed/remaining split.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Cleaning   │────▶│  Dashboard  │
//! │  (upload)   │     │  (auto-enc) │     │ (+ dedupe)  │     │  (totals,   │
//! └─────────────┘     └─────────────┘     └─────────────┘     │  clusters)  │
//!                                                             └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use installboard::{dashboard_from_file, PipelineConfig};
//!
//! let dashboard = dashboard_from_file("progress.csv", &PipelineConfig::default())?;
//! println!("{} of {} tanks installed", dashboard.totals.total_installed, dashboard.totals.total_required);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Records, summaries, totals
//! - [`config`] - Dedupe policy and column mapping
//! - [`parser`] - CSV parsing with auto-detection
//! - [`metrics`] - Cleaning, aggregation and pipeline
//! - [`validation`] - Config schema validation
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;
pub mod config;

// Parsing
pub mod parser;

// Metrics
pub mod metrics;

// Validation
pub mod validation;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ConfigError, CsvError, MetricsError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models & Config
// =============================================================================

pub use models::{
    ClusterSummary, DistributionSlice, InstallationRecord, OverallTotals, RawCell, RawRow,
    StatusType,
};

pub use config::{ColumnMap, DedupePolicy, PipelineConfig};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    csv_to_rows, decode_content, detect_delimiter, detect_encoding, parse_bytes_auto,
    parse_csv, parse_csv_file_auto, ParseResult,
};

// =============================================================================
// Re-exports - Metrics
// =============================================================================

pub use metrics::{
    aggregate_by_cluster, aggregate_totals, dashboard_from_bytes, dashboard_from_file,
    dashboard_from_rows, deduplicate_by_hospital, derive_record_fields, parse_numeric, Dashboard,
    DashboardState,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{DashboardResponse, ResponseStatus};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
