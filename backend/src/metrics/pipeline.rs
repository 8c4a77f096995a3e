//! High-level pipeline: CSV in, dashboard out.
//!
//! Every call is independent. Nothing computed here outlives the call.
//!
//! # Example
//!
//! ```rust,ignore
//! use installboard::metrics::pipeline::dashboard_from_file;
//! use installboard::PipelineConfig;
//!
//! let dashboard = dashboard_from_file("progress.csv", &PipelineConfig::default())?;
//! println!("{}% completed", dashboard.totals.overall_completion);
//! ```

use serde::Serialize;
use std::path::Path;

use super::aggregate::{aggregate_by_cluster, aggregate_totals, distribution};
use super::cleaning::{check_columns, clean_rows};
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning};
use crate::config::{DedupePolicy, PipelineConfig};
use crate::error::{MetricsResult, PipelineError, PipelineResult};
use crate::models::{ClusterSummary, DistributionSlice, InstallationRecord, OverallTotals, RawRow};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, ParseResult};

/// Where the rows came from.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub encoding: String,
    pub delimiter: char,
    pub columns: Vec<String>,
    pub row_count: usize,
}

/// Everything the presentation layer needs for one upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Headline metrics.
    pub totals: OverallTotals,
    /// Bar chart series, largest target first.
    pub clusters: Vec<ClusterSummary>,
    /// Detail table.
    pub records: Vec<InstallationRecord>,
    /// Pie chart slices.
    pub distribution: Vec<DistributionSlice>,
    pub source: SourceInfo,
    pub dedupe: DedupePolicy,
    pub duplicates_removed: usize,
}

/// What the presentation layer should show.
#[derive(Debug, Clone)]
pub enum DashboardState {
    /// No file uploaded yet; show a prompt.
    AwaitingInput,
    /// Metrics computed.
    Ready(Box<Dashboard>),
    /// Nothing derived may be shown; explain why.
    Unavailable {
        reason: String,
        missing_columns: Vec<String>,
    },
}

impl From<PipelineResult<Dashboard>> for DashboardState {
    fn from(result: PipelineResult<Dashboard>) -> Self {
        match result {
            Ok(dashboard) => DashboardState::Ready(Box::new(dashboard)),
            Err(err) => DashboardState::Unavailable {
                reason: err.to_string(),
                missing_columns: err.missing_columns().map(<[String]>::to_vec).unwrap_or_default(),
            },
        }
    }
}

impl From<Option<PipelineResult<Dashboard>>> for DashboardState {
    fn from(result: Option<PipelineResult<Dashboard>>) -> Self {
        match result {
            None => DashboardState::AwaitingInput,
            Some(result) => result.into(),
        }
    }
}

/// Compute the dashboard for rows that have already been parsed.
///
/// Fails only if a mapped column is missing from `source.columns`, in
/// which case no metrics are produced.
pub fn build_dashboard(
    rows: Vec<RawRow>,
    source: SourceInfo,
    config: &PipelineConfig,
) -> MetricsResult<Dashboard> {
    let columns = &config.column_map;

    log_info("🔎 Checking required columns...");
    if let Err(err) = check_columns(&source.columns, columns) {
        log_error(err.to_string());
        return Err(err);
    }
    log_success(format!("Found: {}", columns.required().join(", ")));

    log_info(format!("🧹 Cleaning {} rows (dedupe: {})...", rows.len(), config.dedupe));
    let cleaned = clean_rows(rows, columns, config.dedupe);
    if cleaned.duplicates_removed > 0 {
        log_warning(format!(
            "Dropped {} duplicate hospital row(s)",
            cleaned.duplicates_removed
        ));
    }

    log_info("📊 Aggregating...");
    let totals = aggregate_totals(&cleaned.records);
    let clusters = aggregate_by_cluster(&cleaned.records);
    log_info_indent(
        format!(
            "{} installed of {} required ({}%)",
            totals.total_installed, totals.total_required, totals.overall_completion
        ),
        1,
    );
    log_success(format!(
        "{} hospitals across {} clusters",
        cleaned.records.len(),
        clusters.len()
    ));

    Ok(Dashboard {
        distribution: distribution(&totals),
        totals,
        clusters,
        records: cleaned.records,
        source,
        dedupe: config.dedupe,
        duplicates_removed: cleaned.duplicates_removed,
    })
}

/// Compute the dashboard from a [`ParseResult`].
pub fn dashboard_from_parsed(
    parsed: ParseResult,
    config: &PipelineConfig,
) -> MetricsResult<Dashboard> {
    log_info("📖 Reading CSV file...");
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.rows.len()));

    let source = SourceInfo {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        columns: parsed.headers,
        row_count: parsed.rows.len(),
    };
    build_dashboard(parsed.rows, source, config)
}

/// Parse CSV bytes and compute the dashboard.
pub fn dashboard_from_bytes(bytes: &[u8], config: &PipelineConfig) -> PipelineResult<Dashboard> {
    let parsed = parse_bytes_auto(bytes, config.delimiter).map_err(|e| {
        log_error(e.to_string());
        PipelineError::from(e)
    })?;
    Ok(dashboard_from_parsed(parsed, config)?)
}

/// Read a CSV file and compute the dashboard.
pub fn dashboard_from_file<P: AsRef<Path>>(
    path: P,
    config: &PipelineConfig,
) -> PipelineResult<Dashboard> {
    let parsed = parse_csv_file_auto(path, config.delimiter)?;
    Ok(dashboard_from_parsed(parsed, config)?)
}

/// Compute the dashboard from JSON-style rows.
///
/// When `columns` is `None` the schema is the union of row keys in
/// first-seen order (sorted within a row, since rows are unordered maps).
pub fn dashboard_from_rows(
    rows: Vec<RawRow>,
    columns: Option<Vec<String>>,
    config: &PipelineConfig,
) -> MetricsResult<Dashboard> {
    let columns = columns.unwrap_or_else(|| infer_columns(&rows));
    let source = SourceInfo {
        encoding: "utf-8".to_string(),
        delimiter: ',',
        columns,
        row_count: rows.len(),
    };
    build_dashboard(rows, source, config)
}

fn infer_columns(rows: &[RawRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        let mut keys: Vec<&String> = row.keys().collect();
        keys.sort();
        for key in keys {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}
