//! Domain models for the installation dashboard.
//!
//! - [`RawCell`] / [`RawRow`] - loosely-typed input cells, keyed by column name
//! - [`InstallationRecord`] - one cleaned hospital row with derived fields
//! - [`StatusType`] - completion status of a hospital
//! - [`ClusterSummary`] - per-cluster aggregate
//! - [`OverallTotals`] - whole-dataset aggregate
//! - [`DistributionSlice`] - installed vs remaining breakdown

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Raw input
// =============================================================================

/// A single loosely-typed input cell.
///
/// CSV cells arrive as [`RawCell::Text`] (or [`RawCell::Empty`] when blank);
/// JSON input may also carry numbers and nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum RawCell {
    /// A number as sent by the client.
    Number(f64),
    /// Any textual value.
    Text(String),
    /// Blank cell or `null`.
    #[default]
    Empty,
}

impl RawCell {
    /// Build a cell from CSV text, mapping blank strings to [`RawCell::Empty`].
    pub fn from_text(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(trimmed.to_string())
        }
    }

    /// Render the cell as a label (cluster and hospital names).
    pub fn as_label(&self) -> String {
        match self {
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{:.0}", n),
            RawCell::Number(n) => n.to_string(),
            RawCell::Empty => String::new(),
        }
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::from_text(value)
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

/// One input row: column name to cell.
pub type RawRow = HashMap<String, RawCell>;

// =============================================================================
// Cleaned records
// =============================================================================

/// Completion status of a single hospital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusType {
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Not Completed")]
    NotCompleted,
}

impl StatusType {
    /// `Completed` iff everything required is installed and something was required.
    pub fn from_counts(tanks_required: f64, tanks_installed: f64) -> Self {
        if tanks_required > 0.0 && tanks_installed >= tanks_required {
            StatusType::Completed
        } else {
            StatusType::NotCompleted
        }
    }
}

/// One hospital row after cleaning, with its derived fields.
///
/// Build with [`InstallationRecord::new`] so the derived fields always
/// match the counts they come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationRecord {
    pub cluster: String,
    pub hospital: String,
    pub tanks_required: f64,
    pub tanks_installed: f64,
    pub remaining: f64,
    pub percent_completed: f64,
    pub status_type: StatusType,
}

impl InstallationRecord {
    pub fn new(
        cluster: impl Into<String>,
        hospital: impl Into<String>,
        tanks_required: f64,
        tanks_installed: f64,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            hospital: hospital.into(),
            tanks_required,
            tanks_installed,
            remaining: tanks_required - tanks_installed,
            percent_completed: percent_of(tanks_installed, tanks_required),
            status_type: StatusType::from_counts(tanks_required, tanks_installed),
        }
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// Totals for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub cluster: String,
    pub tanks_required: f64,
    pub tanks_installed: f64,
    /// Ratio of the sums, rounded to 2 decimals.
    pub percent_completed: f64,
}

/// Totals across the whole cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OverallTotals {
    pub total_required: f64,
    pub total_installed: f64,
    pub total_remaining: f64,
    /// Rounded to 2 decimals; the percent sign is left to the presentation layer.
    pub overall_completion: f64,
}

impl OverallTotals {
    pub fn from_sums(total_required: f64, total_installed: f64) -> Self {
        Self {
            total_required,
            total_installed,
            total_remaining: total_required - total_installed,
            overall_completion: round2(percent_of(total_installed, total_required)),
        }
    }
}

/// One slice of the installed/remaining breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSlice {
    pub label: String,
    pub count: f64,
}

// =============================================================================
// Numeric helpers
// =============================================================================

/// `part / whole * 100`, or 0 when `whole` is not positive.
pub fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Round to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Tests
// =============================================================================
