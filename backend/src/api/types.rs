//! REST API types for the dashboard front end.
//!
//! One payload shape covers all three states. In the `awaiting_input` and
//! `error` states every derived field is omitted, so a client can never
//! render partial metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DedupePolicy;
use crate::metrics::pipeline::{format_delimiter, Dashboard, DashboardState};
use crate::models::{ClusterSummary, DistributionSlice, InstallationRecord, OverallTotals, RawRow};

/// Prompt shown before any file is uploaded.
pub const AWAITING_INPUT_MESSAGE: &str = "Please upload the CSV file to see the dashboard.";

/// Dashboard state, as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ready,
    AwaitingInput,
    Error,
}

/// Response to an upload (or to a dashboard request with no upload).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub job_id: String,
    pub status: ResponseStatus,
    pub generated_at: DateTime<Utc>,

    /// Human-readable prompt (awaiting input)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,

    /// Why no dashboard could be built (error)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub missing_columns: Vec<String>,

    /// Total required / installed / remaining / completion %
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metrics: Option<OverallTotals>,

    /// Bar chart data: required and installed per cluster
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub clusters: Option<Vec<ClusterSummary>>,

    /// Hospital-level table
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub records: Option<Vec<InstallationRecord>>,

    /// Pie chart data
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distribution: Option<Vec<DistributionSlice>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<ResponseMetadata>,
}

/// Metadata about the upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub source: CsvMetadata,
    pub dedupe: DedupePolicy,
    pub duplicates_removed: usize,
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl DashboardResponse {
    fn empty(status: ResponseStatus) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            status,
            generated_at: Utc::now(),
            message: None,
            error: None,
            missing_columns: Vec::new(),
            metrics: None,
            clusters: None,
            records: None,
            distribution: None,
            metadata: None,
        }
    }

    /// No file uploaded yet.
    pub fn awaiting_input() -> Self {
        Self {
            message: Some(AWAITING_INPUT_MESSAGE.to_string()),
            ..Self::empty(ResponseStatus::AwaitingInput)
        }
    }

    /// No dashboard can be shown.
    pub fn error(error: impl Into<String>, missing_columns: Vec<String>) -> Self {
        Self {
            error: Some(error.into()),
            missing_columns,
            ..Self::empty(ResponseStatus::Error)
        }
    }

    /// Metrics computed for an upload.
    pub fn ready(dashboard: Dashboard) -> Self {
        let metadata = ResponseMetadata {
            source: CsvMetadata {
                encoding: dashboard.source.encoding,
                delimiter: format_delimiter(dashboard.source.delimiter),
                row_count: dashboard.source.row_count,
                columns: dashboard.source.columns,
            },
            dedupe: dashboard.dedupe,
            duplicates_removed: dashboard.duplicates_removed,
        };

        Self {
            metrics: Some(dashboard.totals),
            clusters: Some(dashboard.clusters),
            records: Some(dashboard.records),
            distribution: Some(dashboard.distribution),
            metadata: Some(metadata),
            ..Self::empty(ResponseStatus::Ready)
        }
    }
}

impl From<DashboardState> for DashboardResponse {
    fn from(state: DashboardState) -> Self {
        match state {
            DashboardState::AwaitingInput => DashboardResponse::awaiting_input(),
            DashboardState::Ready(dashboard) => DashboardResponse::ready(*dashboard),
            DashboardState::Unavailable {
                reason,
                missing_columns,
            } => DashboardResponse::error(reason, missing_columns),
        }
    }
}

/// Body of `POST /api/records`
#[derive(Debug, Clone, Deserialize)]
pub struct RecordsRequest {
    /// Input schema; inferred from the row keys when absent
    #[serde(default)]
    pub columns: Option<Vec<String>>,
    pub rows: Vec<RawRow>,
}

/// Query string accepted by the upload endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadParams {
    /// Per-request dedupe override
    #[serde(default)]
    pub dedupe: Option<DedupePolicy>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::metrics::pipeline::dashboard_from_bytes;
    use serde_json::json;

    #[test]
    fn test_awaiting_input_has_no_metrics() {
        let json = serde_json::to_value(DashboardResponse::awaiting_input()).unwrap();
        assert_eq!(json["status"], "awaiting_input");
        assert_eq!(json["message"], AWAITING_INPUT_MESSAGE);
        assert!(json.get("metrics").is_none());
        assert!(json.get("records").is_none());
    }

    #[test]
    fn test_error_withholds_everything() {
        let response = DashboardResponse::from(DashboardState::Unavailable {
            reason: "Missing required column(s): # Installed".into(),
            missing_columns: vec!["# Installed".into()],
        });
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["missingColumns"], json!(["# Installed"]));
        for key in ["metrics", "clusters", "records", "distribution", "metadata"] {
            assert!(json.get(key).is_none(), "{} should be withheld", key);
        }
    }

    #[test]
    fn test_ready_payload_shape() {
        let csv = "Cluster,Hospital,# Tanks MoH,# Installed\nA,H1,10,10\nA,H2,5,0\n";
        let dashboard = dashboard_from_bytes(csv.as_bytes(), &PipelineConfig::default()).unwrap();
        let json = serde_json::to_value(DashboardResponse::ready(dashboard)).unwrap();

        assert_eq!(json["status"], "ready");
        assert_eq!(json["metrics"]["totalRequired"], 15.0);
        assert_eq!(json["metrics"]["totalRemaining"], 5.0);
        assert_eq!(json["metrics"]["overallCompletion"], 66.67);
        assert_eq!(json["clusters"][0]["tanksInstalled"], 10.0);
        assert_eq!(json["records"][1]["statusType"], "Not Completed");
        assert_eq!(json["records"][0]["percentCompleted"], 100.0);
        assert_eq!(json["distribution"][0]["label"], "Installed");
        assert_eq!(json["metadata"]["dedupe"], "first-wins");
        assert_eq!(json["metadata"]["source"]["delimiter"], ",");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_records_request_parsing() {
        let request: RecordsRequest = serde_json::from_value(json!({
            "rows": [{ "Cluster": "A", "# Installed": 2 }]
        }))
        .unwrap();
        assert!(request.columns.is_none());
        assert_eq!(request.rows.len(), 1);
    }

    #[test]
    fn test_upload_params() {
        let params: UploadParams = serde_json::from_value(json!({ "dedupe": "none" })).unwrap();
        assert_eq!(params.dedupe, Some(DedupePolicy::None));
    }
}
