//! Cluster and whole-dataset aggregation.
//!
//! Grouping is done over an ordered `Vec`: clusters keep the order in which
//! they were first seen, then a stable sort puts the largest targets first.

use std::collections::HashMap;

use crate::models::{
    percent_of, round2, ClusterSummary, DistributionSlice, InstallationRecord, OverallTotals,
};

/// Slice labels for the installed/remaining breakdown.
pub const INSTALLED_LABEL: &str = "Installed";
pub const REMAINING_LABEL: &str = "Remaining";

/// Group records by cluster, sorted by required tanks (descending, stable).
pub fn aggregate_by_cluster(records: &[InstallationRecord]) -> Vec<ClusterSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sums: Vec<(&str, f64, f64)> = Vec::new();

    for record in records {
        let slot = *index.entry(record.cluster.as_str()).or_insert_with(|| {
            sums.push((record.cluster.as_str(), 0.0, 0.0));
            sums.len() - 1
        });
        sums[slot].1 += record.tanks_required;
        sums[slot].2 += record.tanks_installed;
    }

    let mut summaries: Vec<ClusterSummary> = sums
        .into_iter()
        .map(|(cluster, required, installed)| ClusterSummary {
            cluster: cluster.to_string(),
            tanks_required: required,
            tanks_installed: installed,
            percent_completed: round2(percent_of(installed, required)),
        })
        .collect();

    // sort_by is stable: equal targets keep first-seen order
    summaries.sort_by(|a, b| b.tanks_required.total_cmp(&a.tanks_required));
    summaries
}

/// Sum every record into the four headline metrics.
pub fn aggregate_totals(records: &[InstallationRecord]) -> OverallTotals {
    let (required, installed) = records.iter().fold((0.0, 0.0), |(r, i), record| {
        (r + record.tanks_required, i + record.tanks_installed)
    });
    OverallTotals::from_sums(required, installed)
}

/// Installed vs remaining, in that order.
pub fn distribution(totals: &OverallTotals) -> Vec<DistributionSlice> {
    vec![
        DistributionSlice {
            label: INSTALLED_LABEL.to_string(),
            count: totals.total_installed,
        },
        DistributionSlice {
            label: REMAINING_LABEL.to_string(),
            count: totals.total_remaining,
        },
    ]
}
