//! Row cleaning: numeric coercion, hospital deduplication and derived fields.
//!
//! Nothing in here fails on bad cell values. Unparseable, blank, negative
//! or non-finite counts become `0`; the only structural check is
//! [`check_columns`].

use std::collections::HashSet;

use crate::config::{ColumnMap, DedupePolicy};
use crate::error::{MetricsError, MetricsResult};
use crate::models::{InstallationRecord, RawCell, RawRow};

/// Coerce a cell to a number. Never fails: anything unusable is `0`.
///
/// ```ignore
/// assert_eq!(parse_numeric(&RawCell::from_text(" 12 ")), 12.0);
/// assert_eq!(parse_numeric(&RawCell::from_text("n/a")), 0.0);
/// ```
pub fn parse_numeric(cell: &RawCell) -> f64 {
    let value = match cell {
        RawCell::Number(n) => *n,
        RawCell::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        RawCell::Empty => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Tank counts are non-negative; a negative count is treated as invalid.
fn parse_count(cell: Option<&RawCell>) -> f64 {
    let value = cell.map(parse_numeric).unwrap_or(0.0);
    if value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Fail if any mapped column is absent from `headers`.
///
/// Every missing column is reported, in [`ColumnMap::required`] order.
pub fn check_columns(headers: &[String], columns: &ColumnMap) -> MetricsResult<()> {
    let missing: Vec<String> = columns
        .required()
        .into_iter()
        .filter(|name| !headers.iter().any(|h| h == name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MetricsError::MissingColumn { columns: missing })
    }
}

/// Apply the dedupe policy over `hospital_column`.
///
/// With [`DedupePolicy::FirstWins`] the first row for each hospital is kept
/// and later ones are dropped, preserving input order.
pub fn deduplicate_by_hospital(
    rows: Vec<RawRow>,
    hospital_column: &str,
    policy: DedupePolicy,
) -> Vec<RawRow> {
    match policy {
        DedupePolicy::None => rows,
        DedupePolicy::FirstWins => {
            let mut seen = HashSet::new();
            rows.into_iter()
                .filter(|row| {
                    let key = row
                        .get(hospital_column)
                        .map(RawCell::as_label)
                        .unwrap_or_default();
                    seen.insert(key)
                })
                .collect()
        }
    }
}

/// Build a cleaned [`InstallationRecord`] from a raw row.
pub fn derive_record_fields(row: &RawRow, columns: &ColumnMap) -> InstallationRecord {
    let label = |col: &str| row.get(col).map(RawCell::as_label).unwrap_or_default();

    InstallationRecord::new(
        label(&columns.cluster),
        label(&columns.hospital),
        parse_count(row.get(&columns.tanks_required)),
        parse_count(row.get(&columns.tanks_installed)),
    )
}

/// Cleaned records plus what the dedupe step dropped.
#[derive(Debug, Clone)]
pub struct CleanedRecords {
    pub records: Vec<InstallationRecord>,
    pub duplicates_removed: usize,
}

/// Dedupe then derive every row.
pub fn clean_rows(rows: Vec<RawRow>, columns: &ColumnMap, policy: DedupePolicy) -> CleanedRecords {
    let before = rows.len();
    let kept = deduplicate_by_hospital(rows, &columns.hospital, policy);
    let duplicates_removed = before - kept.len();

    CleanedRecords {
        records: kept
            .iter()
            .map(|row| derive_record_fields(row, columns))
            .collect(),
        duplicates_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusType;

    fn row(cluster: &str, hospital: &str, required: &str, installed: &str) -> RawRow {
        let columns = ColumnMap::default();
        RawRow::from([
            (columns.cluster, RawCell::from_text(cluster)),
            (columns.hospital, RawCell::from_text(hospital)),
            (columns.tanks_required, RawCell::from_text(required)),
            (columns.tanks_installed, RawCell::from_text(installed)),
        ])
    }

    #[test]
    fn test_parse_numeric() {
        assert_eq!(parse_numeric(&RawCell::from_text("12")), 12.0);
        assert_eq!(parse_numeric(&RawCell::from_text(" 2.5 ")), 2.5);
        assert_eq!(parse_numeric(&RawCell::from_text("1e2")), 100.0);
        assert_eq!(parse_numeric(&RawCell::Number(7.0)), 7.0);
        assert_eq!(parse_numeric(&RawCell::from_text("-3")), -3.0);
    }

    #[test]
    fn test_parse_numeric_absorbs_garbage() {
        assert_eq!(parse_numeric(&RawCell::from_text("n/a")), 0.0);
        assert_eq!(parse_numeric(&RawCell::from_text("1,000")), 0.0);
        assert_eq!(parse_numeric(&RawCell::from_text("NaN")), 0.0);
        assert_eq!(parse_numeric(&RawCell::from_text("inf")), 0.0);
        assert_eq!(parse_numeric(&RawCell::Number(f64::NAN)), 0.0);
        assert_eq!(parse_numeric(&RawCell::Empty), 0.0);
    }

    #[test]
    fn test_check_columns() {
        let columns = ColumnMap::default();
        let headers: Vec<String> = ["Cluster", "Hospital", "# Tanks MoH", "# Installed", "Notes"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(check_columns(&headers, &columns).is_ok());

        let err = check_columns(&headers[..3], &columns).unwrap_err();
        assert_eq!(
            err,
            MetricsError::MissingColumn {
                columns: vec!["# Installed".into()]
            }
        );
    }

    #[test]
    fn test_check_columns_reports_all_missing() {
        let err = check_columns(&["Hospital".to_string()], &ColumnMap::default()).unwrap_err();
        let MetricsError::MissingColumn { columns } = err;
        assert_eq!(columns, vec!["Cluster", "# Tanks MoH", "# Installed"]);
    }

    #[test]
    fn test_dedupe_first_wins() {
        let rows = vec![
            row("A", "H1", "10", "1"),
            row("B", "H2", "5", "5"),
            row("C", "H1", "99", "99"),
        ];
        let kept = deduplicate_by_hospital(rows, "Hospital", DedupePolicy::FirstWins);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0]["Cluster"].as_label(), "A");
        assert_eq!(kept[1]["Hospital"].as_label(), "H2");
    }

    #[test]
    fn test_dedupe_none_keeps_everything() {
        let rows = vec![row("A", "H1", "1", "1"), row("A", "H1", "1", "1")];
        assert_eq!(deduplicate_by_hospital(rows, "Hospital", DedupePolicy::None).len(), 2);
    }

    #[test]
    fn test_derive_record_fields() {
        let record = derive_record_fields(&row("A", "H1", "10", "10"), &ColumnMap::default());
        assert_eq!(record.cluster, "A");
        assert_eq!(record.tanks_required, 10.0);
        assert_eq!(record.remaining, 0.0);
        assert_eq!(record.percent_completed, 100.0);
        assert_eq!(record.status_type, StatusType::Completed);
    }

    #[test]
    fn test_derive_record_fields_bad_cells() {
        let record = derive_record_fields(&row("A", "H1", "", "abc"), &ColumnMap::default());
        assert_eq!(record.tanks_required, 0.0);
        assert_eq!(record.tanks_installed, 0.0);
        assert_eq!(record.percent_completed, 0.0);
        assert_eq!(record.status_type, StatusType::NotCompleted);

        let negative = derive_record_fields(&row("A", "H2", "-4", "2"), &ColumnMap::default());
        assert_eq!(negative.tanks_required, 0.0);
        assert_eq!(negative.remaining, -2.0);
    }

    #[test]
    fn test_clean_rows_counts_duplicates() {
        let rows = vec![
            row("A", "H1", "10", "1"),
            row("A", "H1", "10", "1"),
            row("A", "H1", "10", "1"),
        ];
        let cleaned = clean_rows(rows, &ColumnMap::default(), DedupePolicy::FirstWins);
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.duplicates_removed, 2);
    }
}
