//! CSV export of feature tables and labelled datasets for external inspection.

use std::path::Path;

use anyhow::{Context, Result};
use pivotlab_core::features::FeatureTable;
use pivotlab_core::labels::LabeledTable;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn header(table: &FeatureTable, extra: Option<&str>) -> Vec<String> {
    let mut columns = vec!["timestamp".to_string(), "close".to_string()];
    columns.extend(table.columns().iter().cloned());
    columns.extend(extra.map(str::to_string));
    columns
}

/// Every computed column, one row per retained bar.
///
/// Columns: timestamp, close, then the feature columns in engine order.
pub fn export_features_csv(table: &FeatureTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(header(table, None))?;

    for row in table.rows() {
        let mut record = vec![
            row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.6}", row.close),
        ];
        record.extend(row.values.iter().map(|v| format!("{v:.6}")));
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Feature columns plus the label (-1, 0, 1) of each row.
pub fn export_labeled_csv(labeled: &LabeledTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(header(labeled.features(), Some("label")))?;

    for (row, label) in labeled.iter() {
        let mut record = vec![
            row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.6}", row.close),
        ];
        record.extend(row.values.iter().map(|v| format!("{v:.6}")));
        record.push(label.value().to_string());
        wtr.write_record(&record)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `csv` to `path`, creating parent directories as needed.
pub fn write_csv(path: &Path, csv: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pivotlab_core::features::FeatureRow;
    use pivotlab_core::labels::attach_labels;

    fn table() -> FeatureTable {
        let ts = |d| {
            NaiveDate::from_ymd_opt(2024, 3, d)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        };
        FeatureTable::new(
            vec!["a".into(), "b".into()],
            vec![
                FeatureRow {
                    timestamp: ts(4),
                    close: 100.0,
                    values: vec![1.0, -0.5],
                },
                FeatureRow {
                    timestamp: ts(5),
                    close: 110.0,
                    values: vec![2.0, 0.25],
                },
            ],
        )
    }

    #[test]
    fn features_csv_has_header_and_rows() {
        let csv = export_features_csv(&table()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,close,a,b");
        assert_eq!(lines[1], "2024-03-04 12:00:00,100.000000,1.000000,-0.500000");
    }

    #[test]
    fn labeled_csv_appends_label() {
        let labeled = attach_labels(&table(), 1, 0.05).unwrap();
        let csv = export_labeled_csv(&labeled).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(",label"));
        assert!(lines[1].ends_with(",1"));
    }

    #[test]
    fn write_csv_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("features.csv");
        write_csv(&path, "x\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "x\n");
    }
}
