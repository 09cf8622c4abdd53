//! Read-side of the quality engine: duplicates, null distribution, types and ranges.

use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

use super::report::{
    CheckKind, CheckStatus, DuplicateEntry, DuplicateReport, NullEntry, NullReport,
    ValidationEntry, ValidationReport,
};
use crate::error::Result;
use crate::rowset::{Datasets, RowSet};
use crate::temporal;

const ROW_INDEX: &str = "__row_index";
const OCCURRENCES: &str = "__occurrences";
const FIRST_ROW: &str = "__first_row";

#[derive(Debug, Default, Clone, Copy)]
pub struct QualityChecker;

impl QualityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Report every row that repeats an earlier row across all columns.
    ///
    /// The first occurrence of each row value is canonical and not reported.
    pub fn check_duplicates(&self, datasets: &Datasets) -> Result<DuplicateReport> {
        let mut report = DuplicateReport::default();

        for set in datasets.iter() {
            let repeats = repeated_rows(set.frame())?;
            let found = repeats.len();
            for (row_index, occurrences) in repeats {
                report.entries.push(DuplicateEntry {
                    dataset: set.name().to_string(),
                    row_index,
                    occurrences,
                    values: render_row(set.frame(), row_index)?,
                });
            }

            if found > 0 {
                info!("Dataset '{}' has {} duplicate rows", set.name(), found);
            } else {
                debug!("Dataset '{}' has no duplicate rows", set.name());
            }
        }

        Ok(report)
    }

    /// Summarise nulls per column.
    ///
    /// Columns named like `*date*`/`*timestamp*` are coerced to datetimes first;
    /// values that fail to parse become null and the coercion stays in the RowSet.
    pub fn check_nulls(&self, datasets: &mut Datasets) -> Result<NullReport> {
        let mut report = NullReport::default();

        for set in datasets.iter_mut() {
            coerce_temporal_columns(set)?;

            let total = set.height();
            let before = report.entries.len();
            for series in set.frame().get_columns() {
                let null_count = series.null_count();
                if null_count == 0 {
                    continue;
                }
                report.entries.push(NullEntry {
                    dataset: set.name().to_string(),
                    column: series.name().to_string(),
                    dtype: series.dtype().clone(),
                    null_count,
                    null_percentage: null_count as f64 / total as f64 * 100.0,
                    is_temporal: temporal::is_temporal(series.dtype()),
                });
            }

            if report.entries.len() > before {
                info!(
                    "Dataset '{}' has null values in {} columns",
                    set.name(),
                    report.entries.len() - before
                );
            }
        }

        Ok(report)
    }

    /// Compare runtime types and numeric ranges against expectations.
    ///
    /// Both maps are keyed by column name and apply to every dataset holding
    /// that column. A declared range on a non-numeric column is skipped.
    pub fn validate_types_and_ranges(
        &self,
        datasets: &Datasets,
        expected_types: &HashMap<String, DataType>,
        value_ranges: &HashMap<String, (f64, f64)>,
    ) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        for set in datasets.iter() {
            for series in set.frame().get_columns() {
                let column = series.name();

                if let Some(expected) = expected_types.get(column) {
                    let actual = series.dtype();
                    report.entries.push(ValidationEntry {
                        dataset: set.name().to_string(),
                        column: column.to_string(),
                        check: CheckKind::DataType,
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                        status: CheckStatus::from_bool(actual == expected),
                    });
                }

                if let Some((min, max)) = value_ranges.get(column) {
                    if !series.dtype().is_numeric() {
                        debug!("Skipping range check on non-numeric column '{}'", column);
                        continue;
                    }
                    let in_range = series
                        .cast(&DataType::Float64)?
                        .f64()?
                        .into_iter()
                        .flatten()
                        .all(|v| v >= *min && v <= *max);
                    report.entries.push(ValidationEntry {
                        dataset: set.name().to_string(),
                        column: column.to_string(),
                        check: CheckKind::ValueRange,
                        expected: format!("{} to {}", min, max),
                        actual: if in_range {
                            "All values in range".to_string()
                        } else {
                            "Out of range values exist".to_string()
                        },
                        status: CheckStatus::from_bool(in_range),
                    });
                }
            }
        }

        Ok(report)
    }
}

fn coerce_temporal_columns(set: &mut RowSet) -> Result<()> {
    let names: Vec<String> = set
        .frame()
        .get_column_names()
        .iter()
        .filter(|name| temporal::is_temporal_name(name))
        .map(|name| name.to_string())
        .collect();

    for name in names {
        let coerced = temporal::coerce_to_datetime(set.frame().column(&name)?)?;
        set.frame_mut().with_column(coerced)?;
        debug!("Coerced column '{}' of '{}' to datetime", name, set.name());
    }
    Ok(())
}

/// `(row_index, occurrences)` for every row equal to an earlier one.
///
/// Nulls compare equal, as in `DataFrame::is_duplicated`.
fn repeated_rows(frame: &DataFrame) -> Result<Vec<(usize, usize)>> {
    if frame.width() == 0 || frame.height() < 2 {
        return Ok(Vec::new());
    }
    let mask = frame.is_duplicated()?;
    if !mask.any() {
        return Ok(Vec::new());
    }

    let keys: Vec<Expr> = frame.get_column_names().into_iter().map(col).collect();
    let repeats = frame
        .with_row_index(ROW_INDEX, None)?
        .filter(&mask)?
        .lazy()
        .select([
            col(ROW_INDEX),
            col(ROW_INDEX).count().over(keys.clone()).alias(OCCURRENCES),
            col(ROW_INDEX).first().over(keys).alias(FIRST_ROW),
        ])
        .filter(col(ROW_INDEX).neq(col(FIRST_ROW)))
        .collect()?;

    let rows = repeats.column(ROW_INDEX)?.cast(&DataType::UInt64)?;
    let counts = repeats.column(OCCURRENCES)?.cast(&DataType::UInt64)?;
    Ok(rows
        .u64()?
        .into_iter()
        .zip(counts.u64()?.into_iter())
        .filter_map(|(row, count)| Some((row? as usize, count? as usize)))
        .collect())
}

fn render_row(frame: &DataFrame, idx: usize) -> Result<Vec<(String, String)>> {
    frame
        .get_columns()
        .iter()
        .map(|s| -> Result<(String, String)> { Ok((s.name().to_string(), s.get(idx)?.to_string())) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn news() -> Datasets {
        let frame = df![
            "url" => ["http://x/1", "http://x/2", "http://x/1", "http://x/1"],
            "title" => ["a", "b", "a", "a"],
            "views" => [Some(1i64), Some(2), Some(1), Some(1)],
        ]
        .unwrap();
        Datasets::from(RowSet::new("bbc", frame))
    }

    #[test]
    fn reports_every_repeat_with_total_count() {
        let report = QualityChecker::new().check_duplicates(&news()).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.entries[0].row_index, 2);
        assert_eq!(report.entries[1].row_index, 3);
        assert!(report.entries.iter().all(|e| e.occurrences == 3));
        assert!(report.entries.iter().all(|e| e.dataset == "bbc"));
        assert_eq!(report.entries[0].values.len(), 3);
    }

    #[test]
    fn rows_differing_in_one_column_are_not_duplicates() {
        let frame = df![
            "url" => ["http://x/1", "http://x/1"],
            "title" => ["a", "b"],
        ]
        .unwrap();
        let sets = Datasets::from(RowSet::new("bbc", frame));
        let report = QualityChecker::new().check_duplicates(&sets).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn interleaved_groups_count_separately_and_nulls_match() {
        let frame = df![
            "url" => [Some("a"), None, Some("a"), None, Some("b"), None],
            "title" => ["t", "n", "t", "n", "t", "n"],
        ]
        .unwrap();
        let sets = Datasets::from(RowSet::new("bbc", frame));
        let report = QualityChecker::new().check_duplicates(&sets).unwrap();

        let found: Vec<(usize, usize)> = report
            .entries
            .iter()
            .map(|e| (e.row_index, e.occurrences))
            .collect();
        assert_eq!(found, vec![(2, 2), (3, 3), (5, 3)]);
    }

    #[test]
    fn null_report_coerces_temporal_columns() {
        let frame = df![
            "updated" => [Some("15-03-2024"), Some("garbage"), Some("16-03-2024"), None],
            "category" => [Some("Tech"), None, Some("World"), Some("World")],
            "url" => ["a", "b", "c", "d"],
        ]
        .unwrap();
        let mut sets = Datasets::from(RowSet::new("bbc", frame));

        let report = QualityChecker::new().check_nulls(&mut sets).unwrap();

        let updated = report.find("bbc", "updated").unwrap();
        assert_eq!(updated.null_count, 2);
        assert_eq!(updated.null_percentage, 50.0);
        assert!(updated.is_temporal);

        let category = report.find("bbc", "category").unwrap();
        assert_eq!(category.null_count, 1);
        assert_eq!(category.null_percentage, 25.0);
        assert!(!category.is_temporal);

        assert!(report.find("bbc", "url").is_none());

        // Coercion persists in the RowSet
        let dtype = sets.get("bbc").unwrap().frame().column("updated").unwrap().dtype().clone();
        assert!(temporal::is_temporal(&dtype));
    }

    #[test]
    fn type_and_range_validation() {
        let frame = df![
            "year" => [Some(2020i64), Some(1850), None],
            "day" => [1.0f64, 15.0, 31.0],
            "month" => ["1", "2", "3"],
        ]
        .unwrap();
        let sets = Datasets::from(RowSet::new("bbc", frame));

        let types: HashMap<String, DataType> = [
            ("year".to_string(), DataType::Int64),
            ("day".to_string(), DataType::Int64),
        ]
        .into_iter()
        .collect();
        let ranges: HashMap<String, (f64, f64)> = [
            ("year".to_string(), (1900.0, 2100.0)),
            ("day".to_string(), (1.0, 31.0)),
            ("month".to_string(), (1.0, 12.0)),
        ]
        .into_iter()
        .collect();

        let report = QualityChecker::new()
            .validate_types_and_ranges(&sets, &types, &ranges)
            .unwrap();

        let status = |col: &str, kind| report.find("bbc", col, kind).map(|e| e.status);
        assert_eq!(status("year", CheckKind::DataType), Some(CheckStatus::Pass));
        assert_eq!(status("year", CheckKind::ValueRange), Some(CheckStatus::Fail));
        assert_eq!(status("day", CheckKind::DataType), Some(CheckStatus::Fail));
        assert_eq!(status("day", CheckKind::ValueRange), Some(CheckStatus::Pass));
        // Non-numeric column with a range is skipped
        assert_eq!(status("month", CheckKind::ValueRange), None);
        assert_eq!(report.failures().count(), 2);
    }
}
