//! Transform stage: run the quality engine over the staged rows.

use polars::prelude::DataType;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info, warn};

use crate::error::{EtlError, Result};
use crate::ingestion::{read_parquet, write_parquet, DEFAULT_DATASET};
use crate::quality::{NullHandlingSummary, QualityChecker, QualityRepairer};
use crate::rowset::{Datasets, RowSet};

/// Null percentage above which the transform drops a column.
pub const TRANSFORM_DROP_THRESHOLD: f64 = 25.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformSummary {
    pub rows_in: usize,
    pub duplicates_reported: usize,
    pub duplicates_removed: usize,
    pub null_columns: usize,
    pub nulls: NullHandlingSummary,
    pub validation_failures: usize,
    pub rows_out: usize,
}

#[derive(Debug, Clone)]
pub struct Transformer {
    drop_threshold: f64,
    expected_types: HashMap<String, DataType>,
    value_ranges: HashMap<String, (f64, f64)>,
    checker: QualityChecker,
    repairer: QualityRepairer,
}

impl Default for Transformer {
    fn default() -> Self {
        let expected_types = ["year", "day", "month"]
            .into_iter()
            .map(|c| (c.to_string(), DataType::Int64))
            .collect();
        let value_ranges = HashMap::from([
            ("year".to_string(), (1900.0, 2100.0)),
            ("day".to_string(), (1.0, 31.0)),
            ("month".to_string(), (1.0, 12.0)),
        ]);

        Self {
            drop_threshold: TRANSFORM_DROP_THRESHOLD,
            expected_types,
            value_ranges,
            checker: QualityChecker::new(),
            repairer: QualityRepairer::new(),
        }
    }
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drop_threshold(mut self, threshold: f64) -> Self {
        self.drop_threshold = threshold;
        self
    }

    pub fn with_expectations(
        mut self,
        expected_types: HashMap<String, DataType>,
        value_ranges: HashMap<String, (f64, f64)>,
    ) -> Self {
        self.expected_types = expected_types;
        self.value_ranges = value_ranges;
        self
    }

    pub fn with_repairer(mut self, repairer: QualityRepairer) -> Self {
        self.repairer = repairer;
        self
    }

    /// Deduplicate, repair nulls and validate one RowSet.
    pub fn transform(&self, set: RowSet) -> Result<(RowSet, TransformSummary)> {
        let name = set.name().to_string();
        let mut summary = TransformSummary {
            rows_in: set.height(),
            ..Default::default()
        };
        let mut datasets = Datasets::from(set);

        self.run_checks(&mut datasets, &mut summary).map_err(|e| {
            error!("Transform of dataset '{}' failed: {}", name, e);
            as_transform_error(e)
        })?;

        let set = datasets
            .remove(&name)
            .ok_or_else(|| EtlError::Transform(format!("Dataset '{}' vanished during transform", name)))?;
        summary.rows_out = set.height();

        info!(
            "Transformed dataset '{}': {} rows in, {} rows out, {} columns dropped, {} imputed",
            name,
            summary.rows_in,
            summary.rows_out,
            summary.nulls.dropped.len(),
            summary.nulls.imputed.len()
        );
        Ok((set, summary))
    }

    /// Read `staging_path`, transform it and write the result to `output_path`.
    pub fn run(&self, staging_path: &Path, output_path: &Path) -> Result<(RowSet, TransformSummary)> {
        let frame = read_parquet(staging_path).map_err(as_transform_error)?;
        let (mut set, summary) = self.transform(RowSet::new(DEFAULT_DATASET, frame))?;
        write_parquet(set.frame_mut(), output_path).map_err(as_transform_error)?;
        info!("Transformed data written to {}", output_path.display());
        Ok((set, summary))
    }

    fn run_checks(&self, datasets: &mut Datasets, summary: &mut TransformSummary) -> Result<()> {
        let duplicates = self.checker.check_duplicates(datasets)?;
        summary.duplicates_reported = duplicates.len();
        summary.duplicates_removed = self.repairer.remove_duplicates(datasets, &duplicates)?;

        let nulls = self.checker.check_nulls(datasets)?;
        summary.null_columns = nulls.len();
        for entry in &nulls.entries {
            info!(
                "Column '{}' ({}) of '{}': {} nulls ({:.2}%)",
                entry.column, entry.dtype, entry.dataset, entry.null_count, entry.null_percentage
            );
        }
        summary.nulls = self
            .repairer
            .handle_nulls(datasets, &nulls, self.drop_threshold)?;

        let validation =
            self.checker
                .validate_types_and_ranges(datasets, &self.expected_types, &self.value_ranges)?;
        summary.validation_failures = validation.failures().count();
        if validation.is_empty() {
            info!("No columns matched the validation expectations");
        } else if summary.validation_failures > 0 {
            warn!("Validation found {} failing checks:\n{}", summary.validation_failures, validation);
        } else {
            info!("Validation passed:\n{}", validation);
        }

        Ok(())
    }
}

fn as_transform_error(e: EtlError) -> EtlError {
    match e {
        EtlError::Imputation(_) | EtlError::Transform(_) => e,
        other => EtlError::Transform(other.to_string()),
    }
}
