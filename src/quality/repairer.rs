//! Write-side of the quality engine: deduplication, column drops and imputation.

use polars::prelude::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

use super::report::{DuplicateReport, NullReport};
use super::stats;
use crate::error::{EtlError, Result};
use crate::rowset::{Datasets, RowSet};
use crate::temporal;

/// Columns with a larger share of nulls are dropped instead of imputed.
pub const DEFAULT_DROP_THRESHOLD: f64 = 20.0;

pub const DEFAULT_DEDUP_KEY: &str = "url";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImputeMethod {
    Mean,
    Median,
    Mode,
    Interpolate,
}

impl FromStr for ImputeMethod {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(ImputeMethod::Mean),
            "median" => Ok(ImputeMethod::Median),
            "mode" => Ok(ImputeMethod::Mode),
            "interpolate" => Ok(ImputeMethod::Interpolate),
            other => Err(EtlError::Imputation(other.to_string())),
        }
    }
}

impl fmt::Display for ImputeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImputeMethod::Mean => "mean",
            ImputeMethod::Median => "median",
            ImputeMethod::Mode => "mode",
            ImputeMethod::Interpolate => "interpolate",
        };
        f.write_str(name)
    }
}

/// What `handle_nulls` did to each reported column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NullHandlingSummary {
    pub dropped: Vec<(String, String)>,
    pub imputed: Vec<(String, String, ImputeMethod)>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct QualityRepairer {
    dedup_key: String,
}

impl Default for QualityRepairer {
    fn default() -> Self {
        Self {
            dedup_key: DEFAULT_DEDUP_KEY.to_string(),
        }
    }
}

impl QualityRepairer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dedup_key(mut self, key: impl Into<String>) -> Self {
        self.dedup_key = key.into();
        self
    }

    /// Drop rows repeating an earlier natural key, keeping the first.
    ///
    /// Every dataset named by the report is deduplicated, and so is any other
    /// dataset whose key column repeats a value: the key decides what counts
    /// as a duplicate row, the report only flags full-row repeats. Returns the
    /// number of rows removed.
    pub fn remove_duplicates(
        &self,
        datasets: &mut Datasets,
        report: &DuplicateReport,
    ) -> Result<usize> {
        let reported = report.datasets();
        for name in &reported {
            if datasets.get(name).is_none() {
                error!("Dataset '{}' not found, cannot remove duplicates", name);
            }
        }

        let mut removed = 0;
        for set in datasets.iter_mut() {
            let flagged = reported.contains(set.name());
            if !set.has_column(&self.dedup_key) {
                if flagged {
                    error!(
                        "Dataset '{}' has no '{}' column, duplicates left in place",
                        set.name(),
                        self.dedup_key
                    );
                }
                continue;
            }

            let key = set.frame().column(&self.dedup_key)?;
            let repeats_key = key.n_unique()? < key.len();
            if !flagged && !repeats_key {
                continue;
            }
            if !flagged {
                info!(
                    "Dataset '{}' repeats '{}' values in otherwise distinct rows",
                    set.name(),
                    self.dedup_key
                );
            }

            info!("Removing duplicates from dataset '{}'", set.name());
            let before = set.height();
            let deduped = set.frame().unique_stable(
                Some(&[self.dedup_key.clone()]),
                UniqueKeepStrategy::First,
                None,
            )?;
            set.replace_frame(deduped);
            removed += before - set.height();
        }

        if removed == 0 {
            info!("No duplicates to handle");
        }
        Ok(removed)
    }

    /// Fill the nulls of one column in place.
    pub fn impute_column(&self, set: &mut RowSet, column: &str, method: ImputeMethod) -> Result<()> {
        let series = set.frame().column(column)?;
        let dtype = series.dtype().clone();

        let filled = match method {
            ImputeMethod::Mean | ImputeMethod::Median => {
                if !dtype.is_numeric() {
                    return Err(EtlError::Transform(format!(
                        "Cannot use {} on non-numeric column '{}' ({})",
                        method, column, dtype
                    )));
                }
                let stat = if method == ImputeMethod::Mean {
                    series.mean()
                } else {
                    series.median()
                };
                stat.map(|v| numeric_literal(v, &dtype))
            }
            ImputeMethod::Mode => mode_literal(series)?,
            ImputeMethod::Interpolate => {
                let interpolated = interpolate(series)?;
                set.frame_mut().with_column(interpolated)?;
                info!(
                    "Imputed column '{}' of dataset '{}' using '{}'",
                    column,
                    set.name(),
                    method
                );
                return Ok(());
            }
        };

        let Some(fill) = filled else {
            warn!("Column '{}' has no values to compute a {} from", column, method);
            return Ok(());
        };

        let frame = set
            .frame()
            .clone()
            .lazy()
            .with_column(col(column).fill_null(fill).cast(dtype))
            .collect()?;
        set.replace_frame(frame);
        info!(
            "Imputed column '{}' of dataset '{}' using '{}'",
            column,
            set.name(),
            method
        );
        Ok(())
    }

    /// [`handle_nulls`](Self::handle_nulls) with [`DEFAULT_DROP_THRESHOLD`].
    pub fn handle_nulls_default(
        &self,
        datasets: &mut Datasets,
        report: &NullReport,
    ) -> Result<NullHandlingSummary> {
        self.handle_nulls(datasets, report, DEFAULT_DROP_THRESHOLD)
    }

    /// Drop or impute every column named by the report.
    ///
    /// A column above `drop_threshold` percent nulls is removed. Otherwise the
    /// method follows the column type: numeric uses median when skewed and mean
    /// when not, temporal interpolates, anything else takes the mode. Unknown
    /// datasets and columns are logged and skipped.
    pub fn handle_nulls(
        &self,
        datasets: &mut Datasets,
        report: &NullReport,
        drop_threshold: f64,
    ) -> Result<NullHandlingSummary> {
        let mut summary = NullHandlingSummary::default();

        for entry in &report.entries {
            let Some(set) = datasets.get_mut(&entry.dataset) else {
                error!("Dataset '{}' not found", entry.dataset);
                summary.skipped += 1;
                continue;
            };

            if !set.has_column(&entry.column) {
                error!(
                    "Column '{}' not found in dataset '{}', moving on",
                    entry.column, entry.dataset
                );
                summary.skipped += 1;
                continue;
            }

            if entry.null_percentage > drop_threshold {
                set.frame_mut().drop_in_place(&entry.column)?;
                info!(
                    "Dropped column '{}' from dataset '{}': {:.2}% nulls exceeds {}%",
                    entry.column, entry.dataset, entry.null_percentage, drop_threshold
                );
                summary
                    .dropped
                    .push((entry.dataset.clone(), entry.column.clone()));
                continue;
            }

            let method = select_method(set.frame().column(&entry.column)?)?;
            self.impute_column(set, &entry.column, method)?;
            summary
                .imputed
                .push((entry.dataset.clone(), entry.column.clone(), method));
        }

        Ok(summary)
    }
}

/// Pick the imputation method a column's type calls for.
pub fn select_method(series: &Series) -> Result<ImputeMethod> {
    let dtype = series.dtype();
    if temporal::is_temporal(dtype) {
        return Ok(ImputeMethod::Interpolate);
    }
    if dtype.is_numeric() {
        let skew = stats::skewness(series)?;
        debug!("Skewness of '{}': {:?}", series.name(), skew);
        return Ok(match skew {
            Some(s) if s == 0.0 => ImputeMethod::Mean,
            _ => ImputeMethod::Median,
        });
    }
    Ok(ImputeMethod::Mode)
}

/// Integer columns take the value rounded.
fn numeric_literal(value: f64, dtype: &DataType) -> Expr {
    if dtype.is_integer() {
        lit(value.round() as i64)
    } else {
        lit(value)
    }
}

fn mode_literal(series: &Series) -> Result<Option<Expr>> {
    let dtype = series.dtype();

    if temporal::is_temporal(dtype) {
        let millis = temporal::epoch_millis(series)?;
        return Ok(stats::mode(millis.into_iter().flatten())
            .map(|ms| lit(ms).cast(temporal::temporal_dtype())));
    }

    if dtype.is_numeric() {
        let present: Vec<f64> = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .flatten()
            .collect();
        return Ok(stats::mode_f64(&present).map(|v| numeric_literal(v, dtype)));
    }

    if matches!(dtype, DataType::Boolean) {
        return Ok(stats::mode(series.bool()?.into_iter().flatten()).map(lit));
    }

    let text = series.cast(&DataType::String)?;
    Ok(stats::mode(text.str()?.into_iter().flatten()).map(|v| lit(v.to_string())))
}

/// Linear interpolation that keeps the column's type. Integer columns get
/// the interpolated values rounded; datetimes are floored to whole seconds.
fn interpolate(series: &Series) -> Result<Series> {
    let name = series.name();
    let dtype = series.dtype();

    if temporal::is_temporal(dtype) {
        let millis: Vec<Option<i64>> = temporal::epoch_millis(series)?;
        let line = stats::interpolate_linear(&Series::new(name, millis))?;
        let floored: Vec<Option<i64>> = line
            .f64()?
            .into_iter()
            .map(|v| v.map(|ms| (ms.floor() as i64).div_euclid(1000) * 1000))
            .collect();
        return Ok(Series::new(name, floored).cast(&temporal::temporal_dtype())?);
    }

    if dtype.is_numeric() {
        let line = stats::interpolate_linear(series)?;
        if dtype.is_integer() {
            let rounded: Vec<Option<f64>> = line.f64()?.into_iter().map(|v| v.map(f64::round)).collect();
            return Ok(Series::new(name, rounded).cast(dtype)?);
        }
        return Ok(line.cast(dtype)?);
    }

    Err(EtlError::Transform(format!(
        "Cannot interpolate column '{}' of type {}",
        name, dtype
    )))
}
