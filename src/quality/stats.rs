//! Column statistics used to pick and compute imputation values.

use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Result;

/// Bias-corrected sample skewness of the non-null values.
///
/// `None` when fewer than three values are available. A constant sample has
/// skewness 0.
pub fn skewness(series: &Series) -> Result<Option<f64>> {
    let present = series.drop_nulls().cast(&DataType::Float64)?;
    if present.len() < 3 {
        return Ok(None);
    }
    // 0/0 for a constant sample
    Ok(present.skew(false)?.map(|s| if s.is_nan() { 0.0 } else { s }))
}

/// Most frequent value; ties go to the smallest value.
pub fn mode<T>(values: impl IntoIterator<Item = T>) -> Option<T>
where
    T: Eq + Hash + Ord + Clone,
{
    let mut counts: HashMap<T, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .map(|(v, _)| v)
}

/// Numeric mode over `f64`, keyed by bit pattern.
pub fn mode_f64(values: &[f64]) -> Option<f64> {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for v in values {
        let key = if *v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        counts.entry(key).or_insert((*v, 0)).1 += 1;
    }
    counts
        .into_values()
        .max_by(|(va, ca), (vb, cb)| {
            ca.cmp(cb)
                .then_with(|| vb.partial_cmp(va).unwrap_or(Ordering::Equal))
        })
        .map(|(v, _)| v)
}

/// Linear interpolation over the row index, as `Float64`.
///
/// Interior gaps are filled on the line between their neighbours. Leading
/// gaps take the first known value and trailing gaps the last one, so the
/// result has no nulls unless every value is null.
pub fn interpolate_linear(series: &Series) -> Result<Series> {
    let name = series.name();
    let values = series.cast(&DataType::Float64)?;
    let line = DataFrame::new(vec![values])?
        .lazy()
        .select([col(name).interpolate(InterpolationMethod::Linear)])
        .collect()?;

    Ok(line
        .column(name)?
        .fill_null(FillNullStrategy::Forward(None))?
        .fill_null(FillNullStrategy::Backward(None))?)
}
