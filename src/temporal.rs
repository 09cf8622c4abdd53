//! Date handling shared by the quality engine and the record boundary.
//!
//! Source dates are day-first (`DD-MM-YYYY`). When the strict format fails a
//! list of looser layouts is tried before the value is declared unparseable.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use polars::prelude::*;

use crate::error::Result;

const STRICT_DATE_FORMAT: &str = "%d-%m-%Y";

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// The datetime type every coerced column ends up with.
pub fn temporal_dtype() -> DataType {
    DataType::Datetime(TimeUnit::Milliseconds, None)
}

pub fn is_temporal(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _) | DataType::Date)
}

/// Columns named like `*date*` or `*timestamp*` are treated as temporal.
pub fn is_temporal_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("date") || lower.contains("timestamp")
}

/// Parse a day-first date string, falling back to permissive layouts.
pub fn parse_day_first(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, STRICT_DATE_FORMAT) {
        return date.and_hms_opt(0, 0, 0);
    }

    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    // Feed timestamps such as "Mon, 07 Mar 2022 08:01:56 GMT"
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    None
}

/// Coerce a column to millisecond datetimes. Values that fail to parse become null.
pub fn coerce_to_datetime(series: &Series) -> Result<Series> {
    let dtype = series.dtype();
    if is_temporal(dtype) {
        return Ok(series.cast(&temporal_dtype())?);
    }

    let as_text = series.cast(&DataType::String)?;
    let millis: Vec<Option<i64>> = as_text
        .str()?
        .into_iter()
        .map(|value| value.and_then(parse_day_first).map(|dt| dt.and_utc().timestamp_millis()))
        .collect();

    Ok(Series::new(series.name(), millis).cast(&temporal_dtype())?)
}

/// Millisecond timestamps of a temporal column, nulls preserved.
pub fn epoch_millis(series: &Series) -> Result<Vec<Option<i64>>> {
    let physical = series.cast(&temporal_dtype())?.cast(&DataType::Int64)?;
    Ok(physical.i64()?.into_iter().collect())
}

pub fn date_from_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}
