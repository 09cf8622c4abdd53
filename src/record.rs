//! Typed news records, built once from a cleaned frame before loading.

use chrono::NaiveDate;
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::temporal;

/// Value of `live` that marks an article as live.
pub const LIVE_MARKER: &str = "Yes";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewsRecord {
    pub updated: Option<NaiveDate>,
    pub category: Option<String>,
    pub source_category: Option<String>,
    pub tags: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub live: Option<String>,
    pub in_pagination: Option<bool>,
}

impl NewsRecord {
    /// Distinct, trimmed, non-empty tags in first-seen order.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags.as_deref().map(parse_tags).unwrap_or_default()
    }

    pub fn is_live(&self) -> bool {
        self.live.as_deref() == Some(LIVE_MARKER)
    }

    pub fn in_pagination(&self) -> bool {
        self.in_pagination.unwrap_or(false)
    }

    /// Convert every row of a frame. Missing columns yield `None` fields.
    pub fn from_frame(frame: &DataFrame) -> Result<Vec<NewsRecord>> {
        let height = frame.height();
        let updated = date_column(frame, "updated")?;
        let category = text_column(frame, "category")?;
        let source_category = text_column(frame, "source_category")?;
        let tags = text_column(frame, "tags")?;
        let title = text_column(frame, "title")?;
        let description = text_column(frame, "description")?;
        let url = text_column(frame, "url")?;
        let live = text_column(frame, "live")?;
        let in_pagination = bool_column(frame, "in_pagination")?;

        Ok((0..height)
            .map(|i| NewsRecord {
                updated: updated[i],
                category: category[i].clone(),
                source_category: source_category[i].clone(),
                tags: tags[i].clone(),
                title: title[i].clone(),
                description: description[i].clone(),
                url: url[i].clone(),
                live: live[i].clone(),
                in_pagination: in_pagination[i],
            })
            .collect())
    }
}

/// Split a comma-separated tag field.
pub fn parse_tags(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unique()
        .map(str::to_string)
        .collect()
}

fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame.get_column_names().iter().any(|c| *c == name)
}

fn text_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if !has_column(frame, name) {
        return Ok(vec![None; frame.height()]);
    }
    let text = frame.column(name)?.cast(&DataType::String)?;
    let values = text
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
        .collect();
    Ok(values)
}

fn bool_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<bool>>> {
    if !has_column(frame, name) {
        return Ok(vec![None; frame.height()]);
    }
    let series = frame.column(name)?;
    if matches!(series.dtype(), DataType::Boolean) {
        return Ok(series.bool()?.into_iter().collect());
    }
    Ok(text_column(frame, name)?
        .into_iter()
        .map(|v| {
            v.and_then(|s| match s.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            })
        })
        .collect())
}

fn date_column(frame: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>> {
    if !has_column(frame, name) {
        return Ok(vec![None; frame.height()]);
    }
    let series = frame.column(name)?;
    if temporal::is_temporal(series.dtype()) {
        return Ok(temporal::epoch_millis(series)?
            .into_iter()
            .map(|v| v.and_then(temporal::date_from_millis))
            .collect());
    }

    Ok(text_column(frame, name)?
        .into_iter()
        .map(|v| {
            v.and_then(|raw| {
                let parsed = temporal::parse_day_first(&raw).map(|dt| dt.date());
                if parsed.is_none() {
                    warn!("Unparseable '{}' value '{}', treating as missing", name, raw);
                }
                parsed
            })
        })
        .collect())
}
