//! Insert-if-absent loading of the date, category, source-category, tag and
//! article dimensions.

use serde::Serialize;
use tracing::{error, info, warn};

use super::{in_unit, Boundary, CommitMode};
use crate::db::{ArticleDim, NamedDimension, Warehouse};
use crate::error::Result;
use crate::record::NewsRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimensionLoadSummary {
    pub rows_seen: usize,
    pub rows_without_date: usize,
    pub dates_inserted: usize,
    pub categories_inserted: usize,
    pub source_categories_inserted: usize,
    pub tags_inserted: usize,
    pub articles_inserted: usize,
    /// Missing optional fields that were skipped.
    pub soft_issues: usize,
}

impl DimensionLoadSummary {
    pub fn total_inserted(&self) -> usize {
        self.dates_inserted
            + self.categories_inserted
            + self.source_categories_inserted
            + self.tags_inserted
            + self.articles_inserted
    }
}

pub struct DimensionLoader<'a, W: Warehouse + ?Sized> {
    warehouse: &'a mut W,
    mode: CommitMode,
}

impl<'a, W: Warehouse + ?Sized> DimensionLoader<'a, W> {
    pub fn new(warehouse: &'a mut W) -> Self {
        Self {
            warehouse,
            mode: CommitMode::default(),
        }
    }

    pub fn with_commit_mode(mut self, mode: CommitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Load every dimension entity referenced by `records`.
    ///
    /// Rows without an `updated` date are skipped. Any database error stops
    /// the load and is returned; missing optional fields only log.
    pub fn load_dimensions(&mut self, records: &[NewsRecord]) -> Result<DimensionLoadSummary> {
        let mode = self.mode;
        let mut summary = DimensionLoadSummary::default();

        let outcome = in_unit(&mut *self.warehouse, mode, Boundary::Batch, |w| {
            for (idx, record) in records.iter().enumerate() {
                summary.rows_seen += 1;
                if record.updated.is_none() {
                    summary.rows_without_date += 1;
                    continue;
                }
                in_unit(w, mode, Boundary::Row, |w| load_row(w, mode, idx, record, &mut summary))?;
            }
            Ok(())
        });

        if let Err(e) = outcome {
            error!("Failed to load dimension data: {}", e);
            return Err(e);
        }

        info!(
            "Dimension data loaded: {} new rows from {} records ({} without date, {} soft issues)",
            summary.total_inserted(),
            summary.rows_seen,
            summary.rows_without_date,
            summary.soft_issues
        );
        Ok(summary)
    }
}

fn load_row<W: Warehouse + ?Sized>(
    w: &mut W,
    mode: CommitMode,
    idx: usize,
    record: &NewsRecord,
    summary: &mut DimensionLoadSummary,
) -> Result<()> {
    if let Some(date) = record.updated {
        if statement(w, mode, |w| w.insert_date(date))? {
            summary.dates_inserted += 1;
        }
    }

    match record.category.as_deref() {
        Some(name) => {
            if statement(w, mode, |w| w.insert_named(NamedDimension::Category, name))? {
                summary.categories_inserted += 1;
            }
        }
        None => {
            warn!("Row {} has no category, dim_category skipped", idx);
            summary.soft_issues += 1;
        }
    }

    match record.source_category.as_deref() {
        Some(name) => {
            if statement(w, mode, |w| w.insert_named(NamedDimension::SourceCategory, name))? {
                summary.source_categories_inserted += 1;
            }
        }
        None => {
            warn!("Row {} has no source_category, dim_source_category skipped", idx);
            summary.soft_issues += 1;
        }
    }

    for tag in record.tag_list() {
        if statement(w, mode, |w| w.insert_named(NamedDimension::Tag, &tag))? {
            summary.tags_inserted += 1;
        }
    }

    match (&record.title, &record.description, &record.url) {
        (Some(title), Some(description), Some(url)) => {
            let article = ArticleDim {
                title: title.clone(),
                description: description.clone(),
                url: url.clone(),
            };
            if statement(w, mode, |w| w.insert_article(&article))? {
                summary.articles_inserted += 1;
            }
        }
        _ => {
            warn!("Row {} lacks title, description or url, dim_article skipped", idx);
            summary.soft_issues += 1;
        }
    }

    Ok(())
}

fn statement<W, F>(w: &mut W, mode: CommitMode, f: F) -> Result<bool>
where
    W: Warehouse + ?Sized,
    F: FnOnce(&mut W) -> Result<bool>,
{
    in_unit(w, mode, Boundary::Statement, f)
}
