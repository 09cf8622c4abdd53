//! Fact linkage: resolve surrogate keys and insert `fact_news` rows.

use serde::Serialize;
use tracing::{error, info, warn};

use super::{in_unit, Boundary, CommitMode};
use crate::db::{FactRow, NamedDimension, Warehouse};
use crate::error::Result;
use crate::record::NewsRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FactLoadSummary {
    pub rows_seen: usize,
    pub rows_without_date: usize,
    /// Rows dropped because a category, source category, date or article key was missing.
    pub rows_unresolved: usize,
    pub tags_unresolved: usize,
    pub facts_inserted: usize,
    /// Fact inserts that hit an existing 5-key tuple.
    pub facts_existing: usize,
}

/// Keys shared by every fact row of one source row.
#[derive(Debug, Clone, Copy)]
struct RowKeys {
    news_id: i64,
    date_id: i64,
    category_id: i64,
    source_category_id: i64,
}

pub struct FactLoader<'a, W: Warehouse + ?Sized> {
    warehouse: &'a mut W,
    mode: CommitMode,
}

impl<'a, W: Warehouse + ?Sized> FactLoader<'a, W> {
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

    /// Insert one fact per (article, date, category, source category, tag).
    ///
    /// A row whose category, source category, date or article cannot be
    /// resolved is skipped whole; an unresolved tag skips only that tag.
    /// Existing facts are left untouched.
    pub fn load_facts(&mut self, records: &[NewsRecord]) -> Result<FactLoadSummary> {
        let mode = self.mode;
        let mut summary = FactLoadSummary::default();

        let outcome = in_unit(&mut *self.warehouse, mode, Boundary::Batch, |w| {
            for record in records {
                summary.rows_seen += 1;
                if record.updated.is_none() {
                    warn!("Row without date skipped for fact_news");
                    summary.rows_without_date += 1;
                    continue;
                }
                in_unit(w, mode, Boundary::Row, |w| load_row(w, mode, record, &mut summary))?;
            }
            Ok(())
        });

        if let Err(e) = outcome {
            error!("Failed to load fact data: {}", e);
            return Err(e);
        }

        info!(
            "Fact data loaded: {} inserted, {} already present, {} rows unresolved, {} tags unresolved",
            summary.facts_inserted,
            summary.facts_existing,
            summary.rows_unresolved,
            summary.tags_unresolved
        );
        Ok(summary)
    }
}

fn load_row<W: Warehouse + ?Sized>(
    w: &mut W,
    mode: CommitMode,
    record: &NewsRecord,
    summary: &mut FactLoadSummary,
) -> Result<()> {
    let Some(keys) = resolve_row(w, record)? else {
        summary.rows_unresolved += 1;
        return Ok(());
    };

    for tag in record.tag_list() {
        let Some(tag_id) = w.named_key(NamedDimension::Tag, &tag)? else {
            warn!("Tag '{}' not found, skipped", tag);
            summary.tags_unresolved += 1;
            continue;
        };

        let fact = FactRow {
            news_id: keys.news_id,
            date_id: keys.date_id,
            category_id: keys.category_id,
            source_category_id: keys.source_category_id,
            tag_id,
            is_live: record.is_live(),
            in_pagination: record.in_pagination(),
        };
        if in_unit(w, mode, Boundary::Statement, |w| w.insert_fact(&fact))? {
            summary.facts_inserted += 1;
        } else {
            summary.facts_existing += 1;
        }
    }

    Ok(())
}

fn resolve_row<W: Warehouse + ?Sized>(w: &mut W, record: &NewsRecord) -> Result<Option<RowKeys>> {
    let category = record.category.as_deref();
    let Some(category_id) = lookup_named(w, NamedDimension::Category, category)? else {
        warn!("Category '{}' not found, row skipped", category.unwrap_or("<null>"));
        return Ok(None);
    };

    let source_category = record.source_category.as_deref();
    let Some(source_category_id) = lookup_named(w, NamedDimension::SourceCategory, source_category)? else {
        warn!(
            "Source category '{}' not found, row skipped",
            source_category.unwrap_or("<null>")
        );
        return Ok(None);
    };

    let date_id = match record.updated {
        Some(date) => w.date_key(date)?,
        None => None,
    };
    let Some(date_id) = date_id else {
        warn!("Date '{:?}' not found in dim_date, row skipped", record.updated);
        return Ok(None);
    };

    let url = record.url.as_deref();
    let news_id = match url {
        Some(url) => w.article_key(url)?,
        None => None,
    };
    let Some(news_id) = news_id else {
        warn!("Article URL '{}' not found, row skipped", url.unwrap_or("<null>"));
        return Ok(None);
    };

    Ok(Some(RowKeys {
        news_id,
        date_id,
        category_id,
        source_category_id,
    }))
}

fn lookup_named<W: Warehouse + ?Sized>(
    w: &mut W,
    dim: NamedDimension,
    name: Option<&str>,
) -> Result<Option<i64>> {
    match name {
        Some(name) => w.named_key(dim, name),
        None => Ok(None),
    }
}
