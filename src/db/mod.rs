//! Warehouse access
//!
//! The load engine talks to the star schema through the [`Warehouse`] trait.
//! Every method blocks. Inserts are insert-if-absent on the natural key and
//! fact inserts do nothing on conflict, so repeated calls converge.

pub mod connection;
pub mod postgres;
pub mod sqlite;

pub use connection::connect;
pub use postgres::PgWarehouse;
pub use sqlite::SqliteWarehouse;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::Result;

/// Dimensions keyed by a plain `name` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NamedDimension {
    Category,
    SourceCategory,
    Tag,
}

impl NamedDimension {
    pub fn table(&self) -> &'static str {
        match self {
            NamedDimension::Category => "dim_category",
            NamedDimension::SourceCategory => "dim_source_category",
            NamedDimension::Tag => "dim_tag",
        }
    }

    pub fn key_column(&self) -> &'static str {
        match self {
            NamedDimension::Category => "category_id",
            NamedDimension::SourceCategory => "source_category_id",
            NamedDimension::Tag => "tag_id",
        }
    }
}

/// A calendar day split into the columns of `dim_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub date: NaiveDate,
    pub day: i32,
    pub month: i32,
    pub year: i32,
}

impl From<NaiveDate> for DateParts {
    fn from(date: NaiveDate) -> Self {
        Self {
            date,
            day: date.day() as i32,
            month: date.month() as i32,
            year: date.year(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDim {
    pub title: String,
    pub description: String,
    pub url: String,
}

/// One row of `fact_news`. The first five fields form the unique key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactRow {
    pub news_id: i64,
    pub date_id: i64,
    pub category_id: i64,
    pub source_category_id: i64,
    pub tag_id: i64,
    pub is_live: bool,
    pub in_pagination: bool,
}

/// Blocking handle on the star-schema warehouse.
///
/// Insert methods return `true` when a row was written and `false` when the
/// natural key (or the fact's 5-key tuple) already existed.
pub trait Warehouse {
    /// Backend name for logs.
    fn backend(&self) -> &'static str;

    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    fn insert_date(&mut self, date: NaiveDate) -> Result<bool>;
    fn insert_named(&mut self, dim: NamedDimension, name: &str) -> Result<bool>;
    fn insert_article(&mut self, article: &ArticleDim) -> Result<bool>;

    fn date_key(&mut self, date: NaiveDate) -> Result<Option<i64>>;
    fn named_key(&mut self, dim: NamedDimension, name: &str) -> Result<Option<i64>>;
    fn article_key(&mut self, url: &str) -> Result<Option<i64>>;

    fn insert_fact(&mut self, fact: &FactRow) -> Result<bool>;

    /// Release the connection. Calls after `close` fail with a connection error.
    fn close(&mut self) -> Result<()>;
}
