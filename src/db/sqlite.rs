//! SQLite warehouse backend
//!
//! Used for local runs and tests. Dates are stored as `YYYY-MM-DD` text.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

use super::{ArticleDim, DateParts, FactRow, NamedDimension, Warehouse};
use crate::error::{EtlError, Result};

pub struct SqliteWarehouse {
    conn: Option<Connection>,
}

impl SqliteWarehouse {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            EtlError::Connection(format!("Failed to open SQLite warehouse {}: {}", path.display(), e))
        })?;
        debug!("Opened SQLite warehouse at {}", path.display());
        Ok(Self { conn: Some(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EtlError::Connection(format!("Failed to open in-memory SQLite: {}", e)))?;
        Ok(Self { conn: Some(conn) })
    }

    /// Borrow the raw connection, e.g. to run DDL or inspect tables.
    pub fn connection(&self) -> Result<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| EtlError::Connection("SQLite warehouse is closed".to_string()))
    }

    fn execute_control(&self, sql: &str) -> Result<()> {
        self.connection()?
            .execute_batch(sql)
            .map_err(|e| EtlError::Load(format!("Failed to run {}: {}", sql, e)))
    }
}

fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl Warehouse for SqliteWarehouse {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn begin(&mut self) -> Result<()> {
        self.execute_control("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute_control("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute_control("ROLLBACK")
    }

    fn insert_date(&mut self, date: NaiveDate) -> Result<bool> {
        let parts = DateParts::from(date);
        let changed = self
            .connection()?
            .execute(
                "INSERT INTO dim_date (date, day, month, year)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE NOT EXISTS (SELECT 1 FROM dim_date WHERE date = ?1)",
                params![date_text(parts.date), parts.day, parts.month, parts.year],
            )
            .map_err(|e| EtlError::Load(format!("Failed to insert date {}: {}", date, e)))?;
        Ok(changed > 0)
    }

    fn insert_named(&mut self, dim: NamedDimension, name: &str) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {table} (name) SELECT ?1 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE name = ?1)",
            table = dim.table()
        );
        let changed = self
            .connection()?
            .execute(&sql, params![name])
            .map_err(|e| EtlError::Load(format!("Failed to insert into {}: {}", dim.table(), e)))?;
        Ok(changed > 0)
    }

    fn insert_article(&mut self, article: &ArticleDim) -> Result<bool> {
        let changed = self
            .connection()?
            .execute(
                "INSERT INTO dim_article (title, description, url)
                 SELECT ?1, ?2, ?3
                 WHERE NOT EXISTS (SELECT 1 FROM dim_article WHERE url = ?3)",
                params![article.title, article.description, article.url],
            )
            .map_err(|e| EtlError::Load(format!("Failed to insert article {}: {}", article.url, e)))?;
        Ok(changed > 0)
    }

    fn date_key(&mut self, date: NaiveDate) -> Result<Option<i64>> {
        self.connection()?
            .query_row(
                "SELECT date_id FROM dim_date WHERE date = ?1",
                params![date_text(date)],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| EtlError::Load(format!("Failed to look up date {}: {}", date, e)))
    }

    fn named_key(&mut self, dim: NamedDimension, name: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT {key} FROM {table} WHERE name = ?1",
            key = dim.key_column(),
            table = dim.table()
        );
        self.connection()?
            .query_row(&sql, params![name], |row| row.get(0))
            .optional()
            .map_err(|e| EtlError::Load(format!("Failed to look up {} in {}: {}", name, dim.table(), e)))
    }

    fn article_key(&mut self, url: &str) -> Result<Option<i64>> {
        self.connection()?
            .query_row(
                "SELECT news_id FROM dim_article WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| EtlError::Load(format!("Failed to look up article {}: {}", url, e)))
    }

    fn insert_fact(&mut self, fact: &FactRow) -> Result<bool> {
        let changed = self
            .connection()?
            .execute(
                "INSERT INTO fact_news (
                    news_id, date_id, category_id, source_category_id, tag_id, is_live, in_pagination
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (news_id, date_id, category_id, source_category_id, tag_id) DO NOTHING",
                params![
                    fact.news_id,
                    fact.date_id,
                    fact.category_id,
                    fact.source_category_id,
                    fact.tag_id,
                    fact.is_live,
                    fact.in_pagination
                ],
            )
            .map_err(|e| EtlError::Load(format!("Failed to insert fact for news_id {}: {}", fact.news_id, e)))?;
        Ok(changed > 0)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| EtlError::Connection(format!("Failed to close SQLite warehouse: {}", e)))?;
            debug!("Closed SQLite warehouse");
        }
        Ok(())
    }
}
