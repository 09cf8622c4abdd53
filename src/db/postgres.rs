//! PostgreSQL warehouse backend using sqlx
//!
//! The loaders are synchronous, so a single `PgConnection` is driven by a
//! private current-thread runtime and every call blocks until the statement
//! finishes.

use chrono::NaiveDate;
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::{ArticleDim, DateParts, FactRow, NamedDimension, Warehouse};
use crate::error::{EtlError, Result};

pub struct PgWarehouse {
    runtime: Runtime,
    conn: Option<PgConnection>,
}

impl PgWarehouse {
    pub fn connect(database_url: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EtlError::Connection(format!("Failed to start database runtime: {}", e)))?;

        let conn = runtime
            .block_on(async {
                let mut conn = PgConnection::connect(database_url).await?;
                // Test the connection
                sqlx::query("SELECT 1").execute(&mut conn).await?;
                Ok::<_, sqlx::Error>(conn)
            })
            .map_err(|e| EtlError::Connection(format!("Failed to connect to PostgreSQL: {}", e)))?;

        debug!("Connected to PostgreSQL warehouse");
        Ok(Self {
            runtime,
            conn: Some(conn),
        })
    }

    fn control(&mut self, sql: &'static str) -> Result<()> {
        let conn = open(&mut self.conn)?;
        self.runtime
            .block_on(sqlx::query(sql).execute(&mut *conn))
            .map_err(|e| EtlError::Load(format!("Failed to run {}: {}", sql, e)))?;
        Ok(())
    }
}

impl Warehouse for PgWarehouse {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn begin(&mut self) -> Result<()> {
        self.control("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.control("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.control("ROLLBACK")
    }

    fn insert_date(&mut self, date: NaiveDate) -> Result<bool> {
        let parts = DateParts::from(date);
        let conn = open(&mut self.conn)?;
        let done = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO dim_date (date, day, month, year)
                    SELECT $1, $2, $3, $4
                    WHERE NOT EXISTS (SELECT 1 FROM dim_date WHERE date = $1)
                    "#,
                )
                .bind(parts.date)
                .bind(parts.day)
                .bind(parts.month)
                .bind(parts.year)
                .execute(&mut *conn),
            )
            .map_err(|e| EtlError::Load(format!("Failed to insert date {}: {}", date, e)))?;
        Ok(done.rows_affected() > 0)
    }

    fn insert_named(&mut self, dim: NamedDimension, name: &str) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {table} (name) SELECT $1 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE name = $1)",
            table = dim.table()
        );
        let conn = open(&mut self.conn)?;
        let done = self
            .runtime
            .block_on(sqlx::query(&sql).bind(name).execute(&mut *conn))
            .map_err(|e| EtlError::Load(format!("Failed to insert into {}: {}", dim.table(), e)))?;
        Ok(done.rows_affected() > 0)
    }

    fn insert_article(&mut self, article: &ArticleDim) -> Result<bool> {
        let conn = open(&mut self.conn)?;
        let done = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO dim_article (title, description, url)
                    SELECT $1, $2, $3
                    WHERE NOT EXISTS (SELECT 1 FROM dim_article WHERE url = $3)
                    "#,
                )
                .bind(&article.title)
                .bind(&article.description)
                .bind(&article.url)
                .execute(&mut *conn),
            )
            .map_err(|e| EtlError::Load(format!("Failed to insert article {}: {}", article.url, e)))?;
        Ok(done.rows_affected() > 0)
    }

    fn date_key(&mut self, date: NaiveDate) -> Result<Option<i64>> {
        let conn = open(&mut self.conn)?;
        self.runtime
            .block_on(
                sqlx::query_scalar::<_, i64>("SELECT date_id::BIGINT FROM dim_date WHERE date = $1")
                    .bind(date)
                    .fetch_optional(&mut *conn),
            )
            .map_err(|e| EtlError::Load(format!("Failed to look up date {}: {}", date, e)))
    }

    fn named_key(&mut self, dim: NamedDimension, name: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT {key}::BIGINT FROM {table} WHERE name = $1",
            key = dim.key_column(),
            table = dim.table()
        );
        let conn = open(&mut self.conn)?;
        self.runtime
            .block_on(
                sqlx::query_scalar::<_, i64>(&sql)
                    .bind(name)
                    .fetch_optional(&mut *conn),
            )
            .map_err(|e| EtlError::Load(format!("Failed to look up {} in {}: {}", name, dim.table(), e)))
    }

    fn article_key(&mut self, url: &str) -> Result<Option<i64>> {
        let conn = open(&mut self.conn)?;
        self.runtime
            .block_on(
                sqlx::query_scalar::<_, i64>("SELECT news_id::BIGINT FROM dim_article WHERE url = $1")
                    .bind(url)
                    .fetch_optional(&mut *conn),
            )
            .map_err(|e| EtlError::Load(format!("Failed to look up article {}: {}", url, e)))
    }

    fn insert_fact(&mut self, fact: &FactRow) -> Result<bool> {
        let conn = open(&mut self.conn)?;
        let done = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO fact_news (
                        news_id, date_id, category_id, source_category_id, tag_id, is_live, in_pagination
                    ) VALUES ($1::INT, $2::INT, $3::INT, $4::INT, $5::INT, $6, $7)
                    ON CONFLICT (news_id, date_id, category_id, source_category_id, tag_id) DO NOTHING
                    "#,
                )
                .bind(fact.news_id)
                .bind(fact.date_id)
                .bind(fact.category_id)
                .bind(fact.source_category_id)
                .bind(fact.tag_id)
                .bind(fact.is_live)
                .bind(fact.in_pagination)
                .execute(&mut *conn),
            )
            .map_err(|e| EtlError::Load(format!("Failed to insert fact for news_id {}: {}", fact.news_id, e)))?;
        Ok(done.rows_affected() > 0)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            self.runtime
                .block_on(conn.close())
                .map_err(|e| EtlError::Connection(format!("Failed to close PostgreSQL connection: {}", e)))?;
            debug!("Closed PostgreSQL warehouse");
        }
        Ok(())
    }
}

fn open(conn: &mut Option<PgConnection>) -> Result<&mut PgConnection> {
    conn.as_mut()
        .ok_or_else(|| EtlError::Connection("PostgreSQL warehouse is closed".to_string()))
}
