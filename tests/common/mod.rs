#![allow(dead_code)]

use chrono::NaiveDate;
use news_etl::db::SqliteWarehouse;
use news_etl::NewsRecord;

pub const SCHEMA: &str = r#"
CREATE TABLE dim_date (
    date_id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL UNIQUE,
    day INTEGER NOT NULL,
    month INTEGER NOT NULL,
    year INTEGER NOT NULL
);
CREATE TABLE dim_category (
    category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE dim_source_category (
    source_category_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE dim_tag (
    tag_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE dim_article (
    news_id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    description TEXT,
    url TEXT NOT NULL UNIQUE
);
CREATE TABLE fact_news (
    news_id INTEGER NOT NULL REFERENCES dim_article(news_id),
    date_id INTEGER NOT NULL REFERENCES dim_date(date_id),
    category_id INTEGER NOT NULL REFERENCES dim_category(category_id),
    source_category_id INTEGER NOT NULL REFERENCES dim_source_category(source_category_id),
    tag_id INTEGER NOT NULL REFERENCES dim_tag(tag_id),
    is_live BOOLEAN NOT NULL,
    in_pagination BOOLEAN NOT NULL,
    UNIQUE (news_id, date_id, category_id, source_category_id, tag_id)
);
"#;

pub const TABLES: [&str; 6] = [
    "dim_date",
    "dim_category",
    "dim_source_category",
    "dim_tag",
    "dim_article",
    "fact_news",
];

pub fn create_schema(warehouse: &SqliteWarehouse) {
    warehouse.connection().unwrap().execute_batch(SCHEMA).unwrap();
}

pub fn warehouse() -> SqliteWarehouse {
    let warehouse = SqliteWarehouse::open_in_memory().unwrap();
    create_schema(&warehouse);
    warehouse
}

pub fn count(warehouse: &SqliteWarehouse, table: &str) -> i64 {
    warehouse
        .connection()
        .unwrap()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

pub fn counts(warehouse: &SqliteWarehouse) -> Vec<(&'static str, i64)> {
    TABLES.iter().map(|t| (*t, count(warehouse, t))).collect()
}

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

/// A fully populated record for `url`.
pub fn article(url: &str, updated: &str, tags: &str) -> NewsRecord {
    NewsRecord {
        updated: Some(date(updated)),
        category: Some("World".to_string()),
        source_category: Some("news".to_string()),
        tags: Some(tags.to_string()),
        title: Some(format!("Title of {}", url)),
        description: Some(format!("Description of {}", url)),
        url: Some(url.to_string()),
        live: Some("No".to_string()),
        in_pagination: None,
    }
}
