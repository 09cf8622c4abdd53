mod common;

use std::fs;
use std::path::Path;

use common::{count, create_schema, date};
use news_etl::db::{SqliteWarehouse, Warehouse};
use news_etl::ingestion::read_parquet;
use news_etl::{connect, EtlError, Pipeline, PipelineConfig};

const FEED: &str = "\
updated,category,source_category,tags,title,description,url,live
15-03-2024,Tech,news,\"ai, ai, policy\",Chips,New chips,http://x/1,Yes
15-03-2024,Tech,news,\"ai, ai, policy\",Chips,New chips,http://x/1,Yes
16-03-2024,World,news,election,Vote,Vote today,http://x/2,No
16-03-2024,World,news,election,Vote (updated),Polls open,http://x/2,No
17-03-2024,World,news,election,Count,Counting starts,http://x/3,No
18-03-2024,Sport,sport,football,Goal,Late goal,http://x/4,No
";

fn write_feed(base: &Path) {
    let raw = base.join("data").join("raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(raw.join("bbc_news.csv"), FEED).unwrap();
}

fn config(base: &Path) -> PipelineConfig {
    PipelineConfig {
        base_path: base.to_path_buf(),
        database_url: Some(base.join("warehouse.db").display().to_string()),
        log_dir: base.join("logs"),
        ..Default::default()
    }
}

fn prepared_warehouse(path: &str) {
    let mut w = SqliteWarehouse::open(path).unwrap();
    create_schema(&w);
    w.close().unwrap();
}

#[test]
fn full_run_loads_the_feed_and_reruns_converge() {
    let dir = tempfile::tempdir().unwrap();
    write_feed(dir.path());
    let config = config(dir.path());
    let url = config.database_url().unwrap().to_string();
    prepared_warehouse(&url);

    let summary = Pipeline::new(config.clone())
        .with_warehouse(connect(&url).unwrap())
        .run()
        .unwrap();

    assert_eq!(summary.rows_extracted, 6);
    // one full-row repeat and one repeated url
    assert_eq!(summary.transform.duplicates_removed, 2);
    assert_eq!(summary.records, 4);
    let load = summary.load.unwrap();
    assert_eq!(load.dimensions.dates_inserted, 4);
    assert_eq!(load.dimensions.categories_inserted, 3);
    assert_eq!(load.dimensions.source_categories_inserted, 2);
    assert_eq!(load.dimensions.tags_inserted, 4);
    assert_eq!(load.dimensions.articles_inserted, 4);
    assert_eq!(load.facts.facts_inserted, 5);

    assert!(config.staging_path().exists());
    let transformed = read_parquet(&config.transformed_path()).unwrap();
    assert_eq!(transformed.height(), 4);
    let titles: Vec<Option<&str>> = transformed.column("title").unwrap().str().unwrap().into_iter().collect();
    assert!(titles.contains(&Some("Vote")));
    assert!(!titles.contains(&Some("Vote (updated)")));

    let rerun = Pipeline::new(config)
        .with_warehouse(connect(&url).unwrap())
        .run()
        .unwrap();
    let load = rerun.load.unwrap();
    assert_eq!(load.dimensions.total_inserted(), 0);
    assert_eq!(load.facts.facts_inserted, 0);

    let mut w = SqliteWarehouse::open(&url).unwrap();
    assert_eq!(count(&w, "fact_news"), 5);
    assert_eq!(count(&w, "dim_article"), 4);
    assert!(w.date_key(date("2024-03-15")).unwrap().is_some());
    w.close().unwrap();
}

#[test]
fn run_without_warehouse_stops_after_transform() {
    let dir = tempfile::tempdir().unwrap();
    write_feed(dir.path());
    let config = config(dir.path());

    let summary = Pipeline::new(config.clone()).run().unwrap();

    assert!(summary.load.is_none());
    assert_eq!(summary.records, 4);
    assert!(config.transformed_path().exists());
}

#[test]
fn missing_feed_fails_and_closes_the_warehouse() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let url = config.database_url().unwrap().to_string();
    prepared_warehouse(&url);

    let mut pipeline = Pipeline::new(config).with_warehouse(connect(&url).unwrap());
    let err = pipeline.run().unwrap_err();

    assert!(matches!(err, EtlError::Extraction(_)));
    assert_eq!(err.exit_code(), 1);
    // already closed by run
    pipeline.close().unwrap();
}
