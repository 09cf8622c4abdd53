mod common;

use common::{article, count, counts, date, warehouse};
use news_etl::db::{NamedDimension, Warehouse};
use news_etl::load::{CommitMode, DimensionLoader, FactLoader};
use news_etl::{load_records, NewsRecord};

#[test]
fn loading_dimensions_twice_changes_nothing() {
    let mut w = warehouse();
    let records = vec![
        article("http://x/1", "2024-03-15", "ai, policy"),
        article("http://x/2", "2024-03-16", "policy"),
    ];

    let first = DimensionLoader::new(&mut w).load_dimensions(&records).unwrap();
    assert_eq!(first.dates_inserted, 2);
    assert_eq!(first.categories_inserted, 1);
    assert_eq!(first.source_categories_inserted, 1);
    assert_eq!(first.tags_inserted, 2);
    assert_eq!(first.articles_inserted, 2);
    let after_first = counts(&w);

    let second = DimensionLoader::new(&mut w).load_dimensions(&records).unwrap();
    assert_eq!(second.total_inserted(), 0);
    assert_eq!(counts(&w), after_first);
}

#[test]
fn loading_facts_twice_changes_nothing() {
    let mut w = warehouse();
    let records = vec![
        article("http://x/1", "2024-03-15", "ai, policy"),
        article("http://x/2", "2024-03-16", "policy"),
    ];
    DimensionLoader::new(&mut w).load_dimensions(&records).unwrap();

    let first = FactLoader::new(&mut w).load_facts(&records).unwrap();
    assert_eq!(first.facts_inserted, 3);
    assert_eq!(count(&w, "fact_news"), 3);

    let second = FactLoader::new(&mut w).load_facts(&records).unwrap();
    assert_eq!(second.facts_inserted, 0);
    assert_eq!(second.facts_existing, 3);
    assert_eq!(count(&w, "fact_news"), 3);
}

#[test]
fn missing_source_category_loads_dimensions_but_no_fact() {
    let mut w = warehouse();
    let record = NewsRecord {
        updated: Some(date("2024-03-15")),
        category: Some("Tech".to_string()),
        source_category: None,
        tags: Some("ai".to_string()),
        title: Some("Chips".to_string()),
        description: Some("New chips".to_string()),
        url: Some("http://x/tech".to_string()),
        live: Some("Yes".to_string()),
        in_pagination: None,
    };

    let dims = DimensionLoader::new(&mut w)
        .load_dimensions(std::slice::from_ref(&record))
        .unwrap();
    assert_eq!(dims.dates_inserted, 1);
    assert_eq!(dims.categories_inserted, 1);
    assert_eq!(dims.source_categories_inserted, 0);
    assert_eq!(dims.soft_issues, 1);

    let facts = FactLoader::new(&mut w).load_facts(&[record]).unwrap();
    assert_eq!(facts.rows_unresolved, 1);
    assert_eq!(facts.facts_inserted, 0);
    assert_eq!(count(&w, "dim_date"), 1);
    assert_eq!(count(&w, "dim_category"), 1);
    assert_eq!(count(&w, "fact_news"), 0);
}

#[test]
fn repeated_tags_are_loaded_once() {
    let mut w = warehouse();
    let records = vec![article("http://x/1", "2024-03-15", "ai, ai, policy")];

    let summary = load_records(&mut w, &records, CommitMode::PerStatement).unwrap();
    assert_eq!(summary.dimensions.tags_inserted, 2);
    assert_eq!(count(&w, "dim_tag"), 2);
    assert_eq!(summary.facts.facts_inserted, 2);
    assert!(count(&w, "fact_news") <= 2);
}

#[test]
fn rows_without_date_are_skipped_everywhere() {
    let mut w = warehouse();
    let mut undated = article("http://x/1", "2024-03-15", "ai");
    undated.updated = None;

    let summary = load_records(&mut w, &[undated], CommitMode::PerStatement).unwrap();
    assert_eq!(summary.dimensions.rows_without_date, 1);
    assert_eq!(summary.facts.rows_without_date, 1);
    assert!(counts(&w).iter().all(|(_, n)| *n == 0));
}

#[test]
fn unknown_tag_only_skips_that_tag() {
    let mut w = warehouse();
    let loaded = article("http://x/1", "2024-03-15", "ai");
    DimensionLoader::new(&mut w)
        .load_dimensions(std::slice::from_ref(&loaded))
        .unwrap();

    let mut widened = loaded.clone();
    widened.tags = Some("ai, unseen".to_string());
    let facts = FactLoader::new(&mut w).load_facts(&[widened]).unwrap();

    assert_eq!(facts.tags_unresolved, 1);
    assert_eq!(facts.facts_inserted, 1);
}

#[test]
fn live_and_pagination_flags_reach_the_fact_row() {
    let mut w = warehouse();
    let mut live = article("http://x/live", "2024-03-15", "ai");
    live.live = Some("Yes".to_string());
    live.in_pagination = Some(true);
    let quiet = article("http://x/quiet", "2024-03-15", "ai");

    load_records(&mut w, &[live, quiet], CommitMode::PerRow).unwrap();

    let conn = w.connection().unwrap();
    let flags: Vec<(String, bool, bool)> = conn
        .prepare(
            "SELECT a.url, f.is_live, f.in_pagination
             FROM fact_news f JOIN dim_article a ON a.news_id = f.news_id
             ORDER BY a.url",
        )
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(
        flags,
        vec![
            ("http://x/live".to_string(), true, true),
            ("http://x/quiet".to_string(), false, false),
        ]
    );
}

#[test]
fn every_commit_mode_converges_to_the_same_state() {
    let records = vec![
        article("http://x/1", "2024-03-15", "ai, policy"),
        article("http://x/1", "2024-03-15", "ai"),
        article("http://x/2", "2024-03-17", "sport"),
    ];

    let mut states = Vec::new();
    for mode in [CommitMode::PerStatement, CommitMode::PerRow, CommitMode::PerBatch] {
        let mut w = warehouse();
        load_records(&mut w, &records, mode).unwrap();
        let once = counts(&w);
        let rerun = load_records(&mut w, &records, mode).unwrap();
        assert_eq!(rerun.dimensions.total_inserted(), 0, "{mode}");
        assert_eq!(rerun.facts.facts_inserted, 0, "{mode}");
        assert_eq!(counts(&w), once, "{mode}");
        states.push(once);
    }

    assert!(states.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn failed_batch_rolls_back() {
    let mut w = warehouse();
    w.connection().unwrap().execute_batch("DROP TABLE dim_article").unwrap();

    let records = vec![article("http://x/1", "2024-03-15", "ai")];
    let result = DimensionLoader::new(&mut w)
        .with_commit_mode(CommitMode::PerBatch)
        .load_dimensions(&records);

    assert!(result.is_err());
    assert_eq!(count(&w, "dim_date"), 0);
    assert_eq!(count(&w, "dim_tag"), 0);
}

#[test]
fn keys_are_readable_after_dimension_load() {
    let mut w = warehouse();
    let records = vec![article("http://x/1", "2024-03-15", "ai")];
    DimensionLoader::new(&mut w).load_dimensions(&records).unwrap();

    assert!(w.date_key(date("2024-03-15")).unwrap().is_some());
    assert!(w.named_key(NamedDimension::Tag, "ai").unwrap().is_some());
    assert!(w.named_key(NamedDimension::Tag, "missing").unwrap().is_none());
    assert!(w.article_key("http://x/1").unwrap().is_some());
}
