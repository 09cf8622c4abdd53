//! Pipeline configuration
//!
//! Values come from the environment (a `.env` file is honoured by the binary)
//! and can be overridden field by field afterwards.

use serde::Serialize;
use std::path::PathBuf;

use crate::error::{EtlError, Result};
use crate::load::CommitMode;
use crate::transform::TRANSFORM_DROP_THRESHOLD;

pub const ENV_BASE_PATH: &str = "ETL_BASE_PATH";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_LOG_DIR: &str = "ETL_LOG_DIR";
pub const ENV_DROP_THRESHOLD: &str = "ETL_DROP_NULL_THRESHOLD";
pub const ENV_COMMIT_MODE: &str = "ETL_COMMIT_MODE";

#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    pub base_path: PathBuf,
    #[serde(skip)]
    pub database_url: Option<String>,
    pub log_dir: PathBuf,
    pub drop_null_threshold: f64,
    pub commit_mode: CommitMode,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            database_url: None,
            log_dir: PathBuf::from("logs"),
            drop_null_threshold: TRANSFORM_DROP_THRESHOLD,
            commit_mode: CommitMode::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(base) = get(ENV_BASE_PATH) {
            config.base_path = PathBuf::from(base);
        }
        config.database_url = get(ENV_DATABASE_URL);
        if let Some(dir) = get(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get(ENV_DROP_THRESHOLD) {
            config.drop_null_threshold = parse_threshold(&raw)?;
        }
        if let Some(raw) = get(ENV_COMMIT_MODE) {
            config.commit_mode = raw.parse()?;
        }

        Ok(config)
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| EtlError::Config(format!("{} is not set", ENV_DATABASE_URL)))
    }

    pub fn raw_csv_path(&self) -> PathBuf {
        self.base_path.join("data").join("raw").join("bbc_news.csv")
    }

    pub fn staging_path(&self) -> PathBuf {
        self.processed_dir().join("staging_data.parquet")
    }

    pub fn transformed_path(&self) -> PathBuf {
        self.processed_dir().join("transformed_data.parquet")
    }

    fn processed_dir(&self) -> PathBuf {
        self.base_path.join("data").join("processed")
    }
}

pub fn parse_threshold(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| EtlError::Config(format!("Invalid null threshold '{}'", raw)))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(EtlError::Config(format!(
            "Null threshold {} is outside 0..=100",
            value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.drop_null_threshold, 25.0);
        assert_eq!(config.commit_mode, CommitMode::PerStatement);
        assert!(matches!(config.database_url(), Err(EtlError::Config(_))));
        assert_eq!(
            config.raw_csv_path(),
            PathBuf::from("./data/raw/bbc_news.csv")
        );
    }

    #[test]
    fn reads_every_key() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_BASE_PATH, "/srv/etl"),
            (ENV_DATABASE_URL, "sqlite://warehouse.db"),
            (ENV_LOG_DIR, "/var/log/etl"),
            (ENV_DROP_THRESHOLD, "40"),
            (ENV_COMMIT_MODE, "per-row"),
        ]))
        .unwrap();

        assert_eq!(config.database_url().unwrap(), "sqlite://warehouse.db");
        assert_eq!(config.log_dir, PathBuf::from("/var/log/etl"));
        assert_eq!(config.drop_null_threshold, 40.0);
        assert_eq!(config.commit_mode, CommitMode::PerRow);
        assert_eq!(
            config.transformed_path(),
            PathBuf::from("/srv/etl/data/processed/transformed_data.parquet")
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[(ENV_DROP_THRESHOLD, "lots")])),
            Err(EtlError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[(ENV_DROP_THRESHOLD, "120")])),
            Err(EtlError::Config(_))
        ));
        assert!(matches!(
            PipelineConfig::from_lookup(lookup(&[(ENV_COMMIT_MODE, "never")])),
            Err(EtlError::Config(_))
        ));
    }
}
