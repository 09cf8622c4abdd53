//! CSV to staging Parquet

use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use tracing::{error, info};

use crate::error::{EtlError, Result};
use crate::rowset::RowSet;

/// Name given to the dataset read from the raw feed.
pub const DEFAULT_DATASET: &str = "news";

#[derive(Debug, Clone)]
pub struct Extractor {
    dataset: String,
    infer_schema_rows: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            dataset: DEFAULT_DATASET.to_string(),
            infer_schema_rows: 1000,
        }
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `csv_path` and persist it as Parquet at `staging_path`.
    ///
    /// Returns the extracted rows so the caller does not have to read the
    /// staging file back.
    pub fn extract(&self, csv_path: &Path, staging_path: &Path) -> Result<RowSet> {
        info!("Extracting {}", csv_path.display());

        let mut frame = self.read_csv(csv_path).map_err(|e| {
            error!("Failed to extract {}: {}", csv_path.display(), e);
            e
        })?;
        write_parquet(&mut frame, staging_path)?;

        info!(
            "Extracted {} rows x {} columns to {}",
            frame.height(),
            frame.width(),
            staging_path.display()
        );
        Ok(RowSet::new(self.dataset.clone(), frame))
    }

    fn read_csv(&self, path: &Path) -> Result<DataFrame> {
        if !path.exists() {
            return Err(EtlError::Extraction(format!(
                "Input file not found: {}",
                path.display()
            )));
        }

        LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_rows))
            .finish()
            .map_err(|e| EtlError::Extraction(format!("Failed to read CSV: {}", e)))?
            .collect()
            .map_err(|e| EtlError::Extraction(format!("Failed to collect CSV: {}", e)))
    }
}

/// Write `frame` as Parquet, creating parent directories as needed.
pub fn write_parquet(frame: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    ParquetWriter::new(file)
        .finish(frame)
        .map_err(|e| EtlError::Extraction(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

pub fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| {
        EtlError::Extraction(format!("Failed to open {}: {}", path.display(), e))
    })?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| EtlError::Extraction(format!("Failed to read {}: {}", path.display(), e)))
}
