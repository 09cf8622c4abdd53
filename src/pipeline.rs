//! End-to-end run: extract, transform, load.

use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::db::Warehouse;
use crate::error::Result;
use crate::ingestion::Extractor;
use crate::load::{CommitMode, DimensionLoadSummary, DimensionLoader, FactLoadSummary, FactLoader};
use crate::record::NewsRecord;
use crate::transform::{TransformSummary, Transformer};

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub dimensions: DimensionLoadSummary,
    pub facts: FactLoadSummary,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub rows_extracted: usize,
    pub transform: TransformSummary,
    pub records: usize,
    /// `None` when the run stopped after the transform stage.
    pub load: Option<LoadSummary>,
    pub elapsed_ms: u128,
}

pub struct Pipeline {
    config: PipelineConfig,
    extractor: Extractor,
    transformer: Transformer,
    warehouse: Option<Box<dyn Warehouse>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let transformer = Transformer::new().with_drop_threshold(config.drop_null_threshold);
        Self {
            config,
            extractor: Extractor::new(),
            transformer,
            warehouse: None,
        }
    }

    /// Attach the warehouse the load stage writes to. Without one the run
    /// stops after writing the transformed Parquet.
    pub fn with_warehouse(mut self, warehouse: Box<dyn Warehouse>) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage once. The warehouse is closed before returning,
    /// whether the run succeeded or not.
    pub fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        info!("Starting ETL pipeline under {}", self.config.base_path.display());

        let outcome = self.run_stages();
        let closed = self.close();

        let mut summary = match outcome {
            Ok(summary) => summary,
            Err(e) => {
                error!("ETL pipeline failed: {}", e);
                if let Err(close_err) = closed {
                    warn!("Closing the warehouse after failure also failed: {}", close_err);
                }
                return Err(e);
            }
        };
        closed?;

        summary.elapsed_ms = started.elapsed().as_millis();
        info!("ETL pipeline finished in {} ms", summary.elapsed_ms);
        Ok(summary)
    }

    /// Close the attached warehouse, if any. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        match self.warehouse.take() {
            Some(mut warehouse) => {
                warehouse.close()?;
                info!("Database connection closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn run_stages(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        info!("Extract stage");
        let staging = self.config.staging_path();
        let extracted = self.extractor.extract(&self.config.raw_csv_path(), &staging)?;
        summary.rows_extracted = extracted.height();
        drop(extracted);

        info!("Transform stage");
        let (cleaned, transform) = self
            .transformer
            .run(&staging, &self.config.transformed_path())?;
        summary.transform = transform;

        let records = NewsRecord::from_frame(cleaned.frame())?;
        summary.records = records.len();

        match self.warehouse.as_deref_mut() {
            Some(warehouse) => {
                info!("Load stage ({})", self.config.commit_mode);
                summary.load = Some(load_records(warehouse, &records, self.config.commit_mode)?);
            }
            None => info!("No warehouse attached, load stage skipped"),
        }

        Ok(summary)
    }
}

/// Load dimensions, then facts. Facts are only attempted once every
/// dimension insert has succeeded.
pub fn load_records<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    records: &[NewsRecord],
    mode: CommitMode,
) -> Result<LoadSummary> {
    let dimensions = DimensionLoader::new(&mut *warehouse)
        .with_commit_mode(mode)
        .load_dimensions(records)?;
    let facts = FactLoader::new(&mut *warehouse)
        .with_commit_mode(mode)
        .load_facts(records)?;
    Ok(LoadSummary { dimensions, facts })
}
