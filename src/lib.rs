pub mod config;
pub mod db;
pub mod error;
pub mod ingestion;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod quality;
pub mod record;
pub mod rowset;
pub mod temporal;
pub mod transform;

pub use config::PipelineConfig;
pub use db::{connect, Warehouse};
pub use error::{EtlError, Result};
pub use pipeline::{load_records, Pipeline, RunSummary};
pub use record::NewsRecord;
pub use rowset::{Datasets, RowSet};
