//! Raw input extraction

pub mod extractor;

pub use extractor::{read_parquet, write_parquet, Extractor, DEFAULT_DATASET};
