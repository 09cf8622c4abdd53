use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Imputation method '{0}' is not recognized")]
    Imputation(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::prelude::PolarsError> for EtlError {
    fn from(e: polars::prelude::PolarsError) -> Self {
        EtlError::Polars(e.to_string())
    }
}

impl EtlError {
    /// Process exit status for a fatal error. Soft row issues never become
    /// an `EtlError`, so every variant here terminates the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            EtlError::Config(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
