use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use news_etl::config::{self, PipelineConfig};
use news_etl::load::CommitMode;
use news_etl::{connect, logging, EtlError, Pipeline, RunSummary};

#[derive(Parser)]
#[command(name = "news-etl")]
#[command(about = "Load the BBC news feed into the star-schema warehouse")]
struct Args {
    /// Project root holding data/raw and data/processed (or set ETL_BASE_PATH)
    #[arg(short, long)]
    base_path: Option<PathBuf>,

    /// Warehouse URL: postgres://..., sqlite://... or a file path (or set DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Drop columns with more than this percentage of nulls
    #[arg(long)]
    drop_threshold: Option<String>,

    /// Transaction boundary: per-statement, per-row or per-batch
    #[arg(long)]
    commit_mode: Option<CommitMode>,

    /// Directory for etl_pipeline.log (or set ETL_LOG_DIR)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Stop after writing the transformed Parquet
    #[arg(long)]
    skip_load: bool,
}

impl Args {
    fn apply(&self, mut config: PipelineConfig) -> news_etl::Result<PipelineConfig> {
        if let Some(base) = &self.base_path {
            config.base_path = base.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        if let Some(raw) = &self.drop_threshold {
            config.drop_null_threshold = config::parse_threshold(raw)?;
        }
        if let Some(mode) = self.commit_mode {
            config.commit_mode = mode;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = dir.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = match PipelineConfig::from_env().and_then(|c| args.apply(c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    let guard = logging::init(&config.log_dir).context("Failed to set up logging")?;

    match run(config, args.skip_load) {
        Ok(summary) => {
            let rendered =
                serde_json::to_string_pretty(&summary).context("Failed to render run summary")?;
            println!("{}", rendered);
            Ok(())
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            let code = e.exit_code();
            drop(guard);
            std::process::exit(code);
        }
    }
}

fn run(config: PipelineConfig, skip_load: bool) -> Result<RunSummary, EtlError> {
    info!(
        "news-etl starting (commit mode {}, null threshold {}%)",
        config.commit_mode, config.drop_null_threshold
    );

    let mut pipeline = if skip_load {
        Pipeline::new(config)
    } else {
        let warehouse = connect(config.database_url()?)?;
        Pipeline::new(config).with_warehouse(warehouse)
    };

    pipeline.run()
}
