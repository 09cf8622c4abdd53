//! Open a warehouse handle from a database URL

use tracing::info;

use super::{PgWarehouse, SqliteWarehouse, Warehouse};
use crate::error::{EtlError, Result};

/// `postgres://` and `postgresql://` URLs open a PostgreSQL warehouse;
/// `sqlite://` URLs and plain paths open a SQLite file (`:memory:` included).
pub fn connect(database_url: &str) -> Result<Box<dyn Warehouse>> {
    let url = database_url.trim();
    if url.is_empty() {
        return Err(EtlError::Config("Database URL is empty".to_string()));
    }

    let warehouse: Box<dyn Warehouse> = if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Box::new(PgWarehouse::connect(url)?)
    } else {
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        if path == ":memory:" {
            Box::new(SqliteWarehouse::open_in_memory()?)
        } else {
            Box::new(SqliteWarehouse::open(path)?)
        }
    };

    info!(
        "Database connection opened ({}, {})",
        warehouse.backend(),
        redact(url)
    );
    Ok(warehouse)
}

/// Strip credentials from a URL before logging it.
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}
