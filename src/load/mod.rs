//! Dimensional load engine
//!
//! [`DimensionLoader`] fills the lookup tables, then [`FactLoader`] reads the
//! surrogate keys back and links them in `fact_news`. Both borrow the
//! warehouse handle they are given and never open one themselves.

pub mod dimension;
pub mod fact;

pub use dimension::{DimensionLoadSummary, DimensionLoader};
pub use fact::{FactLoadSummary, FactLoader};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::db::Warehouse;
use crate::error::{EtlError, Result};

/// Where the loaders draw transaction boundaries.
///
/// The insert-if-absent and do-nothing-on-conflict guards hold at every
/// granularity, so a re-run after a crash converges whichever mode was used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// Commit after every insert.
    #[default]
    PerStatement,
    /// Commit once per source row.
    PerRow,
    /// One transaction per loader call.
    PerBatch,
}

impl CommitMode {
    fn commits_at(self, boundary: Boundary) -> bool {
        matches!(
            (self, boundary),
            (CommitMode::PerStatement, Boundary::Statement)
                | (CommitMode::PerRow, Boundary::Row)
                | (CommitMode::PerBatch, Boundary::Batch)
        )
    }
}

impl FromStr for CommitMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statement" | "per-statement" => Ok(CommitMode::PerStatement),
            "row" | "per-row" => Ok(CommitMode::PerRow),
            "batch" | "per-batch" => Ok(CommitMode::PerBatch),
            other => Err(EtlError::Config(format!("Unknown commit mode '{}'", other))),
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommitMode::PerStatement => "per-statement",
            CommitMode::PerRow => "per-row",
            CommitMode::PerBatch => "per-batch",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Boundary {
    Statement,
    Row,
    Batch,
}

/// Run `f` inside a transaction when `mode` commits at `boundary`; otherwise
/// run it inside whatever unit is already open.
pub(crate) fn in_unit<W, T, F>(warehouse: &mut W, mode: CommitMode, boundary: Boundary, f: F) -> Result<T>
where
    W: Warehouse + ?Sized,
    F: FnOnce(&mut W) -> Result<T>,
{
    if !mode.commits_at(boundary) {
        return f(warehouse);
    }

    warehouse.begin()?;
    match f(warehouse) {
        Ok(value) => {
            warehouse.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = warehouse.rollback() {
                warn!("Rollback after failed {:?} unit also failed: {}", boundary, rollback_err);
            }
            Err(e)
        }
    }
}
