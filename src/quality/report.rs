//! Diagnostic reports produced by the quality checker.

use polars::prelude::DataType;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// One duplicate occurrence: a row equal to an earlier row of the same dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateEntry {
    pub dataset: String,
    /// Position of the duplicate occurrence in the dataset.
    pub row_index: usize,
    /// Total occurrences of this row value, the canonical first one included.
    pub occurrences: usize,
    /// Rendered `(column, value)` pairs of the duplicated row.
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    pub entries: Vec<DuplicateEntry>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Distinct dataset names, sorted.
    pub fn datasets(&self) -> BTreeSet<&str> {
        self.entries.iter().map(|e| e.dataset.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NullEntry {
    pub dataset: String,
    pub column: String,
    #[serde(serialize_with = "serialize_dtype")]
    pub dtype: DataType,
    pub null_count: usize,
    pub null_percentage: f64,
    pub is_temporal: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NullReport {
    pub entries: Vec<NullEntry>,
}

impl NullReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn find(&self, dataset: &str, column: &str) -> Option<&NullEntry> {
        self.entries
            .iter()
            .find(|e| e.dataset == dataset && e.column == column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckKind {
    DataType,
    ValueRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn from_bool(passed: bool) -> Self {
        if passed {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationEntry {
    pub dataset: String,
    pub column: String,
    pub check: CheckKind,
    pub expected: String,
    pub actual: String,
    pub status: CheckStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub entries: Vec<ValidationEntry>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ValidationEntry> {
        self.entries.iter().filter(|e| e.status == CheckStatus::Fail)
    }

    pub fn find(&self, dataset: &str, column: &str, check: CheckKind) -> Option<&ValidationEntry> {
        self.entries
            .iter()
            .find(|e| e.dataset == dataset && e.column == column && e.check == check)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:<16} {:<11} {:<20} {:<28} {}",
            "Dataset", "Column", "Check", "Expected", "Actual", "Status"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "{:<16} {:<16} {:<11} {:<20} {:<28} {:?}",
                e.dataset,
                e.column,
                format!("{:?}", e.check),
                e.expected,
                e.actual,
                e.status
            )?;
        }
        Ok(())
    }
}

fn serialize_dtype<S: serde::Serializer>(dtype: &DataType, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dtype.to_string())
}
