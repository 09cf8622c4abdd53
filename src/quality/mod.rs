//! Data-quality engine
//!
//! The checker produces diagnostic reports without touching values (apart from
//! the temporal coercion done by `check_nulls`); the repairer consumes those
//! reports and mutates the RowSets in place.

pub mod checker;
pub mod repairer;
pub mod report;
pub mod stats;

pub use checker::QualityChecker;
pub use repairer::{
    select_method, ImputeMethod, NullHandlingSummary, QualityRepairer, DEFAULT_DEDUP_KEY,
    DEFAULT_DROP_THRESHOLD,
};
pub use report::{
    CheckKind, CheckStatus, DuplicateEntry, DuplicateReport, NullEntry, NullReport,
    ValidationEntry, ValidationReport,
};
