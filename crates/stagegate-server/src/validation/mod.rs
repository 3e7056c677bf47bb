//! Structural validation of staged CSV uploads
//!
//! - **timestamp**: lexical check of a single `timestamp` value
//! - **structural**: header and per-row checks over a whole file

pub mod structural;
pub mod timestamp;

use serde::Serialize;

pub use structural::{validate, validate_file, CsvRow};
pub use timestamp::is_valid_timestamp;

/// Columns every upload must carry, matched case-sensitively against the header.
pub const REQUIRED_COLUMNS: [&str; 3] = ["id", "value", "timestamp"];

/// Result of structurally validating a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(reason) => Some(reason),
        }
    }
}
