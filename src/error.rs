//! Error types for the triage pipeline
//!
//! Fatal conditions abort a run. Degraded conditions (no probability output,
//! absent risk-factor columns) never surface here.

use thiserror::Error;

/// Errors surfaced by the scoring and prioritization pipeline.
#[derive(Error, Debug)]
pub enum TriageError {
    /// Paired row-aligned inputs disagree on length
    #[error("shape mismatch in {context}: expected {expected} rows, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A column the operation cannot run without is absent
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    /// Too few labeled rows (or a missing class) to split and train
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A label cell that is not a recognised fraud / not-fraud value
    #[error("invalid label '{value}' at row {row}")]
    InvalidLabel { row: usize, value: String },

    /// Estimator or component parameter out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Estimator used before fitting or failed internally
    #[error("estimator error: {0}")]
    Estimator(String),

    #[error("failed to read claims: {0}")]
    Ingest(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TriageError {
    /// Shape check helper used at every row-alignment boundary.
    pub fn check_rows(context: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(TriageError::ShapeMismatch {
                context,
                expected,
                actual,
            })
        }
    }

    pub fn missing_column(column: impl Into<String>) -> Self {
        TriageError::MissingColumn {
            column: column.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TriageError>;
