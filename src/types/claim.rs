//! Claim table data structures
//!
//! A `ClaimTable` is the in-memory form of the claims under review: named
//! columns, one identity per record, row order stable for the whole run.

use crate::error::{Result, TriageError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single cell of the claim table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    /// Parse a raw cell. Finite numbers become `Number`, blanks and the usual
    /// NA spellings become `Missing`, anything else stays text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Missing;
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "na" | "n/a" | "nan" | "null" | "none" | "?" => return FieldValue::Missing,
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => FieldValue::Number(v),
            _ => FieldValue::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell, if it holds a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// Ground-truth / predicted class of a claim.
///
/// Ordering puts `NotFraud` first; estimator probability columns follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudLabel {
    NotFraud,
    Fraud,
}

impl FraudLabel {
    /// Parse a label cell (`Y`/`N`, `1`/`0`, `true`/`false`, `yes`/`no`, `fraud`/`not_fraud`)
    pub fn parse(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Number(v) if *v == 1.0 => Some(FraudLabel::Fraud),
            FieldValue::Number(v) if *v == 0.0 => Some(FraudLabel::NotFraud),
            FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" | "fraud" | "1" => Some(FraudLabel::Fraud),
                "n" | "no" | "false" | "not_fraud" | "not-fraud" | "0" => {
                    Some(FraudLabel::NotFraud)
                }
                _ => None,
            },
            _ => None,
        }
    }

    pub fn is_fraud(self) -> bool {
        self == FraudLabel::Fraud
    }

    pub fn from_flag(flag: bool) -> Self {
        if flag {
            FraudLabel::Fraud
        } else {
            FraudLabel::NotFraud
        }
    }
}

impl fmt::Display for FraudLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FraudLabel::NotFraud => f.write_str("not_fraud"),
            FraudLabel::Fraud => f.write_str("fraud"),
        }
    }
}

/// One row of the claim table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimRecord {
    /// Claim identifier (from the id column, or the 1-based row number)
    pub claim_id: String,
    /// Position in the table as originally ingested
    pub row: usize,
    /// Cell values aligned with the table's columns
    pub values: Vec<FieldValue>,
}

/// Compare two claim identifiers: numerically when both are numbers,
/// lexically otherwise.
pub fn compare_claim_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        _ => a.cmp(b),
    }
}

/// Named-column claim table
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTable {
    columns: Vec<String>,
    records: Vec<ClaimRecord>,
}

impl ClaimTable {
    /// Build a table from raw rows; `id_column` names the claim identity.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<FieldValue>>, id_column: &str) -> Result<Self> {
        let id_index = columns.iter().position(|c| c == id_column);
        let mut records = Vec::with_capacity(rows.len());

        for (row, values) in rows.into_iter().enumerate() {
            TriageError::check_rows("claim row width", columns.len(), values.len())?;
            let claim_id = match id_index.map(|i| &values[i]) {
                Some(value) if !value.is_missing() => value.to_string(),
                _ => (row + 1).to_string(),
            };
            records.push(ClaimRecord {
                claim_id,
                row,
                values,
            });
        }

        Ok(Self { columns, records })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[ClaimRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All cells of a column, in row order
    pub fn column(&self, name: &str) -> Option<Vec<&FieldValue>> {
        let index = self.column_index(name)?;
        Some(self.records.iter().map(|r| &r.values[index]).collect())
    }

    /// Ground-truth labels from `label_column`
    pub fn labels(&self, label_column: &str) -> Result<Vec<FraudLabel>> {
        let index = self
            .column_index(label_column)
            .ok_or_else(|| TriageError::missing_column(label_column))?;

        self.records
            .iter()
            .map(|record| {
                let cell = &record.values[index];
                FraudLabel::parse(cell).ok_or_else(|| TriageError::InvalidLabel {
                    row: record.row,
                    value: cell.to_string(),
                })
            })
            .collect()
    }

    /// Return a copy with `name` set to `values` (replacing an existing column
    /// of the same name).
    pub fn with_column(&self, name: &str, values: Vec<FieldValue>) -> Result<Self> {
        TriageError::check_rows("appended column", self.len(), values.len())?;

        let mut table = self.clone();
        match table.column_index(name) {
            Some(index) => {
                for (record, value) in table.records.iter_mut().zip(values) {
                    record.values[index] = value;
                }
            }
            None => {
                table.columns.push(name.to_string());
                for (record, value) in table.records.iter_mut().zip(values) {
                    record.values.push(value);
                }
            }
        }
        Ok(table)
    }

    /// Rows whose position in this table satisfies `keep`
    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize, &ClaimRecord) -> bool,
    {
        let records = self
            .records
            .iter()
            .enumerate()
            .filter(|(i, r)| keep(*i, r))
            .map(|(_, r)| r.clone())
            .collect();

        Self {
            columns: self.columns.clone(),
            records,
        }
    }
}
