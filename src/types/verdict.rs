//! Per-claim verdicts and the investigation worklist

use crate::types::claim::{ClaimRecord, FieldValue, FraudLabel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized output of the outlier estimator for one claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierVerdict {
    pub is_outlier: bool,
}

impl OutlierVerdict {
    pub fn new(is_outlier: bool) -> Self {
        Self { is_outlier }
    }
}

/// Output of the risk classifier for one claim
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub label: FraudLabel,
    /// Probability mass on the fraud class (0.0 when unavailable)
    pub confidence: f64,
}

impl RiskVerdict {
    pub fn new(label: FraudLabel, confidence: f64) -> Self {
        Self { label, confidence }
    }
}

/// Which signal(s) raised a combined flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSource {
    None,
    Risk,
    Outlier,
    Both,
}

impl FlagSource {
    pub fn from_signals(risk: bool, outlier: bool) -> Self {
        match (risk, outlier) {
            (true, true) => FlagSource::Both,
            (true, false) => FlagSource::Risk,
            (false, true) => FlagSource::Outlier,
            (false, false) => FlagSource::None,
        }
    }
}

/// Ensemble decision for one claim
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedVerdict {
    pub flagged: bool,
    /// Always the risk classifier's confidence
    pub confidence: f64,
    pub source: FlagSource,
}

impl CombinedVerdict {
    /// Flag as the 0/1 value written to the annotated table
    pub fn flag(&self) -> u8 {
        u8::from(self.flagged)
    }
}

/// A flagged claim with its ranking score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestigationEntry {
    pub record: ClaimRecord,
    /// Ordering key only; unbounded above, not a probability
    pub investigation_score: f64,
}

/// Flagged claims ordered by descending investigation score
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Worklist {
    pub columns: Vec<String>,
    pub entries: Vec<InvestigationEntry>,
}

/// Serialized form of a worklist row
#[derive(Debug, Serialize)]
pub struct WorklistRow<'a> {
    pub rank: usize,
    pub claim_id: &'a str,
    pub investigation_score: f64,
    pub fields: BTreeMap<&'a str, &'a FieldValue>,
}

impl Worklist {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Claim identifiers in ranked order
    pub fn claim_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.record.claim_id.as_str())
            .collect()
    }

    /// Top `n` entries as serializable rows (1-based rank)
    pub fn rows(&self, n: usize) -> Vec<WorklistRow<'_>> {
        self.entries
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, entry)| WorklistRow {
                rank: i + 1,
                claim_id: &entry.record.claim_id,
                investigation_score: entry.investigation_score,
                fields: self
                    .columns
                    .iter()
                    .map(String::as_str)
                    .zip(entry.record.values.iter())
                    .collect(),
            })
            .collect()
    }
}
