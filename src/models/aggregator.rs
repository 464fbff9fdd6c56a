//! Ensemble decision over the outlier and risk signals

use crate::error::{Result, TriageError};
use crate::types::verdict::{CombinedVerdict, FlagSource, OutlierVerdict, RiskVerdict};

/// Merges the two signals into one decision per claim.
///
/// A claim is flagged when either signal fires (logical OR, not a vote):
/// a missed fraud costs more than an extra review. Confidence is always the
/// risk classifier's; the outlier signal only contributes to the flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleDecision;

impl EnsembleDecision {
    pub fn new() -> Self {
        Self
    }

    /// Combine row-aligned verdicts. Lengths must match.
    pub fn combine(
        &self,
        outliers: &[OutlierVerdict],
        risks: &[RiskVerdict],
    ) -> Result<Vec<CombinedVerdict>> {
        TriageError::check_rows("ensemble inputs", risks.len(), outliers.len())?;

        Ok(outliers
            .iter()
            .zip(risks)
            .map(|(outlier, risk)| {
                let risk_fired = risk.label.is_fraud();
                CombinedVerdict {
                    flagged: risk_fired || outlier.is_outlier,
                    confidence: risk.confidence,
                    source: FlagSource::from_signals(risk_fired, outlier.is_outlier),
                }
            })
            .collect())
    }
}
