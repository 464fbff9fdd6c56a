//! Investigation prioritization for flagged claims.
//!
//! `investigation_score = confidence + Σ weight * value(factor)` over the risk
//! factors present as columns. Factors absent from the table are skipped, so
//! callers can pass one superset of factors for every dataset. Non-numeric or
//! missing cells contribute 0.0.
//!
//! Order is by descending score; ties go to the lower claim identifier, then
//! to the earlier original row.

use crate::error::{Result, TriageError};
use crate::types::claim::{compare_claim_ids, ClaimTable};
use crate::types::verdict::{InvestigationEntry, Worklist};
use std::collections::BTreeMap;
use tracing::debug;

pub struct InvestigationPrioritizer {
    confidence_column: String,
    risk_factors: BTreeMap<String, f64>,
}

impl InvestigationPrioritizer {
    /// Weights must be finite.
    pub fn new(
        confidence_column: impl Into<String>,
        risk_factors: BTreeMap<String, f64>,
    ) -> Result<Self> {
        if let Some((name, weight)) = risk_factors.iter().find(|(_, w)| !w.is_finite()) {
            return Err(TriageError::InvalidParameter(format!(
                "risk factor '{}' has non-finite weight {}",
                name, weight
            )));
        }
        Ok(Self {
            confidence_column: confidence_column.into(),
            risk_factors,
        })
    }

    /// Confidence-only ranking
    pub fn confidence_only(confidence_column: impl Into<String>) -> Self {
        Self {
            confidence_column: confidence_column.into(),
            risk_factors: BTreeMap::new(),
        }
    }

    /// Score and order `flagged`. The input table is left untouched.
    pub fn prioritize(&self, flagged: &ClaimTable) -> Result<Worklist> {
        let confidence_index = flagged
            .column_index(&self.confidence_column)
            .ok_or_else(|| TriageError::missing_column(&self.confidence_column))?;

        let factors: Vec<(usize, f64)> = self
            .risk_factors
            .iter()
            .filter_map(|(name, &weight)| match flagged.column_index(name) {
                Some(index) => Some((index, weight)),
                None => {
                    debug!(factor = %name, "Risk factor column absent, skipped");
                    None
                }
            })
            .collect();

        let mut entries: Vec<InvestigationEntry> = flagged
            .records()
            .iter()
            .map(|record| {
                let cell = |index: usize| record.values[index].as_number().unwrap_or(0.0);
                let score = factors
                    .iter()
                    .fold(cell(confidence_index), |acc, &(index, weight)| {
                        acc + weight * cell(index)
                    });
                InvestigationEntry {
                    record: record.clone(),
                    investigation_score: score,
                }
            })
            .collect();

        entries.sort_by(|a, b| {
            b.investigation_score
                .total_cmp(&a.investigation_score)
                .then_with(|| compare_claim_ids(&a.record.claim_id, &b.record.claim_id))
                .then_with(|| a.record.row.cmp(&b.record.row))
        });

        debug!(
            entries = entries.len(),
            factors = factors.len(),
            "Investigation worklist ranked"
        );

        Ok(Worklist {
            columns: flagged.columns().to_vec(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::claim::FieldValue;

    fn table(columns: &[&str], rows: Vec<Vec<FieldValue>>) -> ClaimTable {
        ClaimTable::new(columns.iter().map(|c| c.to_string()).collect(), rows, "claim_id").unwrap()
    }

    fn factors(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn scores(worklist: &Worklist) -> Vec<f64> {
        worklist.entries.iter().map(|e| e.investigation_score).collect()
    }

    #[test]
    fn test_confidence_ordering() {
        let flagged = table(
            &["claim_id", "fraud_confidence"],
            vec![vec![1.0.into(), 0.0.into()], vec![2.0.into(), 1.0.into()]],
        );

        let worklist = InvestigationPrioritizer::confidence_only("fraud_confidence")
            .prioritize(&flagged)
            .unwrap();
        assert_eq!(worklist.claim_ids(), vec!["2", "1"]);
        assert_eq!(scores(&worklist), vec![1.0, 0.0]);
    }

    #[test]
    fn test_risk_factor_additivity() {
        let flagged = table(
            &["claim_id", "fraud_confidence", "prior_claims"],
            vec![
                vec![1.0.into(), 0.2.into(), 10.0.into()],
                vec![2.0.into(), 0.8.into(), 0.0.into()],
            ],
        );

        let worklist = InvestigationPrioritizer::new("fraud_confidence", factors(&[("prior_claims", 0.1)]))
            .unwrap()
            .prioritize(&flagged)
            .unwrap();

        assert_eq!(worklist.claim_ids(), vec!["1", "2"]);
        let s = scores(&worklist);
        assert!((s[0] - 1.2).abs() < 1e-9);
        assert!((s[1] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_missing_factor_is_ignored() {
        let flagged = table(
            &["claim_id", "fraud_confidence", "prior_claims"],
            vec![
                vec![1.0.into(), 0.2.into(), 10.0.into()],
                vec![2.0.into(), 0.8.into(), 0.0.into()],
            ],
        );

        let with_unknown = InvestigationPrioritizer::new(
            "fraud_confidence",
            factors(&[("prior_claims", 0.1), ("claimant_velocity", 5.0)]),
        )
        .unwrap()
        .prioritize(&flagged)
        .unwrap();
        let without = InvestigationPrioritizer::new("fraud_confidence", factors(&[("prior_claims", 0.1)]))
            .unwrap()
            .prioritize(&flagged)
            .unwrap();

        assert_eq!(with_unknown, without);
    }

    #[test]
    fn test_missing_confidence_column() {
        let flagged = table(&["claim_id", "score"], vec![vec![1.0.into(), 0.5.into()]]);

        match InvestigationPrioritizer::confidence_only("fraud_confidence").prioritize(&flagged) {
            Err(TriageError::MissingColumn { column }) => assert_eq!(column, "fraud_confidence"),
            other => panic!("expected missing column, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_confidence_ranked_by_factors() {
        let flagged = table(
            &["claim_id", "fraud_confidence", "claim_amount"],
            vec![
                vec![1.0.into(), 0.0.into(), 100.0.into()],
                vec![2.0.into(), 0.0.into(), 900.0.into()],
                vec![3.0.into(), 0.0.into(), 500.0.into()],
            ],
        );

        let worklist = InvestigationPrioritizer::new("fraud_confidence", factors(&[("claim_amount", 0.001)]))
            .unwrap()
            .prioritize(&flagged)
            .unwrap();
        assert_eq!(worklist.claim_ids(), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_ties_broken_by_claim_id() {
        let flagged = table(
            &["claim_id", "fraud_confidence"],
            vec![
                vec![10.0.into(), 0.5.into()],
                vec![2.0.into(), 0.5.into()],
                vec![7.0.into(), 0.9.into()],
            ],
        );

        let worklist = InvestigationPrioritizer::confidence_only("fraud_confidence")
            .prioritize(&flagged)
            .unwrap();
        assert_eq!(worklist.claim_ids(), vec!["7", "2", "10"]);
    }

    #[test]
    fn test_non_numeric_cells_contribute_zero() {
        let flagged = table(
            &["claim_id", "fraud_confidence", "region"],
            vec![
                vec![1.0.into(), 0.3.into(), "north".into()],
                vec![2.0.into(), FieldValue::Missing, "south".into()],
            ],
        );

        let worklist = InvestigationPrioritizer::new("fraud_confidence", factors(&[("region", 2.0)]))
            .unwrap()
            .prioritize(&flagged)
            .unwrap();
        assert_eq!(scores(&worklist), vec![0.3, 0.0]);
    }

    #[test]
    fn test_monotone_order_and_input_untouched() {
        let flagged = table(
            &["claim_id", "fraud_confidence", "prior_claims"],
            (0..20)
                .map(|i| {
                    let i = i as f64;
                    vec![i.into(), ((i * 7.0) % 10.0 / 10.0).into(), (i % 3.0).into()]
                })
                .collect(),
        );
        let before = flagged.clone();

        let worklist = InvestigationPrioritizer::new("fraud_confidence", factors(&[("prior_claims", 0.25)]))
            .unwrap()
            .prioritize(&flagged)
            .unwrap();

        assert_eq!(flagged, before);
        assert_eq!(worklist.len(), 20);
        for pair in worklist.entries.windows(2) {
            assert!(pair[0].investigation_score >= pair[1].investigation_score);
        }
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        for weight in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            match InvestigationPrioritizer::new("fraud_confidence", factors(&[("prior_claims", weight)])) {
                Err(TriageError::InvalidParameter(message)) => assert!(message.contains("prior_claims")),
                other => panic!("expected invalid parameter, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_empty_table() {
        let flagged = table(&["claim_id", "fraud_confidence"], Vec::new());
        let worklist = InvestigationPrioritizer::confidence_only("fraud_confidence")
            .prioritize(&flagged)
            .unwrap();
        assert!(worklist.is_empty());
    }
}
