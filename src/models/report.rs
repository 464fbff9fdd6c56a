//! Classification report for the risk classifier

use crate::error::{Result, TriageError};
use crate::types::claim::FraudLabel;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Precision / recall / F1 for one class (or an average)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics plus overall accuracy.
///
/// Classes are those present in either the truth or the predictions.
/// Undefined ratios (no predictions / no support) are reported as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: BTreeMap<FraudLabel, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ClassificationReport {
    pub fn compute(truth: &[FraudLabel], predicted: &[FraudLabel]) -> Result<Self> {
        TriageError::check_rows("classification report", truth.len(), predicted.len())?;
        if truth.is_empty() {
            return Err(TriageError::InsufficientData(
                "cannot evaluate an empty partition".to_string(),
            ));
        }

        let labels: Vec<FraudLabel> = truth
            .iter()
            .chain(predicted)
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut classes = BTreeMap::new();
        for &label in &labels {
            let mut tp = 0;
            let mut predicted_pos = 0;
            let mut support = 0;
            for (&t, &p) in truth.iter().zip(predicted) {
                if p == label {
                    predicted_pos += 1;
                }
                if t == label {
                    support += 1;
                    if p == label {
                        tp += 1;
                    }
                }
            }

            let precision = ratio(tp, predicted_pos);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            classes.insert(
                label,
                ClassMetrics {
                    precision,
                    recall,
                    f1,
                    support,
                },
            );
        }

        let total = truth.len();
        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
        let n = classes.len() as f64;

        let macro_avg = ClassMetrics {
            precision: classes.values().map(|m| m.precision).sum::<f64>() / n,
            recall: classes.values().map(|m| m.recall).sum::<f64>() / n,
            f1: classes.values().map(|m| m.f1).sum::<f64>() / n,
            support: total,
        };
        let weight = |f: fn(&ClassMetrics) -> f64| {
            classes.values().map(|m| f(m) * m.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = ClassMetrics {
            precision: weight(|m| m.precision),
            recall: weight(|m| m.recall),
            f1: weight(|m| m.f1),
            support: total,
        };

        Ok(Self {
            classes,
            accuracy: ratio(correct, total),
            macro_avg,
            weighted_avg,
        })
    }

    pub fn class(&self, label: FraudLabel) -> Option<&ClassMetrics> {
        self.classes.get(&label)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (label, m) in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label.to_string(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}
