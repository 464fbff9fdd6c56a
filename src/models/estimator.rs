//! Estimator capabilities consumed by the signal adapters.
//!
//! The adapters depend only on these traits; the bundled forests are one
//! implementation, test doubles and external models are others.

use crate::error::Result;
use crate::types::claim::FraudLabel;
use ndarray::{Array2, ArrayView2};

/// Sign convention of an outlier estimator's raw per-row output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// Negative values are outliers, non-negative are inliers
    NegativeIsOutlier,
    /// Positive values are outliers, non-positive are inliers
    PositiveIsOutlier,
}

impl Polarity {
    pub fn is_outlier(self, raw: f64) -> bool {
        match self {
            Polarity::NegativeIsOutlier => raw < 0.0,
            Polarity::PositiveIsOutlier => raw > 0.0,
        }
    }
}

/// Unsupervised outlier detector
pub trait OutlierEstimator {
    /// Fit on an unlabeled feature matrix
    fn fit(&mut self, features: ArrayView2<'_, f64>) -> Result<()>;

    /// Raw per-row output; interpret with `polarity`
    fn score(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>>;

    fn polarity(&self) -> Polarity {
        Polarity::NegativeIsOutlier
    }
}

/// Supervised fraud / not-fraud classifier
pub trait RiskEstimator {
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[FraudLabel]) -> Result<()>;

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<FraudLabel>>;

    /// Per-class probabilities, one row per input row, columns in the sorted
    /// order of the classes seen during fitting (`NotFraud`, then `Fraud`).
    ///
    /// `Ok(None)` means the estimator has no probability output.
    fn predict_proba(&self, _features: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>> {
        Ok(None)
    }
}
