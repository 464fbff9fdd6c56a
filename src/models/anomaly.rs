//! Anomaly signal: owns the outlier estimator and turns its raw output into
//! per-claim outlier flags.

use crate::config::ModelsConfig;
use crate::error::{Result, TriageError};
use crate::feature_extractor::FeatureMatrix;
use crate::models::estimator::OutlierEstimator;
use crate::models::isolation_forest::{IsolationForest, IsolationForestParams};
use crate::types::verdict::OutlierVerdict;
use tracing::{debug, info};

pub struct AnomalySignal<E> {
    estimator: E,
}

impl AnomalySignal<IsolationForest> {
    /// Isolation-forest backed signal configured from `models`
    pub fn from_config(models: &ModelsConfig) -> Self {
        Self::new(IsolationForest::new(IsolationForestParams {
            n_estimators: models.anomaly_trees,
            max_samples: models.anomaly_max_samples,
            contamination: models.contamination,
            seed: models.seed,
        }))
    }
}

impl<E: OutlierEstimator> AnomalySignal<E> {
    pub fn new(estimator: E) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Fit on the full unlabeled feature matrix
    pub fn fit(&mut self, features: &FeatureMatrix) -> Result<()> {
        self.estimator.fit(features.view())?;
        debug!(rows = features.nrows(), "Anomaly estimator fitted");
        Ok(())
    }

    /// One outlier flag per feature row
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<OutlierVerdict>> {
        let raw = self.estimator.score(features.view())?;
        TriageError::check_rows("outlier scores", features.nrows(), raw.len())?;

        let polarity = self.estimator.polarity();
        let verdicts: Vec<OutlierVerdict> = raw
            .into_iter()
            .map(|value| OutlierVerdict::new(polarity.is_outlier(value)))
            .collect();

        info!(
            rows = verdicts.len(),
            outliers = verdicts.iter().filter(|v| v.is_outlier).count(),
            "Anomaly signal scored"
        );
        Ok(verdicts)
    }
}
