//! Fraud signal: owns the supervised risk estimator's lifecycle.
//!
//! Training holds out a seeded, stratified evaluation partition and keeps the
//! classification report computed on it. Prediction maps the estimator's
//! output onto per-claim `RiskVerdict`s.

use crate::config::ModelsConfig;
use crate::error::{Result, TriageError};
use crate::feature_extractor::FeatureMatrix;
use crate::models::estimator::RiskEstimator;
use crate::models::random_forest::{RandomForestClassifier, RandomForestParams};
use crate::models::report::ClassificationReport;
use crate::types::claim::FraudLabel;
use crate::types::verdict::RiskVerdict;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

/// Row indices of the training and evaluation partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Per class, `round(test_fraction * n)` rows (at least one, never all)
    /// go to the evaluation partition after a seeded shuffle.
    ///
    /// Every class needs two rows so that it appears in both partitions.
    pub fn stratified(labels: &[FraudLabel], test_fraction: f64, seed: u64) -> Result<Self> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TriageError::InvalidParameter(format!(
                "test fraction must be in (0, 1), got {}",
                test_fraction
            )));
        }
        if labels.len() < 2 {
            return Err(TriageError::InsufficientData(format!(
                "{} labeled rows cannot be split into training and evaluation partitions",
                labels.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut train = Vec::new();
        let mut test = Vec::new();

        for class in [FraudLabel::NotFraud, FraudLabel::Fraud] {
            let mut rows: Vec<usize> = labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == class)
                .map(|(i, _)| i)
                .collect();
            if rows.len() < 2 {
                return Err(TriageError::InsufficientData(format!(
                    "class '{}' has {} labeled rows, at least 2 are needed",
                    class,
                    rows.len()
                )));
            }

            rows.shuffle(&mut rng);
            let n_test = ((test_fraction * rows.len() as f64).round() as usize).clamp(1, rows.len() - 1);
            test.extend_from_slice(&rows[..n_test]);
            train.extend_from_slice(&rows[n_test..]);
        }

        train.sort_unstable();
        test.sort_unstable();
        Ok(Self { train, test })
    }
}

pub struct FraudSignal<E> {
    estimator: E,
    test_fraction: f64,
    seed: u64,
    report: Option<ClassificationReport>,
}

impl FraudSignal<RandomForestClassifier> {
    /// Random-forest backed signal configured from `models`
    pub fn from_config(models: &ModelsConfig) -> Self {
        let estimator = RandomForestClassifier::new(RandomForestParams {
            n_estimators: models.classifier_trees,
            max_depth: models.classifier_max_depth,
            min_samples_split: models.classifier_min_samples_split,
            seed: models.seed,
        });
        Self::new(estimator, models.test_fraction, models.seed)
    }
}

impl<E: RiskEstimator> FraudSignal<E> {
    pub fn new(estimator: E, test_fraction: f64, seed: u64) -> Self {
        Self {
            estimator,
            test_fraction,
            seed,
            report: None,
        }
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Report from the most recent `train`
    pub fn report(&self) -> Option<&ClassificationReport> {
        self.report.as_ref()
    }

    /// Split, fit on the training partition, evaluate on the held-out one.
    ///
    /// The split is validated before the estimator is touched.
    pub fn train(
        &mut self,
        features: &FeatureMatrix,
        labels: &[FraudLabel],
    ) -> Result<&ClassificationReport> {
        TriageError::check_rows("training labels", features.nrows(), labels.len())?;
        let split = TrainTestSplit::stratified(labels, self.test_fraction, self.seed)?;

        let train_x = features.select_rows(&split.train);
        let train_y: Vec<FraudLabel> = split.train.iter().map(|&i| labels[i]).collect();
        self.estimator.fit(train_x.view(), &train_y)?;

        let test_x = features.select_rows(&split.test);
        let test_y: Vec<FraudLabel> = split.test.iter().map(|&i| labels[i]).collect();
        let predicted = self.estimator.predict(test_x.view())?;
        TriageError::check_rows("evaluation predictions", test_y.len(), predicted.len())?;

        let report = ClassificationReport::compute(&test_y, &predicted)?;
        info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            accuracy = report.accuracy,
            "Model evaluation:\n{}",
            report
        );

        Ok(&*self.report.insert(report))
    }

    /// One `RiskVerdict` per feature row.
    ///
    /// Confidence is the fraud-class probability; a single probability column
    /// is used as-is, and without probability output confidence is 0.0.
    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<RiskVerdict>> {
        let rows = features.nrows();
        let labels = self.estimator.predict(features.view())?;
        TriageError::check_rows("risk predictions", rows, labels.len())?;

        let confidence: Vec<f64> = match self.estimator.predict_proba(features.view())? {
            Some(proba) if proba.ncols() > 0 => {
                TriageError::check_rows("risk probabilities", rows, proba.nrows())?;
                let column = if proba.ncols() > 1 { 1 } else { 0 };
                proba.column(column).to_vec()
            }
            _ => {
                debug!("Risk estimator has no probability output, confidence defaults to 0.0");
                vec![0.0; rows]
            }
        };

        Ok(labels
            .into_iter()
            .zip(confidence)
            .map(|(label, confidence)| RiskVerdict::new(label, confidence))
            .collect())
    }
}
