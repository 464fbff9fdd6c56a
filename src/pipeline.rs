//! End-to-end claim triage: features, both signals, ensemble decision and
//! the ranked investigation worklist.
//!
//! Each run fits its own estimators on the table it is given. The outlier
//! estimator is fitted on the same population it scores, and the classifier's
//! final predictions cover every row, training rows included; only the
//! held-out report is computed on unseen rows. `population_report` therefore
//! overstates classifier quality and is labelled accordingly.

use crate::config::{AppConfig, DataConfig};
use crate::error::{Result, TriageError};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::RunSummary;
use crate::models::aggregator::EnsembleDecision;
use crate::models::anomaly::AnomalySignal;
use crate::models::estimator::{OutlierEstimator, RiskEstimator};
use crate::models::fraud::FraudSignal;
use crate::models::isolation_forest::IsolationForest;
use crate::models::random_forest::RandomForestClassifier;
use crate::models::report::ClassificationReport;
use crate::prioritizer::InvestigationPrioritizer;
use crate::types::claim::{ClaimTable, FieldValue, FraudLabel};
use crate::types::verdict::{CombinedVerdict, Worklist};
use chrono::{DateTime, Utc};
use tracing::{info, info_span};
use uuid::Uuid;

/// Column holding the combined 0/1 flag on the annotated table
pub const PREDICTED_COLUMN: &str = "fraud_predicted";

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct TriageOutcome {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Input claims plus the flag and confidence columns
    pub annotated: ClaimTable,
    /// One decision per input claim, row-aligned
    pub verdicts: Vec<CombinedVerdict>,
    /// Classifier report on the held-out partition
    pub holdout_report: ClassificationReport,
    /// Classifier report over every scored row (includes training rows)
    pub population_report: ClassificationReport,
    pub num_flagged: usize,
    pub worklist: Worklist,
    pub summary: RunSummary,
}

pub struct ClaimTriagePipeline<A, R> {
    data: DataConfig,
    confidence_column: String,
    extractor: FeatureExtractor,
    anomaly: AnomalySignal<A>,
    fraud: FraudSignal<R>,
    ensemble: EnsembleDecision,
    prioritizer: InvestigationPrioritizer,
}

impl ClaimTriagePipeline<IsolationForest, RandomForestClassifier> {
    /// Pipeline with the bundled isolation forest and random forest
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::assemble(
            config,
            AnomalySignal::from_config(&config.models),
            FraudSignal::from_config(&config.models),
        )
    }
}

impl<A: OutlierEstimator, R: RiskEstimator> ClaimTriagePipeline<A, R> {
    /// Pipeline over caller-supplied estimators
    pub fn with_estimators(config: &AppConfig, outlier: A, risk: R) -> Result<Self> {
        Self::assemble(
            config,
            AnomalySignal::new(outlier),
            FraudSignal::new(risk, config.models.test_fraction, config.models.seed),
        )
    }

    fn assemble(
        config: &AppConfig,
        anomaly: AnomalySignal<A>,
        fraud: FraudSignal<R>,
    ) -> Result<Self> {
        let prioritization = &config.prioritization;
        Ok(Self {
            data: config.data.clone(),
            confidence_column: prioritization.confidence_column.clone(),
            extractor: FeatureExtractor::new(&config.data),
            anomaly,
            fraud,
            ensemble: EnsembleDecision::new(),
            prioritizer: InvestigationPrioritizer::new(
                prioritization.confidence_column.clone(),
                prioritization.risk_factors.clone(),
            )?,
        })
    }

    /// Score every claim, flag, and rank the flagged ones.
    ///
    /// Any error aborts the run; no partial outcome is returned.
    pub fn run(&mut self, claims: &ClaimTable) -> Result<TriageOutcome> {
        let run_id = Uuid::new_v4();
        let span = info_span!("triage_run", run_id = %run_id);
        let _guard = span.enter();

        info!(claims = claims.len(), "Starting triage run");

        let labels = claims.labels(&self.data.label_column)?;
        let features = self.extractor.extract(claims)?;
        TriageError::check_rows("feature matrix", claims.len(), features.nrows())?;

        // split validation happens inside train, ahead of any fitting
        let holdout_report = self.fraud.train(&features, &labels)?.clone();
        self.anomaly.fit(&features)?;

        let outliers = self.anomaly.predict(&features)?;
        let risks = self.fraud.predict(&features)?;

        let predicted: Vec<FraudLabel> = risks.iter().map(|r| r.label).collect();
        let population_report = ClassificationReport::compute(&labels, &predicted)?;

        let verdicts = self.ensemble.combine(&outliers, &risks)?;
        TriageError::check_rows("combined verdicts", claims.len(), verdicts.len())?;

        let annotated = claims
            .with_column(
                PREDICTED_COLUMN,
                verdicts
                    .iter()
                    .map(|v| FieldValue::Number(f64::from(v.flag())))
                    .collect(),
            )?
            .with_column(
                &self.confidence_column,
                verdicts.iter().map(|v| FieldValue::Number(v.confidence)).collect(),
            )?;

        let flagged = annotated.filter_rows(|i, _| verdicts[i].flagged);
        let num_flagged = flagged.len();
        let worklist = self.prioritizer.prioritize(&flagged)?;
        let summary = RunSummary::from_verdicts(&verdicts);

        info!(
            flagged = num_flagged,
            "Flagged {} potentially fraudulent claims after combining models", num_flagged
        );

        Ok(TriageOutcome {
            run_id,
            generated_at: Utc::now(),
            annotated,
            verdicts,
            holdout_report,
            population_report,
            num_flagged,
            worklist,
            summary,
        })
    }
}

/// Run the default pipeline on `claims` with fresh estimators.
pub fn process_claims(claims: &ClaimTable, config: &AppConfig) -> Result<TriageOutcome> {
    ClaimTriagePipeline::from_config(config)?.run(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::estimator::Polarity;
    use ndarray::{Array2, ArrayView2};

    /// Outlier when the first feature exceeds 5000
    #[derive(Default)]
    struct AmountOutlier {
        fitted: bool,
    }

    impl OutlierEstimator for AmountOutlier {
        fn fit(&mut self, _features: ArrayView2<'_, f64>) -> Result<()> {
            self.fitted = true;
            Ok(())
        }

        fn score(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
            Ok(features
                .rows()
                .into_iter()
                .map(|r| if r[0] > 5000.0 { 1.0 } else { -1.0 })
                .collect())
        }

        fn polarity(&self) -> Polarity {
            Polarity::PositiveIsOutlier
        }
    }

    /// Fraud when the second feature is at least 3; probability is value / 10
    #[derive(Default)]
    struct PriorClaimsRisk {
        fitted: bool,
        with_proba: bool,
    }

    impl RiskEstimator for PriorClaimsRisk {
        fn fit(&mut self, _features: ArrayView2<'_, f64>, _labels: &[FraudLabel]) -> Result<()> {
            self.fitted = true;
            Ok(())
        }

        fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<FraudLabel>> {
            Ok(features
                .rows()
                .into_iter()
                .map(|r| FraudLabel::from_flag(r[1] >= 3.0))
                .collect())
        }

        fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>> {
            if !self.with_proba {
                return Ok(None);
            }
            Ok(Some(Array2::from_shape_fn((features.nrows(), 2), |(i, j)| {
                let p = features[[i, 1]] / 10.0;
                if j == 1 {
                    p
                } else {
                    1.0 - p
                }
            })))
        }
    }

    fn claims() -> ClaimTable {
        let amounts = [100.0, 200.0, 9000.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0, 900.0];
        let priors = [0.0, 0.0, 0.0, 4.0, 5.0, 1.0, 0.0, 3.0, 0.0, 0.0];
        let rows = (0..10)
            .map(|i| {
                let label = if priors[i] >= 3.0 { "Y" } else { "N" };
                vec![
                    FieldValue::Number((i + 1) as f64),
                    FieldValue::Number(amounts[i]),
                    FieldValue::Number(priors[i]),
                    FieldValue::Text(label.to_string()),
                ]
            })
            .collect();
        ClaimTable::new(
            vec![
                "claim_id".to_string(),
                "claim_amount".to_string(),
                "prior_claims".to_string(),
                "fraud_reported".to_string(),
            ],
            rows,
            "claim_id",
        )
        .unwrap()
    }

    fn pipeline(with_proba: bool) -> ClaimTriagePipeline<AmountOutlier, PriorClaimsRisk> {
        let mut config = AppConfig::default();
        config
            .prioritization
            .risk_factors
            .insert("prior_claims".to_string(), 0.05);
        ClaimTriagePipeline::with_estimators(
            &config,
            AmountOutlier::default(),
            PriorClaimsRisk {
                fitted: false,
                with_proba,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_run_flags_and_ranks() {
        let claims = claims();
        let outcome = pipeline(true).run(&claims).unwrap();

        assert_eq!(outcome.verdicts.len(), claims.len());
        assert_eq!(outcome.num_flagged, 4);
        assert_eq!(outcome.worklist.claim_ids(), vec!["5", "4", "8", "3"]);

        let scores: Vec<f64> = outcome.worklist.entries.iter().map(|e| e.investigation_score).collect();
        for (score, expected) in scores.iter().zip([0.75, 0.6, 0.45, 0.0]) {
            assert!((score - expected).abs() < 1e-9);
        }

        assert_eq!(outcome.summary.flagged_by_outlier_only, 1);
        assert_eq!(outcome.summary.flagged_by_risk_only, 3);
        assert_eq!(outcome.population_report.accuracy, 1.0);
    }

    #[test]
    fn test_annotated_table_is_row_aligned() {
        let claims = claims();
        let outcome = pipeline(true).run(&claims).unwrap();

        let flags: Vec<f64> = outcome
            .annotated
            .column(PREDICTED_COLUMN)
            .unwrap()
            .into_iter()
            .map(|v| v.as_number().unwrap())
            .collect();
        assert_eq!(flags, vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

        let confidence = outcome.annotated.column("fraud_confidence").unwrap();
        assert_eq!(confidence[4].as_number(), Some(0.5));
        assert_eq!(outcome.annotated.records()[2].claim_id, "3");
        // input untouched
        assert!(!claims.has_column(PREDICTED_COLUMN));
    }

    #[test]
    fn test_without_probabilities_confidence_is_zero() {
        let outcome = pipeline(false).run(&claims()).unwrap();

        assert!(outcome.verdicts.iter().all(|v| v.confidence == 0.0));
        assert_eq!(outcome.num_flagged, 4);
        // ranking falls back to the risk factors
        assert_eq!(outcome.worklist.claim_ids(), vec!["5", "4", "8", "3"]);
        let scores: Vec<f64> = outcome.worklist.entries.iter().map(|e| e.investigation_score).collect();
        for (score, expected) in scores.iter().zip([0.25, 0.2, 0.15, 0.0]) {
            assert!((score - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_non_finite_weight_rejected_at_construction() {
        let mut config = AppConfig::default();
        config
            .prioritization
            .risk_factors
            .insert("prior_claims".to_string(), f64::NAN);

        assert!(matches!(
            ClaimTriagePipeline::with_estimators(
                &config,
                AmountOutlier::default(),
                PriorClaimsRisk::default()
            ),
            Err(TriageError::InvalidParameter(_))
        ));
        assert!(matches!(
            process_claims(&claims(), &config),
            Err(TriageError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_label_column_fails_before_fitting() {
        let claims = claims();
        let columns: Vec<String> = claims.columns()[..3].to_vec();
        let rows = claims
            .records()
            .iter()
            .map(|r| r.values[..3].to_vec())
            .collect();
        let unlabeled = ClaimTable::new(columns, rows, "claim_id").unwrap();

        let mut pipeline = pipeline(true);
        match pipeline.run(&unlabeled) {
            Err(TriageError::MissingColumn { column }) => assert_eq!(column, "fraud_reported"),
            other => panic!("expected missing column, got {:?}", other.map(|o| o.num_flagged)),
        }
        assert!(!pipeline.anomaly.estimator().fitted);
        assert!(!pipeline.fraud.estimator().fitted);
    }

    #[test]
    fn test_single_fraud_row_is_insufficient() {
        let claims = claims();
        let relabeled = claims
            .with_column(
                "fraud_reported",
                (0..claims.len())
                    .map(|i| FieldValue::Text(if i == 3 { "Y" } else { "N" }.to_string()))
                    .collect(),
            )
            .unwrap();

        let mut pipeline = pipeline(true);
        assert!(matches!(
            pipeline.run(&relabeled),
            Err(TriageError::InsufficientData(_))
        ));
        assert!(!pipeline.fraud.estimator().fitted);
        assert!(!pipeline.anomaly.estimator().fitted);
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let claims = claims();
        let mut pipeline = pipeline(true);
        let first = pipeline.run(&claims).unwrap();
        let second = pipeline.run(&claims).unwrap();

        assert_eq!(first.verdicts, second.verdicts);
        assert_eq!(first.worklist, second.worklist);
        assert_ne!(first.run_id, second.run_id);
    }
}
