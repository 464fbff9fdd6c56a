//! Estimators, the two scoring signals and the ensemble decision

pub mod aggregator;
pub mod anomaly;
pub mod estimator;
pub mod fraud;
pub mod isolation_forest;
pub mod random_forest;
pub mod report;

pub use aggregator::EnsembleDecision;
pub use anomaly::AnomalySignal;
pub use estimator::{OutlierEstimator, Polarity, RiskEstimator};
pub use fraud::{FraudSignal, TrainTestSplit};
pub use isolation_forest::{IsolationForest, IsolationForestParams};
pub use random_forest::{RandomForestClassifier, RandomForestParams};
pub use report::{ClassMetrics, ClassificationReport};
