//! Claim Triage Library
//!
//! Batch fraud screening for insurance claims: an unsupervised outlier
//! detector and a supervised classifier are combined with a logical OR, and
//! the flagged claims are ranked into an investigation worklist.

pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod prioritizer;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, TriageError};
pub use feature_extractor::{FeatureExtractor, FeatureMatrix};
pub use ingest::{load_claims, read_claims};
pub use pipeline::{process_claims, ClaimTriagePipeline, TriageOutcome};
pub use prioritizer::InvestigationPrioritizer;
pub use types::{ClaimTable, CombinedVerdict, FraudLabel, Worklist};
