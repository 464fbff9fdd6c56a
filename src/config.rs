//! Configuration management for the claim triage pipeline

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration file read when no path is given
pub const DEFAULT_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub models: ModelsConfig,
    pub prioritization: PrioritizationConfig,
    pub logging: LoggingConfig,
}

/// Claim table column roles
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    /// Column holding the claim identifier
    pub id_column: String,
    /// Column holding the ground-truth fraud label
    pub label_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            id_column: "claim_id".to_string(),
            label_column: "fraud_reported".to_string(),
        }
    }
}

/// Estimator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Seed shared by the train/test split and both estimators
    pub seed: u64,
    /// Fraction of labeled rows held out for the evaluation report
    pub test_fraction: f64,
    /// Expected outlier fraction (isolation forest sensitivity)
    pub contamination: f64,
    /// Trees in the isolation forest
    pub anomaly_trees: usize,
    /// Rows sampled per isolation tree
    pub anomaly_max_samples: usize,
    /// Trees in the random forest classifier
    pub classifier_trees: usize,
    /// Depth limit for classifier trees (unbounded when absent)
    pub classifier_max_depth: Option<usize>,
    /// Minimum node size eligible for a split
    pub classifier_min_samples_split: usize,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            contamination: 0.01,
            anomaly_trees: 100,
            anomaly_max_samples: 256,
            classifier_trees: 100,
            classifier_max_depth: None,
            classifier_min_samples_split: 2,
        }
    }
}

/// Worklist ranking configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PrioritizationConfig {
    /// Column carrying the combined confidence on the annotated table
    pub confidence_column: String,
    /// Additional column -> weight terms added to the investigation score
    pub risk_factors: BTreeMap<String, f64>,
    /// Rows shown by the CLI
    pub top_n: usize,
}

impl Default for PrioritizationConfig {
    fn default() -> Self {
        Self {
            confidence_column: "fraud_confidence".to_string(),
            risk_factors: BTreeMap::new(),
            top_n: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_layered(DEFAULT_PATH, false)
    }

    /// Load configuration from a specific path, with `CLAIM_TRIAGE__*`
    /// environment overrides applied on top.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_layered(path, true)
    }

    /// An optional file that is absent leaves defaults plus environment.
    fn load_layered<P: AsRef<Path>>(path: P, required: bool) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(required))
            .add_source(
                Environment::with_prefix("CLAIM_TRIAGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject parameter values the estimators cannot work with
    pub fn validate(&self) -> Result<()> {
        let models = &self.models;
        if !(models.contamination > 0.0 && models.contamination <= 0.5) {
            bail!(
                "models.contamination must be in (0, 0.5], got {}",
                models.contamination
            );
        }
        if !(models.test_fraction > 0.0 && models.test_fraction < 1.0) {
            bail!(
                "models.test_fraction must be in (0, 1), got {}",
                models.test_fraction
            );
        }
        if models.anomaly_trees == 0 || models.classifier_trees == 0 {
            bail!("tree counts must be positive");
        }
        if models.anomaly_max_samples == 0 {
            bail!("models.anomaly_max_samples must be positive");
        }
        if let Some((name, weight)) = self
            .prioritization
            .risk_factors
            .iter()
            .find(|(_, w)| !w.is_finite())
        {
            bail!("risk factor '{}' has non-finite weight {}", name, weight);
        }
        Ok(())
    }
}
