//! Feature extraction for claim scoring.
//!
//! Turns a `ClaimTable` into the numeric matrix both estimators consume:
//! missing values are imputed, text columns are one-hot encoded and a couple
//! of ratio/count features are derived. Row `i` of the matrix is always row
//! `i` of the source table.

use crate::config::DataConfig;
use crate::error::{Result, TriageError};
use crate::types::claim::{ClaimTable, FieldValue};
use ndarray::{Array2, ArrayView2, Axis};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const CLAIM_AMOUNT: &str = "claim_amount";
const POLICY_AMOUNT: &str = "policy_amount";
const CLAIMANT_ID: &str = "claimant_id";

/// Numeric feature matrix with named columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        TriageError::check_rows("feature names", values.ncols(), names.len())?;
        Ok(Self { names, values })
    }

    /// Build from row vectors, naming columns `f0..fn`
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        for row in rows {
            TriageError::check_rows("feature row width", width, row.len())?;
        }
        let values = Array2::from_shape_fn((rows.len(), width), |(i, j)| rows[i][j]);
        let names = (0..width).map(|j| format!("f{}", j)).collect();
        Ok(Self { names, values })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Rows at `indices`, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }
}

/// Feature extractor that transforms claim tables into model input features.
pub struct FeatureExtractor {
    id_column: String,
    label_column: String,
}

impl FeatureExtractor {
    pub fn new(data: &DataConfig) -> Self {
        Self {
            id_column: data.id_column.clone(),
            label_column: data.label_column.clone(),
        }
    }

    /// Extract features from every row of `table`.
    ///
    /// Identity and label columns never become features.
    pub fn extract(&self, table: &ClaimTable) -> Result<FeatureMatrix> {
        let mut columns: Vec<(String, Vec<f64>)> = Vec::new();
        let mut numeric: HashMap<&str, usize> = HashMap::new();

        for name in table.columns() {
            if *name == self.id_column || *name == self.label_column {
                continue;
            }
            let cells = table.column(name).unwrap_or_default();

            if cells.iter().any(|c| matches!(c, FieldValue::Text(_))) {
                columns.extend(one_hot(name, &cells));
            } else {
                numeric.insert(name.as_str(), columns.len());
                columns.push((name.clone(), impute_median(&cells)));
            }
        }

        // claim_policy_ratio
        if let (Some(&claim), Some(&policy)) = (numeric.get(CLAIM_AMOUNT), numeric.get(POLICY_AMOUNT))
        {
            let ratio = columns[claim]
                .1
                .iter()
                .zip(&columns[policy].1)
                .map(|(c, p)| finite_or_zero(c / (p + 1e-5)))
                .collect();
            columns.push(("claim_policy_ratio".to_string(), ratio));
        }

        // claimant_claim_count
        if let Some(cells) = table.column(CLAIMANT_ID) {
            // rows without a claimant count as 0
            let keys: Vec<Option<String>> = cells
                .iter()
                .map(|c| (!c.is_missing()).then(|| c.to_string()))
                .collect();
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for key in keys.iter().flatten() {
                *counts.entry(key.as_str()).or_insert(0) += 1;
            }
            let per_row = keys
                .iter()
                .map(|k| k.as_deref().map_or(0.0, |k| counts[k] as f64))
                .collect();
            columns.push(("claimant_claim_count".to_string(), per_row));
        }

        if columns.is_empty() {
            return Err(TriageError::InsufficientData(
                "claim table has no usable feature columns".to_string(),
            ));
        }

        let rows = table.len();
        let values = Array2::from_shape_fn((rows, columns.len()), |(i, j)| columns[j].1[i]);
        let names: Vec<String> = columns.into_iter().map(|(name, _)| name).collect();

        debug!(rows = rows, features = names.len(), "Features extracted");

        FeatureMatrix::new(names, values)
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Fill missing numeric cells with the column median (0 when nothing is present)
fn impute_median(cells: &[&FieldValue]) -> Vec<f64> {
    let mut present: Vec<f64> = cells.iter().filter_map(|c| c.as_number()).collect();
    present.sort_by(|a, b| a.total_cmp(b));

    let median = match present.len() {
        0 => 0.0,
        n if n % 2 == 0 => present[n / 2 - 1] / 2.0 + present[n / 2] / 2.0,
        n => present[n / 2],
    };

    cells
        .iter()
        .map(|c| c.as_number().unwrap_or(median))
        .collect()
}

/// Mode-impute then one-hot encode, dropping the first (sorted) category
fn one_hot(name: &str, cells: &[&FieldValue]) -> Vec<(String, Vec<f64>)> {
    let texts: Vec<Option<String>> = cells
        .iter()
        .map(|c| (!c.is_missing()).then(|| c.to_string()))
        .collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for text in texts.iter().flatten() {
        *counts.entry(text.as_str()).or_insert(0) += 1;
    }
    // ties resolve to the lexicographically smallest category
    let mut mode: Option<(&str, usize)> = None;
    for (&category, &count) in &counts {
        if mode.map_or(true, |(_, best)| count > best) {
            mode = Some((category, count));
        }
    }
    let Some((mode, _)) = mode else {
        return Vec::new();
    };

    let filled: Vec<&str> = texts
        .iter()
        .map(|t| t.as_deref().unwrap_or(mode))
        .collect();
    let categories: BTreeSet<&str> = filled.iter().copied().collect();

    categories
        .into_iter()
        .skip(1)
        .map(|category| {
            let indicator = filled
                .iter()
                .map(|&v| if v == category { 1.0 } else { 0.0 })
                .collect();
            (format!("{}_{}", name, category), indicator)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(&DataConfig::default())
    }

    fn claims() -> ClaimTable {
        let columns = [
            "claim_id",
            "claimant_id",
            "claim_amount",
            "policy_amount",
            "claim_type",
            "fraud_reported",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        ClaimTable::new(
            columns,
            vec![
                vec![1.0.into(), 1001.0.into(), 5000.0.into(), 10000.0.into(), "Theft".into(), "Y".into()],
                vec![2.0.into(), 1002.0.into(), FieldValue::Missing, 15000.0.into(), FieldValue::Missing, "N".into()],
                vec![3.0.into(), 1001.0.into(), 1000.0.into(), 10000.0.into(), "Fire".into(), "N".into()],
            ],
            "claim_id",
        )
        .unwrap()
    }

    #[test]
    fn test_feature_extraction() {
        let features = extractor().extract(&claims()).unwrap();

        assert_eq!(features.nrows(), 3);
        assert_eq!(
            features.names(),
            &[
                "claimant_id",
                "claim_amount",
                "policy_amount",
                "claim_type_Theft",
                "claim_policy_ratio",
                "claimant_claim_count",
            ]
        );
    }

    #[test]
    fn test_missing_values_imputed() {
        let features = extractor().extract(&claims()).unwrap();
        let view = features.view();

        // median of 5000 and 1000
        assert_eq!(view[[1, 1]], 3000.0);
        // mode tie (Fire, Theft) resolves to Fire -> Theft indicator 0
        assert_eq!(view[[1, 3]], 0.0);
        assert!(view.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_engineered_features() {
        let features = extractor().extract(&claims()).unwrap();
        let view = features.view();

        assert!((view[[0, 4]] - 5000.0 / (10000.0 + 1e-5)).abs() < 1e-9);
        assert_eq!(view[[0, 5]], 2.0);
        assert_eq!(view[[1, 5]], 1.0);
    }

    #[test]
    fn test_missing_claimant_counts_zero() {
        let table = ClaimTable::new(
            vec!["claim_id".to_string(), "claimant_id".to_string()],
            vec![
                vec![1.0.into(), FieldValue::Missing],
                vec![2.0.into(), FieldValue::Missing],
                vec![3.0.into(), "C7".into()],
            ],
            "claim_id",
        )
        .unwrap();

        let features = extractor().extract(&table).unwrap();
        let counts: Vec<f64> = features.view().column(features.ncols() - 1).to_vec();
        assert_eq!(counts, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_extreme_values_stay_finite() {
        let table = ClaimTable::new(
            vec!["claim_id".to_string(), "claim_amount".to_string()],
            vec![
                vec![1.0.into(), 1e308.into()],
                vec![2.0.into(), f64::MAX.into()],
                vec![3.0.into(), FieldValue::Missing],
            ],
            "claim_id",
        )
        .unwrap();

        let features = extractor().extract(&table).unwrap();
        assert!(features.view().iter().all(|v| v.is_finite()));
        assert!(features.view()[[2, 0]] > 1e308);
    }

    #[test]
    fn test_ratio_skipped_without_policy_amount() {
        let table = ClaimTable::new(
            vec!["claim_id".to_string(), "claim_amount".to_string()],
            vec![vec![1.0.into(), 10.0.into()]],
            "claim_id",
        )
        .unwrap();

        let features = extractor().extract(&table).unwrap();
        assert_eq!(features.names(), &["claim_amount"]);
    }

    #[test]
    fn test_no_features_is_insufficient_data() {
        let table = ClaimTable::new(
            vec!["claim_id".to_string(), "fraud_reported".to_string()],
            vec![vec![1.0.into(), "Y".into()]],
            "claim_id",
        )
        .unwrap();

        assert!(matches!(
            extractor().extract(&table),
            Err(TriageError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_select_rows() {
        let features = FeatureMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let picked = features.select_rows(&[2, 0]);
        assert_eq!(picked.view()[[0, 0]], 3.0);
        assert_eq!(picked.view()[[1, 0]], 1.0);
    }
}
