//! Random forest risk classifier
//!
//! Bootstrap-aggregated CART trees split on Gini impurity, `sqrt(d)` candidate
//! features per node. Class probabilities are the mean of the leaf class
//! distributions across trees.

use crate::error::{Result, TriageError};
use crate::models::estimator::RiskEstimator;
use crate::types::claim::FraudLabel;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use tracing::debug;

/// Random forest hyper-parameters
#[derive(Debug, Clone)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        proba: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf_proba(&self, row: ArrayView1<'_, f64>) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { proba } => return proba,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Best split found for one node
struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Shared state while growing one tree
struct TreeBuilder<'d, 't> {
    data: ArrayView2<'d, f64>,
    targets: &'t [usize],
    n_classes: usize,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_, '_> {
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let counts = self.class_counts(&indices);
        let total = indices.len() as f64;
        let slot = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            proba: counts.iter().map(|&c| c as f64 / total).collect(),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.map_or(false, |max| depth >= max);
        if pure || depth_reached || indices.len() < self.min_samples_split {
            return slot;
        }

        let Some(best) = self.best_split(&indices, rng) else {
            return slot;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.data[[i, best.feature]] <= best.threshold);

        let left = self.grow(left_rows, depth + 1, rng);
        let right = self.grow(right_rows, depth + 1, rng);
        self.nodes[slot] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        slot
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.targets[i]] += 1;
        }
        counts
    }

    /// Visit features in random order until `max_features` non-constant ones
    /// have been evaluated.
    fn best_split(&self, indices: &[usize], rng: &mut StdRng) -> Option<Candidate> {
        let mut features: Vec<usize> = (0..self.data.ncols()).collect();
        features.shuffle(rng);

        let mut best: Option<Candidate> = None;
        let mut visited = 0;
        for feature in features {
            if visited >= self.max_features {
                break;
            }
            let Some(candidate) = self.best_threshold(indices, feature) else {
                continue;
            };
            visited += 1;
            if best.as_ref().map_or(true, |b| candidate.impurity < b.impurity) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Lowest weighted Gini split on one feature, `None` when it is constant
    fn best_threshold(&self, indices: &[usize], feature: usize) -> Option<Candidate> {
        let mut pairs: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.data[[i, feature]], self.targets[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let mut right = self.class_counts(indices);
        let mut left = vec![0usize; self.n_classes];
        let mut best: Option<Candidate> = None;

        for k in 0..n - 1 {
            let class = pairs[k].1;
            left[class] += 1;
            right[class] -= 1;

            let (lo, hi) = (pairs[k].0, pairs[k + 1].0);
            if lo >= hi {
                continue;
            }

            let n_left = k + 1;
            let n_right = n - n_left;
            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / n as f64;

            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mid = lo / 2.0 + hi / 2.0;
                let threshold = if mid < hi { mid } else { lo };
                best = Some(Candidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
        best
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

/// Random forest classifier over fraud labels
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    params: RandomForestParams,
    trees: Vec<DecisionTree>,
    classes: Vec<FraudLabel>,
    n_features: usize,
}

impl RandomForestClassifier {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
        }
    }

    /// Classes seen during fitting, in probability-column order
    pub fn classes(&self) -> &[FraudLabel] {
        &self.classes
    }

    fn mean_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(TriageError::Estimator(
                "random forest is not fitted".to_string(),
            ));
        }
        TriageError::check_rows("random forest feature columns", self.n_features, features.ncols())?;

        let mut proba = Array2::<f64>::zeros((features.nrows(), self.classes.len()));
        for (i, row) in features.rows().into_iter().enumerate() {
            for tree in &self.trees {
                for (c, p) in tree.leaf_proba(row).iter().enumerate() {
                    proba[[i, c]] += p;
                }
            }
        }
        proba /= self.trees.len() as f64;
        Ok(proba)
    }
}

impl RiskEstimator for RandomForestClassifier {
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[FraudLabel]) -> Result<()> {
        TriageError::check_rows("random forest labels", features.nrows(), labels.len())?;
        if labels.is_empty() {
            return Err(TriageError::InsufficientData(
                "random forest needs at least one labeled row".to_string(),
            ));
        }
        if self.params.n_estimators == 0 || self.params.min_samples_split < 2 {
            return Err(TriageError::InvalidParameter(
                "random forest needs n_estimators >= 1 and min_samples_split >= 2".to_string(),
            ));
        }

        self.classes = labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| self.classes.iter().position(|c| c == l).unwrap_or(0))
            .collect();
        self.n_features = features.ncols();

        let rows = labels.len();
        let max_features = ((self.n_features as f64).sqrt() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..rows).map(|_| rng.gen_range(0..rows)).collect();
                let mut builder = TreeBuilder {
                    data: features,
                    targets: &targets,
                    n_classes: self.classes.len(),
                    max_features,
                    max_depth: self.params.max_depth,
                    min_samples_split: self.params.min_samples_split,
                    nodes: Vec::new(),
                };
                builder.grow(bootstrap, 0, &mut rng);
                DecisionTree {
                    nodes: builder.nodes,
                }
            })
            .collect();

        debug!(
            trees = self.trees.len(),
            classes = self.classes.len(),
            max_features = max_features,
            "Random forest fitted"
        );
        Ok(())
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<FraudLabel>> {
        let proba = self.mean_proba(features)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (c, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = c;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>> {
        self.mean_proba(features).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Array2<f64>, Vec<FraudLabel>) {
        let rows = 20;
        let data = Array2::from_shape_fn((rows, 2), |(i, j)| {
            if j == 0 {
                i as f64
            } else {
                (i % 3) as f64
            }
        });
        let labels = (0..rows).map(|i| FraudLabel::from_flag(i >= 10)).collect();
        (data, labels)
    }

    fn small_forest() -> RandomForestClassifier {
        RandomForestClassifier::new(RandomForestParams {
            n_estimators: 25,
            ..Default::default()
        })
    }

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[5, 0], 5), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_learns_separable_data() {
        let (data, labels) = separable();
        let mut forest = small_forest();
        forest.fit(data.view(), &labels).unwrap();

        assert_eq!(forest.classes(), &[FraudLabel::NotFraud, FraudLabel::Fraud]);
        let predicted = forest.predict(data.view()).unwrap();
        assert_eq!(predicted[0], FraudLabel::NotFraud);
        assert_eq!(predicted[19], FraudLabel::Fraud);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (data, labels) = separable();
        let mut forest = small_forest();
        forest.fit(data.view(), &labels).unwrap();

        let proba = forest.predict_proba(data.view()).unwrap().unwrap();
        assert_eq!(proba.dim(), (20, 2));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_class_gives_single_column() {
        let (data, _) = separable();
        let labels = vec![FraudLabel::NotFraud; 20];
        let mut forest = small_forest();
        forest.fit(data.view(), &labels).unwrap();

        let proba = forest.predict_proba(data.view()).unwrap().unwrap();
        assert_eq!(proba.ncols(), 1);
        assert!(proba.iter().all(|&p| (p - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (data, labels) = separable();
        let mut a = small_forest();
        let mut b = small_forest();
        a.fit(data.view(), &labels).unwrap();
        b.fit(data.view(), &labels).unwrap();

        assert_eq!(
            a.predict_proba(data.view()).unwrap(),
            b.predict_proba(data.view()).unwrap()
        );
    }

    #[test]
    fn test_label_length_mismatch() {
        let (data, labels) = separable();
        let mut forest = small_forest();
        assert!(matches!(
            forest.fit(data.view(), &labels[..5]),
            Err(TriageError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_unfitted_predict() {
        let (data, _) = separable();
        assert!(matches!(
            small_forest().predict(data.view()),
            Err(TriageError::Estimator(_))
        ));
    }
}
