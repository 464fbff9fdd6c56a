//! Isolation forest outlier estimator
//!
//! Anomaly score is `2^(-E[h(x)] / c(psi))`, where `h` is the isolation path
//! length and `c` the average unsuccessful-search length of a BST over `psi`
//! samples. The decision value is `-score - offset`, with `offset` placed at the
//! contamination percentile of the fitted data, so negative means outlier.

use crate::error::{Result, TriageError};
use crate::models::estimator::{OutlierEstimator, Polarity};
use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest hyper-parameters
#[derive(Debug, Clone)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    /// Expected outlier fraction
    pub contamination: f64,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.01,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(data: ArrayView2<'_, f64>, indices: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        let mut nodes = Vec::new();
        grow(data, indices, 0, height_limit, rng, &mut nodes);
        Self { nodes }
    }

    fn path_length(&self, row: ndarray::ArrayView1<'_, f64>) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Grow a subtree over `indices`; returns the index of its root node
fn grow(
    data: ArrayView2<'_, f64>,
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
    nodes: &mut Vec<Node>,
) -> usize {
    let slot = nodes.len();
    nodes.push(Node::Leaf {
        size: indices.len(),
    });

    if depth >= height_limit || indices.len() <= 1 {
        return slot;
    }

    let splittable: Vec<(usize, f64, f64)> = (0..data.ncols())
        .filter_map(|feature| {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                let v = data[[i, feature]];
                (lo.min(v), hi.max(v))
            });
            (min < max).then_some((feature, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return slot;
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    // halved bounds keep the span finite for values near f64::MAX
    let threshold = (min / 2.0 + rng.gen::<f64>() * (max / 2.0 - min / 2.0)) * 2.0;
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| data[[i, feature]] < threshold);

    let left = grow(data, left_rows, depth + 1, height_limit, rng, nodes);
    let right = grow(data, right_rows, depth + 1, height_limit, rng, nodes);
    nodes[slot] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    slot
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile (`q` in [0, 100]) of unsorted values
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (position - lo as f64)
}

/// Isolation forest (negative decision values are outliers)
#[derive(Debug, Clone)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<IsolationTree>,
    sample_size: usize,
    n_features: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            sample_size: 0,
            n_features: 0,
            offset: 0.0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Negated anomaly scores in [-1, 0]; lower is more anomalous
    pub fn score_samples(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(TriageError::Estimator(
                "isolation forest is not fitted".to_string(),
            ));
        }
        TriageError::check_rows("isolation forest feature columns", self.n_features, features.ncols())?;

        // a single-row sample has c(psi) = 0
        let norm = average_path_length(self.sample_size).max(1.0);
        let trees = self.trees.len() as f64;

        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                let mean_depth = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / trees;
                -(2f64.powf(-mean_depth / norm))
            })
            .collect())
    }

    fn validate(&self) -> Result<()> {
        let p = &self.params;
        if p.n_estimators == 0 || p.max_samples == 0 {
            return Err(TriageError::InvalidParameter(
                "isolation forest needs at least one tree and one sample".to_string(),
            ));
        }
        if !(p.contamination > 0.0 && p.contamination <= 0.5) {
            return Err(TriageError::InvalidParameter(format!(
                "contamination must be in (0, 0.5], got {}",
                p.contamination
            )));
        }
        Ok(())
    }
}

impl OutlierEstimator for IsolationForest {
    fn fit(&mut self, features: ArrayView2<'_, f64>) -> Result<()> {
        self.validate()?;
        let rows = features.nrows();
        if rows == 0 {
            return Err(TriageError::InsufficientData(
                "isolation forest needs at least one row".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        self.sample_size = self.params.max_samples.min(rows);
        self.n_features = features.ncols();
        let height_limit = (self.sample_size as f64).log2().ceil() as usize;

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, rows, self.sample_size).into_vec();
                IsolationTree::build(features, sample, height_limit, &mut rng)
            })
            .collect();

        let scores = self.score_samples(features)?;
        self.offset = percentile(&scores, 100.0 * self.params.contamination);

        debug!(
            trees = self.trees.len(),
            sample_size = self.sample_size,
            offset = self.offset,
            "Isolation forest fitted"
        );
        Ok(())
    }

    fn score(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        Ok(self
            .score_samples(features)?
            .into_iter()
            .map(|s| s - self.offset)
            .collect())
    }

    fn polarity(&self) -> Polarity {
        Polarity::NegativeIsOutlier
    }
}
