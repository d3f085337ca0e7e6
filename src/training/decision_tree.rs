//! Decision tree regressor

use crate::error::{MetroCostError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Best split found for a node
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// CART regression tree with squared-error splits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at each split; all when `None`
    pub max_features: Option<usize>,
    /// Seed used by `fit`
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        self.fit_with_rng(x, y, &mut rng)
    }

    /// Fit drawing split features from `rng`
    pub fn fit_with_rng<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rng: &mut R,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(MetroCostError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        if n_samples == 0 || n_features == 0 {
            return Err(MetroCostError::TrainingError(format!(
                "cannot fit tree on {} samples x {} features",
                n_samples, n_features
            )));
        }

        self.n_features = n_features;

        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(x, y, indices, 0, &mut importances, rng);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        importances: &mut [f64],
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum) = indices
            .iter()
            .fold((0.0, 0.0), |(s, q), &i| (s + y[i], q + y[i] * y[i]));
        let mean = sum / n_samples as f64;
        let node_sse = (sq_sum - sum * sum / n_samples as f64).max(0.0);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.is_some_and(|d| depth >= d)
            || node_sse <= 1e-12;

        if should_stop {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        let features = self.sample_features(x.ncols(), rng);
        let Some(best) = self.find_best_split(x, y, &indices, &features, sum, sq_sum) else {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += best.gain;

        let left = Box::new(self.build_tree(x, y, left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity: node_sse / n_samples as f64,
        }
    }

    fn sample_features<R: Rng>(&self, n_features: usize, rng: &mut R) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => index::sample(rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        }
    }

    /// Sorted sweep over each candidate feature
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
        total_sum: f64,
        total_sq_sum: f64,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let parent_sse = total_sq_sum - total_sum * total_sum / n as f64;
        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for &feature_idx in features {
            order.sort_by(|&a, &b| {
                x[[a, feature_idx]]
                    .partial_cmp(&x[[b, feature_idx]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq_sum = 0.0;

            for pos in 0..n - 1 {
                let yi = y[order[pos]];
                left_sum += yi;
                left_sq_sum += yi * yi;

                let left_count = pos + 1;
                let right_count = n - left_count;
                if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }

                let current = x[[order[pos], feature_idx]];
                let next = x[[order[pos + 1], feature_idx]];
                if next <= current {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq_sum = total_sq_sum - left_sq_sum;
                let left_sse = left_sq_sum - left_sum * left_sum / left_count as f64;
                let right_sse = right_sq_sum - right_sum * right_sum / right_count as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    // Adjacent floats can have a midpoint equal to `next`
                    let mid = (current + next) / 2.0;
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold: if mid < next { mid } else { current },
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(MetroCostError::ModelNotFitted)?;
        self.check_width(x.ncols())?;

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| Self::predict_sample(root, row))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Predict a single row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        let root = self.root.as_ref().ok_or(MetroCostError::ModelNotFitted)?;
        self.check_width(row.len())?;
        Ok(Self::predict_sample(root, row))
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features {
            return Err(MetroCostError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", width),
            });
        }
        Ok(())
    }

    fn predict_sample(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_fits_step() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![10.0, 10.0, 10.0, 50.0, 50.0, 50.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        for (p, a) in predictions.iter().zip(y.iter()) {
            assert!((p - a).abs() < 1e-9);
        }
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut tree = DecisionTree::new().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut tree = DecisionTree::new().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-9);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_width_mismatch_is_error() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![1.0, 2.0];
        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let wrong = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            tree.predict(&wrong),
            Err(MetroCostError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_unfitted_predict() {
        let tree = DecisionTree::new();
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(MetroCostError::ModelNotFitted)
        ));
    }
}
