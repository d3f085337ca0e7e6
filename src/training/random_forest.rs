//! Random forest regressor

use super::decision_tree::DecisionTree;
use crate::error::{MetroCostError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    #[default]
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }
}

/// Bagged ensemble of regression trees, mean-aggregated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest to training data.
    ///
    /// Tree `i` draws from its own generator seeded `random_state + i`, so the
    /// fitted forest does not depend on the rayon thread count.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(MetroCostError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.n_estimators == 0 {
            return Err(MetroCostError::TrainingError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if n_samples == 0 {
            return Err(MetroCostError::TrainingError(
                "cannot fit forest on zero samples".to_string(),
            ));
        }

        self.n_features = n_features;
        let max_features = self.max_features.resolve(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot = y.select(Axis(0), &sample_indices);

                let mut tree = DecisionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit_with_rng(&x_boot, &y_boot, &mut rng)?;
                Ok(tree)
            })
            .collect::<Result<_>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        debug!(
            trees = self.trees.len(),
            features = n_features,
            max_features,
            "Random forest fitted"
        );

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];

        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (acc, &val) in total.iter_mut().zip(imp.iter()) {
                    *acc += val;
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Make predictions for every row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_fitted()?;
        self.check_width(x.ncols())?;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| self.mean_prediction(x.row(i)))
            .collect::<Result<_>>()?;

        Ok(Array1::from_vec(predictions))
    }

    /// Predict a single sample
    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        self.check_fitted()?;
        self.check_width(row.len())?;
        self.mean_prediction(row)
    }

    fn mean_prediction(&self, row: ArrayView1<f64>) -> Result<f64> {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict_row(row)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    fn check_fitted(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(MetroCostError::ModelNotFitted);
        }
        Ok(())
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

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Width of the training matrix
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
