//! Random forest classifier.
//!
//! Bagged CART trees with per-tree bootstrap rows and a random column
//! subset, aggregated by majority vote.

use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::candidates::tree::{Criterion, DecisionTree, DecisionTreeConfig};
use crate::candidates::{class_index, class_values, Classifier};
use crate::error::{Result, SieveError};

/// How many feature columns each tree may see.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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
    All,
}

impl MaxFeatures {
    fn resolve(self, n_features: usize) -> usize {
        let n = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        n.clamp(1, n_features)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub random_state: Option<u64>,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: RandomForestConfig,
    trees: Vec<DecisionTree>,
    /// Columns each tree was trained on, sorted ascending.
    feature_subsets: Vec<Vec<usize>>,
    classes: Vec<f64>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(config: RandomForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_subsets: Vec::new(),
            classes: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.config.n_estimators = n_estimators;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn tree_config(&self) -> DecisionTreeConfig {
        DecisionTreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            max_features: None,
            criterion: self.config.criterion,
        }
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(SieveError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(SieveError::DataError(
                "cannot fit a forest on zero samples".to_string(),
            ));
        }
        if n_features == 0 {
            return Err(SieveError::DataError(
                "cannot fit a forest without feature columns".to_string(),
            ));
        }
        if self.config.n_estimators == 0 {
            return Err(SieveError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "a forest needs at least one tree".to_string(),
            });
        }

        self.n_features = n_features;
        self.classes = class_values(y);

        let max_features = self.config.max_features.resolve(n_features);
        let base_seed = self.config.random_state.unwrap_or(42);
        let tree_config = self.tree_config();

        let fitted: Result<Vec<(DecisionTree, Vec<usize>)>> = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.config.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut feature_indices: Vec<usize> = (0..n_features).collect();
                feature_indices.shuffle(&mut rng);
                feature_indices.truncate(max_features);
                feature_indices.sort_unstable();

                let x_boot = x
                    .select(Axis(0), &sample_indices)
                    .select(Axis(1), &feature_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = DecisionTree::new(tree_config.clone());
                tree.fit(&x_boot, &y_boot)?;
                Ok((tree, feature_indices))
            })
            .collect();

        let (trees, subsets): (Vec<_>, Vec<_>) = fitted?.into_iter().unzip();
        self.trees = trees;
        self.feature_subsets = subsets;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(SieveError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        let all_predictions: Result<Vec<Array1<f64>>> = self
            .trees
            .par_iter()
            .zip(self.feature_subsets.par_iter())
            .map(|(tree, subset)| tree.predict(&x.select(Axis(1), subset)))
            .collect();
        let all_predictions = all_predictions?;

        let n_samples = x.nrows();
        let predictions: Vec<f64> = (0..n_samples)
            .map(|i| {
                let mut votes = vec![0usize; self.classes.len()];
                for preds in &all_predictions {
                    if let Some(idx) = class_index(&self.classes, preds[i]) {
                        votes[idx] += 1;
                    }
                }
                let mut best = 0;
                for (idx, &count) in votes.iter().enumerate() {
                    if count > votes[best] {
                        best = idx;
                    }
                }
                self.classes[best]
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}
