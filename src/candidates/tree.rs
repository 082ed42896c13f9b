//! CART decision tree.
//!
//! The classifier form backs the roster entry and the random forest;
//! the regressor form (MSE splits, mean leaves) is what gradient
//! boosting fits to residuals.

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::candidates::{class_index, class_values, Classifier};
use crate::error::{Result, SieveError};

/// Split impurity criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Information entropy (classification)
    Entropy,
    /// Variance (regression)
    Mse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeConfig {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Scan only the first `max_features` columns when splitting.
    /// Column subsetting for forests happens at the forest level.
    pub max_features: Option<usize>,
    pub criterion: Criterion,
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: DecisionTreeConfig,
    root: Option<TreeNode>,
    n_features: usize,
    is_classification: bool,
    classes: Vec<f64>,
}

impl DecisionTree {
    /// Classification tree.
    pub fn new(config: DecisionTreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_features: 0,
            is_classification: true,
            classes: Vec::new(),
        }
    }

    /// Regression tree: variance splits, mean-valued leaves.
    pub fn regressor(config: DecisionTreeConfig) -> Self {
        Self {
            config: DecisionTreeConfig {
                criterion: Criterion::Mse,
                ..config
            },
            root: None,
            n_features: 0,
            is_classification: false,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.config.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.config.max_features = Some(max_features);
        self
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    fn build_tree(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let should_stop = n_samples < self.config.min_samples_split
            || n_samples <= self.config.min_samples_leaf
            || self.config.max_depth.map_or(false, |d| depth >= d)
            || Self::is_pure(&y_subset);

        if should_stop {
            return TreeNode::Leaf {
                value: self.leaf_value(&y_subset),
                n_samples,
            };
        }

        if let Some((best_feature, best_threshold)) = self.find_best_split(x, y, indices) {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.config.min_samples_leaf
                || right_indices.len() < self.config.min_samples_leaf
            {
                return TreeNode::Leaf {
                    value: self.leaf_value(&y_subset),
                    n_samples,
                };
            }

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1));
            let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                value: self.leaf_value(&y_subset),
                n_samples,
            }
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let n_features_to_try = self.config.max_features.unwrap_or(n_features).min(n_features);

        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.impurity(&y_subset);

        // Each feature independently finds its best threshold
        let feature_results: Vec<Option<(usize, f64, f64)>> = (0..n_features_to_try)
            .into_par_iter()
            .map(|feature_idx| {
                let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                values.dedup();

                let mut best_gain = 0.0f64;
                let mut best_threshold = 0.0f64;

                for window in values.windows(2) {
                    let threshold = (window[0] + window[1]) / 2.0;

                    let mut left_y = Vec::new();
                    let mut right_y = Vec::new();
                    for &i in indices {
                        if x[[i, feature_idx]] <= threshold {
                            left_y.push(y[i]);
                        } else {
                            right_y.push(y[i]);
                        }
                    }

                    if left_y.len() < self.config.min_samples_leaf
                        || right_y.len() < self.config.min_samples_leaf
                    {
                        continue;
                    }

                    let n = indices.len() as f64;
                    let weighted = (left_y.len() as f64 * self.impurity(&left_y)
                        + right_y.len() as f64 * self.impurity(&right_y))
                        / n;

                    let gain = parent_impurity - weighted;
                    if gain > best_gain {
                        best_gain = gain;
                        best_threshold = threshold;
                    }
                }

                if best_gain > 0.0 {
                    Some((feature_idx, best_threshold, best_gain))
                } else {
                    None
                }
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(feature, threshold, _)| (feature, threshold))
    }

    fn impurity(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        match self.config.criterion {
            Criterion::Gini => {
                let counts = self.count_classes(y);
                let n = y.len() as f64;
                1.0 - counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => {
                let counts = self.count_classes(y);
                let n = y.len() as f64;
                -counts
                    .iter()
                    .filter(|&&c| c > 0)
                    .map(|&c| {
                        let p = c as f64 / n;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
            Criterion::Mse => {
                let n = y.len() as f64;
                let mean = y.iter().sum::<f64>() / n;
                y.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
            }
        }
    }

    /// Class counts against the exact fitted label values; no integer
    /// rounding, so fractional label values survive intact.
    fn count_classes(&self, y: &[f64]) -> Vec<usize> {
        let mut counts = vec![0usize; self.classes.len()];
        for &val in y {
            if let Some(idx) = class_index(&self.classes, val) {
                counts[idx] += 1;
            }
        }
        counts
    }

    fn is_pure(y: &[f64]) -> bool {
        if y.is_empty() {
            return true;
        }
        let first = y[0];
        y.iter().all(|&v| (v - first).abs() < 1e-10)
    }

    fn leaf_value(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        if self.is_classification {
            let counts = self.count_classes(y);
            let mut best = 0;
            for (i, &c) in counts.iter().enumerate() {
                if c > counts[best] {
                    best = i;
                }
            }
            self.classes[best]
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        }
    }

    fn predict_sample(node: &TreeNode, sample: ndarray::ArrayView1<f64>) -> f64 {
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
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(SieveError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(SieveError::DataError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        if self.is_classification {
            self.classes = class_values(y);
        }

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(SieveError::ModelNotFitted)?;

        if x.ncols() != self.n_features {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| Self::predict_sample(root, x.row(i)))
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new(DecisionTreeConfig::default());
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y, "axis-aligned split recovers the labels");
    }

    #[test]
    fn test_classifier_keeps_label_values() {
        let x = array![[0.0], [0.1], [0.9], [1.0]];
        let y = array![2.0, 2.0, 5.0, 5.0];

        let mut tree = DecisionTree::new(DecisionTreeConfig::default());
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        for p in predictions.iter() {
            assert!(*p == 2.0 || *p == 5.0, "leaf values come from the label set");
        }
    }

    #[test]
    fn test_regressor_mean_leaves() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 1.2, 0.8, 5.0, 5.2, 4.8];

        let mut tree = DecisionTree::regressor(DecisionTreeConfig::default());
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert!(
            (predictions[0] - 1.0).abs() < 0.5,
            "left cluster predicts near its mean, got {}",
            predictions[0]
        );
        assert!(
            (predictions[5] - 5.0).abs() < 0.5,
            "right cluster predicts near its mean, got {}",
            predictions[5]
        );
    }

    #[test]
    fn test_max_depth_respected() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new(DecisionTreeConfig::default()).with_max_depth(2);
        tree.fit(&x, &y).unwrap();
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn test_predict_unfitted_fails() {
        let tree = DecisionTree::new(DecisionTreeConfig::default());
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(SieveError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_predict_checks_feature_count() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let y = array![0.0, 1.0];
        let mut tree = DecisionTree::new(DecisionTreeConfig::default());
        tree.fit(&x, &y).unwrap();

        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(SieveError::ShapeError { .. })
        ));
    }
}
