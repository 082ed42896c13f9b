//! Gradient boosted decision trees.
//!
//! Each round fits a shallow regression tree to the log-loss gradient
//! on a random row and column sample, then shrinks its contribution by
//! the learning rate. Multi-way problems boost one machine per class.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::candidates::tree::{DecisionTree, DecisionTreeConfig};
use crate::candidates::{argmax, class_values, Classifier};
use crate::error::{Result, SieveError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Boosting rounds (trees per machine)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's contribution
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row sample ratio per round
    pub subsample: f64,
    /// Column sample ratio per round
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            random_state: Some(42),
        }
    }
}

/// One boosted machine: trees plus the columns each saw.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinaryBooster {
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
}

impl BinaryBooster {
    /// Accumulated log-odds for every row.
    fn decision(&self, x: &Array2<f64>, learning_rate: f64) -> Result<Array1<f64>> {
        let mut scores = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for (tree, col_indices) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            let tree_pred = tree.predict(&x.select(Axis(1), col_indices))?;
            scores.scaled_add(learning_rate, &tree_pred);
        }
        Ok(scores)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    config: GradientBoostingConfig,
    classes: Vec<f64>,
    /// One machine for binary problems, one per class otherwise.
    boosters: Vec<BinaryBooster>,
    n_features: usize,
}

impl GradientBoosting {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            boosters: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.config.n_estimators = n_estimators;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.config.learning_rate = learning_rate;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    fn validate_config(&self) -> Result<()> {
        for (name, ratio) in [
            ("subsample", self.config.subsample),
            ("colsample_bytree", self.config.colsample_bytree),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(SieveError::InvalidParameter {
                    name: name.to_string(),
                    value: format!("{}", ratio),
                    reason: "sample ratios must lie in (0, 1]".to_string(),
                });
            }
        }
        if self.config.n_estimators == 0 {
            return Err(SieveError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "boosting needs at least one round".to_string(),
            });
        }
        Ok(())
    }

    /// Boost one machine against 0/1 targets.
    fn fit_binary(
        &self,
        x: &Array2<f64>,
        y01: &Array1<f64>,
        seed: u64,
    ) -> Result<BinaryBooster> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        let p = y01.mean().unwrap_or(0.5);
        let initial_log_odds = (p / (1.0 - p + 1e-10)).ln();
        let mut log_odds = Array1::from_elem(n_samples, initial_log_odds);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let tree_config = DecisionTreeConfig {
            max_depth: Some(self.config.max_depth),
            min_samples_leaf: self.config.min_samples_leaf,
            ..Default::default()
        };

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut col_indices_per_tree = Vec::with_capacity(self.config.n_estimators);

        for _ in 0..self.config.n_estimators {
            let probs: Array1<f64> = log_odds.mapv(|lo| 1.0 / (1.0 + (-lo).exp()));
            let residuals: Array1<f64> = y01 - &probs;

            let row_indices = sample_indices(n_samples, self.config.subsample, &mut rng);
            let col_indices = sample_indices(n_features, self.config.colsample_bytree, &mut rng);

            let x_sub = x
                .select(Axis(0), &row_indices)
                .select(Axis(1), &col_indices);
            let residuals_sub: Array1<f64> =
                Array1::from_vec(row_indices.iter().map(|&i| residuals[i]).collect());

            let mut tree = DecisionTree::regressor(tree_config.clone());
            tree.fit(&x_sub, &residuals_sub)?;

            // Every row advances, not just the sampled ones
            let tree_pred = tree.predict(&x.select(Axis(1), &col_indices))?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);

            trees.push(tree);
            col_indices_per_tree.push(col_indices);
        }

        Ok(BinaryBooster {
            trees,
            col_indices_per_tree,
            initial_log_odds,
        })
    }
}

/// Random subset of 0..n, truncated to the ratio, kept in index order.
fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let sample_size = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(sample_size.max(1));
    indices.sort_unstable();
    indices
}

impl Classifier for GradientBoosting {
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
                "cannot fit on zero samples".to_string(),
            ));
        }
        self.validate_config()?;

        self.classes = class_values(y);
        if self.classes.len() < 2 {
            return Err(SieveError::DataError(
                "need at least two distinct label values".to_string(),
            ));
        }

        self.n_features = x.ncols();
        self.boosters.clear();
        let seed = self.config.random_state.unwrap_or(42);

        if self.classes.len() == 2 {
            let positive = self.classes[1];
            let y01 =
                y.mapv(|v| if (v - positive).abs() < f64::EPSILON { 1.0 } else { 0.0 });
            let booster = self.fit_binary(x, &y01, seed)?;
            self.boosters.push(booster);
        } else {
            for (c, &class) in self.classes.clone().iter().enumerate() {
                let y01 =
                    y.mapv(|v| if (v - class).abs() < f64::EPSILON { 1.0 } else { 0.0 });
                let booster = self.fit_binary(x, &y01, seed.wrapping_add(c as u64))?;
                self.boosters.push(booster);
            }
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.boosters.is_empty() {
            return Err(SieveError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        if self.classes.len() == 2 {
            let scores = self.boosters[0].decision(x, self.config.learning_rate)?;
            Ok(scores.mapv(|s| if s >= 0.0 { self.classes[1] } else { self.classes[0] }))
        } else {
            let mut all_scores = Array2::zeros((x.nrows(), self.boosters.len()));
            for (c, booster) in self.boosters.iter().enumerate() {
                let scores = booster.decision(x, self.config.learning_rate)?;
                all_scores.column_mut(c).assign(&scores);
            }
            let predictions: Vec<f64> = all_scores
                .rows()
                .into_iter()
                .map(|row| self.classes[argmax(row)])
                .collect();
            Ok(Array1::from_vec(predictions))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        (
            array![
                [0.0, 0.1],
                [0.2, 0.0],
                [0.1, 0.2],
                [0.3, 0.1],
                [2.0, 2.1],
                [2.2, 2.0],
                [2.1, 2.2],
                [2.3, 2.1],
            ],
            array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        )
    }

    #[test]
    fn test_binary_boosting_separates() {
        let (x, y) = separable();
        let mut gb = GradientBoosting::new(GradientBoostingConfig::default())
            .with_n_estimators(30);
        gb.fit(&x, &y).unwrap();

        let predictions = gb.predict(&x).unwrap();
        assert_eq!(predictions, y, "boosting fits separable training data");
    }

    #[test]
    fn test_keeps_label_values() {
        let x = array![[0.0], [0.2], [3.0], [3.2]];
        let y = array![2.0, 2.0, 5.0, 5.0];

        let mut gb = GradientBoosting::new(GradientBoostingConfig::default())
            .with_n_estimators(20);
        gb.fit(&x, &y).unwrap();

        for p in gb.predict(&x).unwrap().iter() {
            assert!(*p == 2.0 || *p == 5.0);
        }
    }

    #[test]
    fn test_three_class_one_vs_rest() {
        let x = array![
            [0.0, 0.0],
            [0.2, 0.1],
            [5.0, 0.0],
            [5.2, 0.1],
            [0.0, 5.0],
            [0.1, 5.2],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut gb = GradientBoosting::new(GradientBoostingConfig {
            subsample: 1.0,
            colsample_bytree: 1.0,
            ..Default::default()
        })
        .with_n_estimators(30);
        gb.fit(&x, &y).unwrap();

        let predictions = gb.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 1e-9)
            .count();
        assert!(correct >= 5, "one-vs-rest boosting got {}/6", correct);
    }

    #[test]
    fn test_same_seed_reproduces() {
        let (x, y) = separable();
        let mut a = GradientBoosting::new(GradientBoostingConfig::default())
            .with_n_estimators(15)
            .with_random_state(5);
        let mut b = GradientBoosting::new(GradientBoostingConfig::default())
            .with_n_estimators(15)
            .with_random_state(5);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_unfitted_fails() {
        let gb = GradientBoosting::new(GradientBoostingConfig::default());
        assert!(matches!(
            gb.predict(&array![[1.0]]),
            Err(SieveError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_bad_subsample_rejected() {
        let (x, y) = separable();
        let mut gb = GradientBoosting::new(GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        });
        assert!(matches!(
            gb.fit(&x, &y),
            Err(SieveError::InvalidParameter { .. })
        ));
    }
}
