//! Deterministic train/test partitioning.
//!
//! Rows are split by shuffling the row indices with a seeded RNG, so
//! the same seed and proportion always reproduce the same partition.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::table::FeatureTable;
use crate::error::{Result, SieveError};
use ndarray::{Array1, Array2};

/// Split configuration. The defaults (one quarter held out, seed 0)
/// match the harness's reference experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of rows held out for testing, in the open interval (0, 1).
    pub test_proportion: f64,
    /// Shuffle seed.
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_proportion: 0.25,
            seed: 0,
        }
    }
}

impl SplitConfig {
    pub fn new(test_proportion: f64, seed: u64) -> Self {
        Self {
            test_proportion,
            seed,
        }
    }

    pub fn with_test_proportion(mut self, test_proportion: f64) -> Self {
        self.test_proportion = test_proportion;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Disjoint train/test row-index sets covering the whole table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    pub fn n_train(&self) -> usize {
        self.train_indices.len()
    }

    pub fn n_test(&self) -> usize {
        self.test_indices.len()
    }

    /// Materialize the training rows of `table`.
    pub fn train_set(&self, table: &FeatureTable) -> Result<(Array2<f64>, Array1<f64>)> {
        table.select_rows(&self.train_indices)
    }

    /// Materialize the held-out rows of `table`.
    pub fn test_set(&self, table: &FeatureTable) -> Result<(Array2<f64>, Array1<f64>)> {
        table.select_rows(&self.test_indices)
    }
}

/// Partition `table` into train and test index sets.
///
/// The test side takes `ceil(n_rows * test_proportion)` rows. Errors
/// if the proportion is outside (0, 1), the table is empty, or either
/// side would come out empty.
pub fn train_test_split(table: &FeatureTable, config: &SplitConfig) -> Result<TrainTestSplit> {
    let n = table.n_rows();

    if n == 0 {
        return Err(SieveError::ConfigError(
            "cannot split an empty table".to_string(),
        ));
    }
    if !(config.test_proportion > 0.0 && config.test_proportion < 1.0) {
        return Err(SieveError::ConfigError(format!(
            "test proportion must be in (0, 1), got {}",
            config.test_proportion
        )));
    }

    let n_test = (n as f64 * config.test_proportion).ceil() as usize;
    let n_train = n - n_test;
    if n_train == 0 {
        return Err(SieveError::ConfigError(format!(
            "test proportion {} leaves no training rows for {} total rows",
            config.test_proportion, n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    indices.shuffle(&mut rng);

    let test_indices = indices.split_off(n_train);
    Ok(TrainTestSplit {
        train_indices: indices,
        test_indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use std::collections::HashSet;

    fn table_with_rows(n: usize) -> FeatureTable {
        let features = Array2::from_shape_fn((n, 3), |(r, c)| (r * 3 + c) as f64);
        let labels = Array1::from_shape_fn(n, |i| (i % 2) as f64);
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        FeatureTable::new(names, features, "y", labels).unwrap()
    }

    #[test]
    fn test_split_sizes_cover_all_rows() {
        let table = table_with_rows(100);
        let split = train_test_split(&table, &SplitConfig::default()).unwrap();
        assert_eq!(split.n_train() + split.n_test(), 100);
        assert_eq!(split.n_test(), 25, "quarter of 100 rows held out");
    }

    #[test]
    fn test_split_sets_are_disjoint() {
        let table = table_with_rows(50);
        let split = train_test_split(&table, &SplitConfig::default()).unwrap();

        let train: HashSet<usize> = split.train_indices.iter().copied().collect();
        let test: HashSet<usize> = split.test_indices.iter().copied().collect();
        assert!(
            train.is_disjoint(&test),
            "no row may appear in both train and test"
        );
        assert_eq!(train.len() + test.len(), 50, "all rows covered");
    }

    #[test]
    fn test_split_reproducible_with_same_seed() {
        let table = table_with_rows(40);
        let config = SplitConfig::default().with_seed(7);
        let first = train_test_split(&table, &config).unwrap();
        let second = train_test_split(&table, &config).unwrap();
        assert_eq!(first.train_indices, second.train_indices);
        assert_eq!(first.test_indices, second.test_indices);
    }

    #[test]
    fn test_split_differs_across_seeds() {
        let table = table_with_rows(40);
        let a = train_test_split(&table, &SplitConfig::default().with_seed(0)).unwrap();
        let b = train_test_split(&table, &SplitConfig::default().with_seed(1)).unwrap();
        assert_ne!(a.test_indices, b.test_indices);
    }

    #[test]
    fn test_split_rounds_test_side_up() {
        let table = table_with_rows(10);
        let config = SplitConfig::default().with_test_proportion(0.26);
        let split = train_test_split(&table, &config).unwrap();
        assert_eq!(split.n_test(), 3);
        assert_eq!(split.n_train(), 7);
    }

    #[test]
    fn test_split_eight_rows_quarter() {
        let table = table_with_rows(8);
        let split = train_test_split(&table, &SplitConfig::default()).unwrap();
        assert_eq!(split.n_train(), 6);
        assert_eq!(split.n_test(), 2);
    }

    #[test]
    fn test_split_rejects_bad_proportion() {
        let table = table_with_rows(10);
        for bad in [0.0, 1.0, -0.5, 1.5] {
            let config = SplitConfig::default().with_test_proportion(bad);
            let result = train_test_split(&table, &config);
            assert!(
                matches!(result, Err(SieveError::ConfigError(_))),
                "proportion {bad} must be rejected"
            );
        }
    }

    #[test]
    fn test_split_rejects_empty_table() {
        let table = FeatureTable::new(
            vec!["a".to_string()],
            Array2::zeros((0, 1)),
            "y",
            Array1::zeros(0),
        )
        .unwrap();
        let result = train_test_split(&table, &SplitConfig::default());
        assert!(matches!(result, Err(SieveError::ConfigError(_))));
    }

    #[test]
    fn test_split_rejects_degenerate_train_side() {
        let table = table_with_rows(2);
        let config = SplitConfig::default().with_test_proportion(0.9);
        let result = train_test_split(&table, &config);
        assert!(matches!(result, Err(SieveError::ConfigError(_))));
    }

    #[test]
    fn test_materialized_sets_match_indices() {
        let table = table_with_rows(12);
        let split = train_test_split(&table, &SplitConfig::default()).unwrap();
        let (x_test, y_test) = split.test_set(&table).unwrap();
        assert_eq!(x_test.nrows(), split.n_test());
        for (row, &idx) in split.test_indices.iter().enumerate() {
            assert_eq!(x_test[[row, 0]], table.features()[[idx, 0]]);
            assert_eq!(y_test[row], table.labels()[idx]);
        }
    }
}
