//! The labeled feature table consumed by the selection harness.
//!
//! A `FeatureTable` is a dense rectangular block of named numeric
//! feature columns plus exactly one label column. Tables are built
//! once per experiment run and never mutated; deriving new labels for
//! a follow-up experiment produces a fresh snapshot via
//! [`FeatureTable::with_labels`].

use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};

/// Immutable labeled feature table.
///
/// Invariants, enforced at construction:
/// - the feature matrix has one name per column,
/// - features and labels have the same row count,
/// - every value is finite (upstream produces a dense table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTable {
    feature_names: Vec<String>,
    features: Array2<f64>,
    label_name: String,
    labels: Array1<f64>,
}

impl FeatureTable {
    /// Build a table from pre-assembled arrays, validating the
    /// invariants above.
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f64>,
        label_name: impl Into<String>,
        labels: Array1<f64>,
    ) -> Result<Self> {
        if feature_names.len() != features.ncols() {
            return Err(SieveError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{}", feature_names.len()),
            });
        }
        if features.nrows() != labels.len() {
            return Err(SieveError::ShapeError {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{}", labels.len()),
            });
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(SieveError::DataError(
                "feature matrix contains non-finite values".to_string(),
            ));
        }
        if labels.iter().any(|v| !v.is_finite()) {
            return Err(SieveError::DataError(
                "label column contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            feature_names,
            features,
            label_name: label_name.into(),
            labels,
        })
    }

    /// Build a table from a DataFrame. Every column except `label` is
    /// taken as a feature, in frame order, and cast to `Float64`.
    /// Null values are rejected rather than imputed.
    pub fn from_dataframe(df: &DataFrame, label: &str) -> Result<Self> {
        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != label)
            .map(|s| s.to_string())
            .collect();

        if feature_names.len() == df.width() {
            return Err(SieveError::ColumnNotFound(label.to_string()));
        }

        let labels = Self::column_to_array1(df, label)?;
        let features = Self::columns_to_array2(df, &feature_names)?;

        Self::new(feature_names, features, label, labels)
    }

    fn column_to_array1(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
        let column = df
            .column(name)
            .map_err(|_| SieveError::ColumnNotFound(name.to_string()))?;
        let column_f64 = column
            .cast(&DataType::Float64)
            .map_err(|e| SieveError::DataError(e.to_string()))?;
        if column_f64.null_count() > 0 {
            return Err(SieveError::DataError(format!(
                "column '{name}' contains null values"
            )));
        }
        let values: Array1<f64> = column_f64
            .f64()
            .map_err(|e| SieveError::DataError(e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();
        Ok(values)
    }

    fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
        let n_rows = df.height();
        let n_cols = col_names.len();

        // Collect all columns as contiguous f64 Vecs
        let col_data: Vec<Vec<f64>> = col_names
            .iter()
            .map(|col_name| Ok(Self::column_to_array1(df, col_name)?.to_vec()))
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
        Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
            col_refs[c][r]
        }))
    }

    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    /// Sorted, deduplicated values of the full label column. Binary
    /// metric mode keys off this, so it must always reflect the whole
    /// column rather than a test slice.
    pub fn distinct_labels(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.labels.to_vec();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        values
    }

    /// Materialize the rows at `indices` as an owned feature matrix
    /// and label vector.
    pub fn select_rows(&self, indices: &[usize]) -> Result<(Array2<f64>, Array1<f64>)> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows()) {
            return Err(SieveError::ShapeError {
                expected: format!("row index < {}", self.n_rows()),
                actual: format!("{bad}"),
            });
        }
        let x = self.features.select(Axis(0), indices);
        let y: Array1<f64> = indices.iter().map(|&i| self.labels[i]).collect();
        Ok((x, y))
    }

    /// A fresh snapshot with the same features and a replacement label
    /// column, for running another experiment (e.g. a binarized
    /// rating) on the same vectorized data.
    pub fn with_labels(&self, labels: Array1<f64>) -> Result<Self> {
        Self::new(
            self.feature_names.clone(),
            self.features.clone(),
            self.label_name.clone(),
            labels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_table() -> FeatureTable {
        FeatureTable::new(
            vec!["f1".to_string(), "f2".to_string()],
            array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]],
            "rating",
            array![1.0, 2.0, 2.0, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn test_new_validates_name_count() {
        let result = FeatureTable::new(
            vec!["f1".to_string()],
            array![[1.0, 2.0], [3.0, 4.0]],
            "y",
            array![0.0, 1.0],
        );
        assert!(matches!(result, Err(SieveError::ShapeError { .. })));
    }

    #[test]
    fn test_new_validates_label_length() {
        let result = FeatureTable::new(
            vec!["f1".to_string()],
            array![[1.0], [2.0]],
            "y",
            array![0.0, 1.0, 1.0],
        );
        assert!(matches!(result, Err(SieveError::ShapeError { .. })));
    }

    #[test]
    fn test_new_rejects_nan() {
        let result = FeatureTable::new(
            vec!["f1".to_string()],
            array![[1.0], [f64::NAN]],
            "y",
            array![0.0, 1.0],
        );
        assert!(matches!(result, Err(SieveError::DataError(_))));
    }

    #[test]
    fn test_from_dataframe() {
        let df = df!(
            "f1" => &[1.0, 2.0, 3.0],
            "f2" => &[4.0, 5.0, 6.0],
            "rating" => &[1i64, 2, 1]
        )
        .unwrap();

        let table = FeatureTable::from_dataframe(&df, "rating").unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_features(), 2);
        assert_eq!(table.feature_names(), &["f1".to_string(), "f2".to_string()]);
        assert_eq!(table.labels(), &array![1.0, 2.0, 1.0]);
        assert_eq!(table.features()[[2, 1]], 6.0);
    }

    #[test]
    fn test_from_dataframe_missing_label() {
        let df = df!("f1" => &[1.0, 2.0]).unwrap();
        let result = FeatureTable::from_dataframe(&df, "rating");
        assert!(matches!(result, Err(SieveError::ColumnNotFound(_))));
    }

    #[test]
    fn test_distinct_labels_sorted_and_deduped() {
        let table = small_table();
        assert_eq!(table.distinct_labels(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_select_rows() {
        let table = small_table();
        let (x, y) = table.select_rows(&[2, 0]).unwrap();
        assert_eq!(x, array![[3.0, 30.0], [1.0, 10.0]]);
        assert_eq!(y, array![2.0, 1.0]);
    }

    #[test]
    fn test_select_rows_out_of_range() {
        let table = small_table();
        assert!(table.select_rows(&[0, 9]).is_err());
    }

    #[test]
    fn test_with_labels_snapshot() {
        let table = small_table();
        let relabeled = table.with_labels(array![0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(relabeled.labels(), &array![0.0, 1.0, 1.0, 0.0]);
        // the original snapshot is untouched
        assert_eq!(table.labels(), &array![1.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn test_with_labels_length_mismatch() {
        let table = small_table();
        assert!(table.with_labels(array![0.0, 1.0]).is_err());
    }
}
