//! Metric computation over test-set predictions.
//!
//! Labels are treated as ordered numeric values, so the error metrics
//! (MAE, MSE, RMSE) are meaningful for star ratings even though the
//! candidates are classifiers. Precision, recall, and the confusion
//! matrix are only produced when the full label column holds exactly
//! two distinct values; the numerically larger value is the positive
//! class.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SieveError};

/// 2x2 confusion matrix for binary labels.
///
/// `counts[actual][predicted]`, with classes in ascending order, so
/// index 1 is the positive (larger-valued) class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub classes: [f64; 2],
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn true_positives(&self) -> usize {
        self.counts[1][1]
    }

    pub fn false_positives(&self) -> usize {
        self.counts[0][1]
    }

    pub fn true_negatives(&self) -> usize {
        self.counts[0][0]
    }

    pub fn false_negatives(&self) -> usize {
        self.counts[1][0]
    }
}

/// Scores for one candidate's test-set predictions.
///
/// `precision`, `recall`, and `confusion` are `None` outside binary
/// mode. A zero denominator reports the metric as 0.0 and raises the
/// matching `*_degenerate` flag instead of erroring, so callers can
/// tell a real zero from an undefined one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub confusion: Option<ConfusionMatrix>,
    pub precision_degenerate: bool,
    pub recall_degenerate: bool,
    pub n_samples: usize,
}

impl Metrics {
    /// Score `y_pred` against `y_true`. `label_values` are the
    /// distinct values of the full label column (not just the test
    /// slice); binary mode turns on iff there are exactly two.
    pub fn compute(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        label_values: &[f64],
    ) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(SieveError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{}", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(SieveError::DataError(
                "cannot score an empty prediction set".to_string(),
            ));
        }

        let n = y_true.len() as f64;

        let correct: usize = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < f64::EPSILON)
            .count();
        let accuracy = correct as f64 / n;

        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();
        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let rmse = mse.sqrt();

        let mut metrics = Self {
            accuracy,
            mae,
            mse,
            rmse,
            precision: None,
            recall: None,
            confusion: None,
            precision_degenerate: false,
            recall_degenerate: false,
            n_samples: y_true.len(),
        };

        if label_values.len() == 2 {
            metrics.fill_binary(y_true, y_pred, label_values);
        }

        Ok(metrics)
    }

    fn fill_binary(&mut self, y_true: &Array1<f64>, y_pred: &Array1<f64>, label_values: &[f64]) {
        let negative = label_values[0].min(label_values[1]);
        let positive = label_values[0].max(label_values[1]);
        let is_positive = |v: f64| (v - positive).abs() < f64::EPSILON;

        // A prediction matching neither label value lands in the
        // negative column.
        let mut counts = [[0usize; 2]; 2];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            let t_idx = usize::from(is_positive(*t));
            let p_idx = usize::from(is_positive(*p));
            counts[t_idx][p_idx] += 1;
        }

        let confusion = ConfusionMatrix {
            classes: [negative, positive],
            counts,
        };
        let tp = confusion.true_positives();
        let fp = confusion.false_positives();
        let fn_ = confusion.false_negatives();

        if tp + fp > 0 {
            self.precision = Some(tp as f64 / (tp + fp) as f64);
        } else {
            self.precision = Some(0.0);
            self.precision_degenerate = true;
        }

        if tp + fn_ > 0 {
            self.recall = Some(tp as f64 / (tp + fn_) as f64);
        } else {
            self.recall = Some(0.0);
            self.recall_degenerate = true;
        }

        self.confusion = Some(confusion);
    }

    /// True when precision/recall and the confusion matrix were
    /// produced.
    pub fn is_binary(&self) -> bool {
        self.confusion.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_predictions() {
        let y = array![0.0, 1.0, 1.0, 0.0, 1.0];
        let metrics = Metrics::compute(&y, &y, &[0.0, 1.0]).unwrap();

        assert_eq!(metrics.accuracy, 1.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.mse, 0.0);
        assert_eq!(metrics.rmse, 0.0);
        assert_eq!(metrics.precision, Some(1.0));
        assert_eq!(metrics.recall, Some(1.0));
        assert!(!metrics.precision_degenerate);
        assert!(!metrics.recall_degenerate);
    }

    #[test]
    fn test_accuracy_in_unit_interval() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![1.0, 3.0, 3.0, 5.0];
        let metrics = Metrics::compute(&y_true, &y_pred, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
        assert_eq!(metrics.accuracy, 0.5);
    }

    #[test]
    fn test_rmse_at_least_mae() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.5, 1.0, 3.0, 6.5, 5.0];
        let metrics = Metrics::compute(&y_true, &y_pred, &[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(
            metrics.rmse >= metrics.mae,
            "rmse {} must dominate mae {}",
            metrics.rmse,
            metrics.mae
        );
    }

    #[test]
    fn test_rmse_equals_mae_for_uniform_errors() {
        let y_true = array![1.0, 2.0, 3.0, 4.0];
        let y_pred = array![2.0, 1.0, 4.0, 3.0];
        let metrics = Metrics::compute(&y_true, &y_pred, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(
            (metrics.rmse - metrics.mae).abs() < 1e-12,
            "all |errors| equal, so rmse {} == mae {}",
            metrics.rmse,
            metrics.mae
        );
        assert_eq!(metrics.mae, 1.0);
    }

    #[test]
    fn test_multiclass_has_no_binary_metrics() {
        let y_true = array![1.0, 2.0, 3.0];
        let y_pred = array![1.0, 2.0, 2.0];
        let metrics = Metrics::compute(&y_true, &y_pred, &[1.0, 2.0, 3.0]).unwrap();
        assert!(metrics.precision.is_none());
        assert!(metrics.recall.is_none());
        assert!(metrics.confusion.is_none());
        assert!(!metrics.is_binary());
    }

    #[test]
    fn test_positive_class_is_larger_value() {
        // labels {1, 2}: the 2s are the positive class
        let y_true = array![1.0, 2.0, 2.0, 1.0];
        let y_pred = array![1.0, 2.0, 1.0, 2.0];
        let metrics = Metrics::compute(&y_true, &y_pred, &[1.0, 2.0]).unwrap();

        let cm = metrics.confusion.unwrap();
        assert_eq!(cm.classes, [1.0, 2.0]);
        assert_eq!(cm.true_positives(), 1);
        assert_eq!(cm.false_negatives(), 1);
        assert_eq!(cm.false_positives(), 1);
        assert_eq!(cm.true_negatives(), 1);
        assert_eq!(metrics.precision, Some(0.5));
        assert_eq!(metrics.recall, Some(0.5));
    }

    #[test]
    fn test_all_negative_slice_sets_both_degenerate_flags() {
        // full column is binary, but this test slice has no positives
        // and the candidate predicts none
        let y_true = array![0.0, 0.0, 0.0];
        let y_pred = array![0.0, 0.0, 0.0];
        let metrics = Metrics::compute(&y_true, &y_pred, &[0.0, 1.0]).unwrap();

        assert_eq!(metrics.precision, Some(0.0));
        assert_eq!(metrics.recall, Some(0.0));
        assert!(metrics.precision_degenerate, "no predicted positives");
        assert!(metrics.recall_degenerate, "no actual positives");
    }

    #[test]
    fn test_no_predicted_positives_flags_precision_only() {
        let y_true = array![0.0, 1.0, 1.0, 0.0];
        let y_pred = array![0.0, 0.0, 0.0, 0.0];
        let metrics = Metrics::compute(&y_true, &y_pred, &[0.0, 1.0]).unwrap();

        assert_eq!(metrics.precision, Some(0.0));
        assert!(metrics.precision_degenerate);
        assert_eq!(metrics.recall, Some(0.0));
        assert!(
            !metrics.recall_degenerate,
            "recall denominator is the actual positive count, which is 2 here"
        );
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let y_true = array![1.0, 2.0];
        let y_pred = array![1.0];
        assert!(matches!(
            Metrics::compute(&y_true, &y_pred, &[1.0, 2.0]),
            Err(SieveError::ShapeError { .. })
        ));
    }

    #[test]
    fn test_empty_predictions_rejected() {
        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            Metrics::compute(&empty, &empty, &[0.0, 1.0]),
            Err(SieveError::DataError(_))
        ));
    }
}
