//! Prediction scoring: accuracy and error metrics, plus
//! precision/recall and the confusion matrix when the label space is
//! binary.

pub mod metrics;

pub use metrics::{ConfusionMatrix, Metrics};
