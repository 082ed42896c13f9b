//! Logistic regression trained by gradient descent.
//!
//! Binary problems fit a single sigmoid model against the larger
//! label value; with more than two classes one model is fitted per
//! class (one-vs-rest) and prediction takes the highest class score.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::candidates::{argmax, class_values, Classifier};
use crate::error::{Result, SieveError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionConfig {
    /// L2 regularization strength
    pub alpha: f64,
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Maximum gradient descent iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            learning_rate: 0.1,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
    classes: Vec<f64>,
    /// One weight row per one-vs-rest model; a single row for binary.
    weights: Option<Array2<f64>>,
    intercepts: Option<Array1<f64>>,
    is_fitted: bool,
}

impl LogisticRegression {
    pub fn new(config: LogisticRegressionConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            weights: None,
            intercepts: None,
            is_fitted: false,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.config.learning_rate = lr;
        self
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Gradient descent on the regularized log loss for 0/1 targets.
    fn fit_binary(&self, x: &Array2<f64>, targets: &Array1<f64>) -> (Array1<f64>, f64) {
        let n_samples = x.nrows();
        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        let lr = self.config.learning_rate;
        let alpha = self.config.alpha;

        for _iter in 0..self.config.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - targets;
            let dw = (x.t().dot(&errors) / n_samples as f64) + (alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.config.tol {
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        (weights, bias)
    }

    /// Per-class sigmoid scores, one column per one-vs-rest model.
    fn decision_scores(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(SieveError::ModelNotFitted);
        }
        let weights = self.weights.as_ref().ok_or(SieveError::ModelNotFitted)?;
        let intercepts = self.intercepts.as_ref().ok_or(SieveError::ModelNotFitted)?;

        let mut scores = x.dot(&weights.t());
        for (mut col, &b) in scores.axis_iter_mut(Axis(1)).zip(intercepts.iter()) {
            col.mapv_inplace(|v| 1.0 / (1.0 + (-(v + b)).exp()));
        }
        Ok(scores)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(SieveError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{}", y.len()),
            });
        }

        self.classes = class_values(y);
        if self.classes.len() < 2 {
            return Err(SieveError::DataError(
                "logistic regression needs at least two label values".to_string(),
            ));
        }

        // Binary: one model against the larger label value. Otherwise
        // one-vs-rest, one model per class.
        let target_classes: Vec<f64> = if self.classes.len() == 2 {
            vec![self.classes[1]]
        } else {
            self.classes.clone()
        };

        let mut weights = Array2::zeros((target_classes.len(), x.ncols()));
        let mut intercepts = Array1::zeros(target_classes.len());

        for (row, &class) in target_classes.iter().enumerate() {
            let targets: Array1<f64> =
                y.mapv(|v| if (v - class).abs() < f64::EPSILON { 1.0 } else { 0.0 });
            let (w, b) = self.fit_binary(x, &targets);
            weights.row_mut(row).assign(&w);
            intercepts[row] = b;
        }

        self.weights = Some(weights);
        self.intercepts = Some(intercepts);
        self.is_fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_scores(x)?;

        if self.classes.len() == 2 {
            Ok(scores.column(0).mapv(|p| {
                if p >= 0.5 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            }))
        } else {
            Ok(scores
                .axis_iter(Axis(0))
                .map(|row| self.classes[argmax(row)])
                .collect())
        }
    }
}
