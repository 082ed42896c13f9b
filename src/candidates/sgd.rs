//! Linear classifiers trained by stochastic gradient descent.
//!
//! One pass per epoch over a shuffled sample order, updating after
//! every sample. The perceptron preset reproduces the classic
//! mistake-driven update: constant unit rate, no regularization,
//! update only on misclassification.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::candidates::{argmax, class_values, Classifier};
use crate::error::{Result, SieveError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SgdLoss {
    /// Max-margin hinge loss
    Hinge,
    /// Logistic loss
    Log,
    /// Perceptron criterion: penalize only misclassified margins
    Perceptron,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LearningSchedule {
    Constant,
    /// 1 / (alpha * (t + t0))
    Optimal,
    /// eta0 / t^power_t
    InvScaling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdConfig {
    pub loss: SgdLoss,
    pub learning_rate: LearningSchedule,
    pub eta0: f64,
    /// L2 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub power_t: f64,
    pub random_state: Option<u64>,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            loss: SgdLoss::Hinge,
            learning_rate: LearningSchedule::Optimal,
            eta0: 0.01,
            alpha: 0.0001,
            max_iter: 1000,
            tol: 1e-4,
            power_t: 0.25,
            random_state: Some(42),
        }
    }
}

impl SgdConfig {
    /// Classic perceptron settings.
    pub fn perceptron() -> Self {
        Self {
            loss: SgdLoss::Perceptron,
            learning_rate: LearningSchedule::Constant,
            eta0: 1.0,
            alpha: 0.0,
            ..Default::default()
        }
    }
}

fn get_lr(config: &SgdConfig, t: usize) -> f64 {
    match config.learning_rate {
        LearningSchedule::Constant => config.eta0,
        LearningSchedule::Optimal => {
            let t0 = 1.0 / (config.alpha.max(1e-12) * config.eta0);
            1.0 / (config.alpha.max(1e-12) * (t as f64 + t0))
        }
        LearningSchedule::InvScaling => config.eta0 / (t as f64 + 1.0).powf(config.power_t),
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SgdClassifier {
    config: SgdConfig,
    classes: Vec<f64>,
    /// One weight row per one-vs-rest model.
    weights: Option<Array2<f64>>,
    intercepts: Option<Array1<f64>>,
}

impl SgdClassifier {
    pub fn new(config: SgdConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            weights: None,
            intercepts: None,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.config.max_iter = max_iter;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Train one binary model against +1/-1 targets.
    fn fit_binary(&self, x: &Array2<f64>, y_signed: &[f64], seed: u64) -> (Array1<f64>, f64) {
        let n = x.nrows();
        let p = x.ncols();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut w = Array1::<f64>::zeros(p);
        let mut b = 0.0;
        let mut indices: Vec<usize> = (0..n).collect();
        let mut prev_loss = f64::MAX;
        let mut t = 1usize;

        for epoch in 0..self.config.max_iter {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &i in &indices {
                let xi = x.row(i);
                let margin = xi.dot(&w) + b;
                let yi = y_signed[i];
                let lr = get_lr(&self.config, t);

                let dloss = match self.config.loss {
                    SgdLoss::Hinge => {
                        if yi * margin < 1.0 {
                            epoch_loss += 1.0 - yi * margin;
                            -yi
                        } else {
                            0.0
                        }
                    }
                    SgdLoss::Log => {
                        let prob = sigmoid(margin);
                        let y01 = if yi > 0.0 { 1.0 } else { 0.0 };
                        epoch_loss += -(y01 * prob.max(1e-15).ln()
                            + (1.0 - y01) * (1.0 - prob).max(1e-15).ln());
                        prob - y01
                    }
                    SgdLoss::Perceptron => {
                        if yi * margin <= 0.0 {
                            epoch_loss += -yi * margin;
                            -yi
                        } else {
                            0.0
                        }
                    }
                };

                if dloss != 0.0 || self.config.alpha > 0.0 {
                    for j in 0..p {
                        let grad = dloss * xi[j] + self.config.alpha * w[j];
                        w[j] -= lr * grad;
                    }
                    b -= lr * dloss;
                }
                t += 1;
            }

            epoch_loss /= n as f64;
            if (prev_loss - epoch_loss).abs() < self.config.tol && epoch > 0 {
                break;
            }
            prev_loss = epoch_loss;
        }

        (w, b)
    }

    fn margins(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let weights = self.weights.as_ref().ok_or(SieveError::ModelNotFitted)?;
        let intercepts = self.intercepts.as_ref().ok_or(SieveError::ModelNotFitted)?;

        if x.ncols() != weights.ncols() {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", weights.ncols()),
                actual: format!("{}", x.ncols()),
            });
        }

        let mut scores = x.dot(&weights.t());
        for (mut col, &b) in scores.columns_mut().into_iter().zip(intercepts.iter()) {
            col += b;
        }
        Ok(scores)
    }
}

impl Classifier for SgdClassifier {
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

        self.classes = class_values(y);
        if self.classes.len() < 2 {
            return Err(SieveError::DataError(
                "need at least two distinct label values".to_string(),
            ));
        }

        let seed = self.config.random_state.unwrap_or(42);
        let p = x.ncols();

        if self.classes.len() == 2 {
            // Single model separating the larger value from the smaller
            let positive = self.classes[1];
            let y_signed: Vec<f64> = y
                .iter()
                .map(|&v| if (v - positive).abs() < f64::EPSILON { 1.0 } else { -1.0 })
                .collect();
            let (w, b) = self.fit_binary(x, &y_signed, seed);

            let mut weights = Array2::zeros((1, p));
            weights.row_mut(0).assign(&w);
            self.weights = Some(weights);
            self.intercepts = Some(Array1::from_vec(vec![b]));
        } else {
            // One-vs-rest, one model per class
            let mut weights = Array2::zeros((self.classes.len(), p));
            let mut intercepts = Array1::zeros(self.classes.len());
            for (c, &class) in self.classes.iter().enumerate() {
                let y_signed: Vec<f64> = y
                    .iter()
                    .map(|&v| if (v - class).abs() < f64::EPSILON { 1.0 } else { -1.0 })
                    .collect();
                let (w, b) = self.fit_binary(x, &y_signed, seed.wrapping_add(c as u64));
                weights.row_mut(c).assign(&w);
                intercepts[c] = b;
            }
            self.weights = Some(weights);
            self.intercepts = Some(intercepts);
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.margins(x)?;

        let predictions: Vec<f64> = if self.classes.len() == 2 {
            scores
                .column(0)
                .iter()
                .map(|&m| if m >= 0.0 { self.classes[1] } else { self.classes[0] })
                .collect()
        } else {
            scores
                .rows()
                .into_iter()
                .map(|row| self.classes[argmax(row)])
                .collect()
        };

        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        (
            array![
                [0.0, 0.2],
                [0.2, 0.0],
                [0.1, 0.3],
                [0.3, 0.1],
                [2.0, 2.2],
                [2.2, 2.0],
                [2.1, 2.3],
                [2.3, 2.1],
            ],
            array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
        )
    }

    #[test]
    fn test_hinge_separates() {
        let (x, y) = separable();
        let mut model = SgdClassifier::new(SgdConfig::default()).with_max_iter(300);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 1e-9)
            .count();
        assert!(correct >= 7, "hinge got {}/8 on separable data", correct);
    }

    #[test]
    fn test_perceptron_preset() {
        let config = SgdConfig::perceptron();
        assert_eq!(config.loss, SgdLoss::Perceptron);
        assert_eq!(config.learning_rate, LearningSchedule::Constant);
        assert!((config.eta0 - 1.0).abs() < 1e-12);
        assert_eq!(config.alpha, 0.0);
    }

    #[test]
    fn test_perceptron_separates() {
        let (x, y) = separable();
        let mut model = SgdClassifier::new(SgdConfig::perceptron()).with_max_iter(100);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        assert_eq!(predictions, y, "perceptron converges on separable data");
    }

    #[test]
    fn test_log_loss_separates() {
        let (x, y) = separable();
        let config = SgdConfig {
            loss: SgdLoss::Log,
            max_iter: 300,
            ..Default::default()
        };
        let mut model = SgdClassifier::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 1e-9)
            .count();
        assert!(correct >= 7, "log loss got {}/8 on separable data", correct);
    }

    #[test]
    fn test_binary_predicts_original_labels() {
        let x = array![[0.0], [0.1], [3.0], [3.1]];
        let y = array![2.0, 2.0, 5.0, 5.0];

        let mut model = SgdClassifier::new(SgdConfig::default()).with_max_iter(200);
        model.fit(&x, &y).unwrap();

        for p in model.predict(&x).unwrap().iter() {
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

        let mut model = SgdClassifier::new(SgdConfig::default()).with_max_iter(400);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 1e-9)
            .count();
        assert!(correct >= 5, "one-vs-rest got {}/6", correct);
    }

    #[test]
    fn test_same_seed_reproduces() {
        let (x, y) = separable();
        let mut a = SgdClassifier::new(SgdConfig::default()).with_random_state(9);
        let mut b = SgdClassifier::new(SgdConfig::default()).with_random_state(9);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_unfitted_fails() {
        let model = SgdClassifier::new(SgdConfig::default());
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(SieveError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let mut model = SgdClassifier::new(SgdConfig::default());
        assert!(matches!(model.fit(&x, &y), Err(SieveError::DataError(_))));
    }
}
