//! Feedforward multi-layer perceptron classifier.
//!
//! Mini-batch gradient descent with momentum and a softmax output
//! layer. Training stops when the cross-entropy loss stalls.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::candidates::{argmax, class_index, class_values, Classifier};
use crate::error::{Result, SieveError};

/// Hidden layer activation function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified linear unit
    ReLU,
    /// Logistic sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Identity
    Linear,
}

impl Default for Activation {
    fn default() -> Self {
        Self::ReLU
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    /// Hidden layer sizes
    pub hidden_layers: Vec<usize>,
    pub activation: Activation,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub batch_size: usize,
    /// L2 regularization
    pub alpha: f64,
    pub momentum: f64,
    /// Minimum per-epoch loss improvement
    pub tol: f64,
    /// Stalled epochs tolerated before stopping
    pub n_iter_no_change: usize,
    pub random_state: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![100],
            activation: Activation::ReLU,
            learning_rate: 0.001,
            max_epochs: 200,
            batch_size: 32,
            alpha: 0.0001,
            momentum: 0.9,
            tol: 1e-4,
            n_iter_no_change: 10,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mlp {
    config: MlpConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    classes: Vec<f64>,
}

impl Mlp {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            classes: Vec::new(),
        }
    }

    pub fn with_hidden_layers(mut self, layers: Vec<usize>) -> Self {
        self.config.hidden_layers = layers;
        self
    }

    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.config.max_epochs = epochs;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn make_rng(&self) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42))
    }

    fn initialize_weights(&mut self, n_classes: usize) {
        self.weights.clear();
        self.biases.clear();

        let mut rng = self.make_rng();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(n_classes);

        for i in 0..layer_sizes.len() - 1 {
            let n_in = layer_sizes[i];
            let n_out = layer_sizes[i + 1];

            // Xavier/Glorot initialization
            let scale = (2.0 / (n_in + n_out) as f64).sqrt();
            let weights =
                Array2::from_shape_fn((n_in, n_out), |_| rng.gen::<f64>() * 2.0 * scale - scale);

            self.weights.push(weights);
            self.biases.push(Array1::zeros(n_out));
        }
    }

    /// Forward pass; returns every layer's activations and the
    /// pre-activation values needed by backprop.
    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let n_layers = self.weights.len();
        let mut activations = Vec::with_capacity(n_layers + 1);
        activations.push(x.clone());
        let mut z_values = Vec::with_capacity(n_layers);

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = activations[i].dot(w) + b;
            z_values.push(z.clone());

            let a = if i < n_layers - 1 {
                activate(&z, self.config.activation)
            } else {
                softmax(&z)
            };
            activations.push(a);
        }

        (activations, z_values)
    }

    /// Softmax plus cross-entropy collapses to (output - target).
    fn backward(
        &self,
        y_onehot: &Array2<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y_onehot.nrows() as f64;
        let n_layers = self.weights.len();
        let mut gradients = Vec::with_capacity(n_layers);

        let mut delta = (&activations[n_layers] - y_onehot) / n;

        for i in (0..n_layers).rev() {
            let grad_w = activations[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                delta = delta.dot(&self.weights[i].t())
                    * activate_derivative(&z_values[i - 1], self.config.activation);
            }
        }

        gradients.reverse();
        gradients
    }

    fn to_onehot(&self, y: &Array1<f64>) -> Array2<f64> {
        let mut onehot = Array2::zeros((y.len(), self.classes.len()));
        for (i, &label) in y.iter().enumerate() {
            if let Some(idx) = class_index(&self.classes, label) {
                onehot[[i, idx]] = 1.0;
            }
        }
        onehot
    }

    fn cross_entropy(output: &Array2<f64>, y_onehot: &Array2<f64>) -> f64 {
        let n = output.nrows() as f64;
        let mut loss = 0.0;
        for (o, t) in output.iter().zip(y_onehot.iter()) {
            if *t > 0.0 {
                loss -= o.max(1e-15).ln();
            }
        }
        loss / n
    }
}

fn activate(z: &Array2<f64>, activation: Activation) -> Array2<f64> {
    match activation {
        Activation::ReLU => z.mapv(|v| v.max(0.0)),
        Activation::Sigmoid => z.mapv(|v| 1.0 / (1.0 + (-v).exp())),
        Activation::Tanh => z.mapv(|v| v.tanh()),
        Activation::Linear => z.clone(),
    }
}

fn activate_derivative(z: &Array2<f64>, activation: Activation) -> Array2<f64> {
    match activation {
        Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
        Activation::Sigmoid => {
            let sig = activate(z, Activation::Sigmoid);
            &sig * &(1.0 - &sig)
        }
        Activation::Tanh => {
            let t = z.mapv(|v| v.tanh());
            1.0 - &t * &t
        }
        Activation::Linear => Array2::ones(z.raw_dim()),
    }
}

fn softmax(z: &Array2<f64>) -> Array2<f64> {
    let mut result = z.clone();
    for mut row in result.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp_sum: f64 = row.iter().map(|&v| (v - max).exp()).sum();
        for v in row.iter_mut() {
            *v = (*v - max).exp() / exp_sum;
        }
    }
    result
}

fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((indices.len(), x.ncols()), |(r, c)| x[[indices[r], c]])
}

impl Classifier for Mlp {
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
        if self.config.batch_size == 0 {
            return Err(SieveError::InvalidParameter {
                name: "batch_size".to_string(),
                value: "0".to_string(),
                reason: "batches must hold at least one sample".to_string(),
            });
        }

        self.n_features = x.ncols();
        self.classes = class_values(y);
        if self.classes.len() < 2 {
            return Err(SieveError::DataError(
                "need at least two distinct label values".to_string(),
            ));
        }

        self.initialize_weights(self.classes.len());
        let y_onehot = self.to_onehot(y);

        let mut rng = self.make_rng();
        let mut velocities_w: Vec<Array2<f64>> = self
            .weights
            .iter()
            .map(|w| Array2::zeros(w.raw_dim()))
            .collect();
        let mut velocities_b: Vec<Array1<f64>> = self
            .biases
            .iter()
            .map(|b| Array1::zeros(b.len()))
            .collect();

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut best_loss = f64::INFINITY;
        let mut stall_count = 0;

        for _epoch in 0..self.config.max_epochs {
            indices.shuffle(&mut rng);

            for batch_start in (0..n_samples).step_by(self.config.batch_size) {
                let batch_end = (batch_start + self.config.batch_size).min(n_samples);
                let batch_indices = &indices[batch_start..batch_end];

                let x_batch = gather_rows(x, batch_indices);
                let y_batch = gather_rows(&y_onehot, batch_indices);

                let (activations, z_values) = self.forward(&x_batch);
                let gradients = self.backward(&y_batch, &activations, &z_values);

                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * self.config.momentum
                        - &grad_w * self.config.learning_rate;
                    velocities_b[i] = &velocities_b[i] * self.config.momentum
                        - &grad_b * self.config.learning_rate;

                    self.weights[i] = &self.weights[i] + &velocities_w[i];
                    self.biases[i] = &self.biases[i] + &velocities_b[i];

                    self.weights[i] =
                        &self.weights[i] * (1.0 - self.config.alpha * self.config.learning_rate);
                }
            }

            let (activations, _) = self.forward(x);
            let loss = Self::cross_entropy(&activations[self.weights.len()], &y_onehot);
            if loss < best_loss - self.config.tol {
                best_loss = loss;
                stall_count = 0;
            } else {
                stall_count += 1;
                if stall_count >= self.config.n_iter_no_change {
                    break;
                }
            }
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.weights.is_empty() {
            return Err(SieveError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        let (activations, _) = self.forward(x);
        let output = &activations[self.weights.len()];

        let predictions: Vec<f64> = output
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(row)])
            .collect();
        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn threshold_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((60, 2), |(i, j)| (i * 2 + j) as f64 * 0.05);
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| if row[0] + row[1] > 3.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_learns_threshold() {
        let (x, y) = threshold_data();
        let config = MlpConfig {
            hidden_layers: vec![16],
            max_epochs: 300,
            learning_rate: 0.01,
            ..Default::default()
        };
        let mut mlp = Mlp::new(config);
        mlp.fit(&x, &y).unwrap();

        let predictions = mlp.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 1e-9)
            .count();
        let accuracy = correct as f64 / y.len() as f64;
        assert!(accuracy > 0.7, "accuracy {} too low", accuracy);
    }

    #[test]
    fn test_keeps_label_values() {
        let x = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [3.0, 3.1],
            [3.1, 3.0],
            [3.2, 3.1],
        ];
        let y = array![2.0, 2.0, 2.0, 5.0, 5.0, 5.0];

        let config = MlpConfig {
            hidden_layers: vec![8],
            max_epochs: 300,
            learning_rate: 0.05,
            ..Default::default()
        };
        let mut mlp = Mlp::new(config);
        mlp.fit(&x, &y).unwrap();

        for p in mlp.predict(&x).unwrap().iter() {
            assert!(*p == 2.0 || *p == 5.0, "prediction {} not a label value", p);
        }
    }

    #[test]
    fn test_activation_values() {
        let z = array![[-1.0, 0.0, 1.0], [-2.0, 0.5, 2.0]];

        let relu = activate(&z, Activation::ReLU);
        assert_eq!(relu[[0, 0]], 0.0);
        assert_eq!(relu[[0, 2]], 1.0);

        let sig = activate(&z, Activation::Sigmoid);
        assert!((sig[[0, 1]] - 0.5).abs() < 1e-9, "sigmoid(0) is one half");
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let z = array![[1.0, 2.0, 3.0], [-1.0, 0.0, 1.0]];
        let s = softmax(&z);
        for row in s.rows() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_reproduces() {
        let (x, y) = threshold_data();
        let config = MlpConfig {
            hidden_layers: vec![8],
            max_epochs: 50,
            ..Default::default()
        };
        let mut a = Mlp::new(config.clone()).with_random_state(3);
        let mut b = Mlp::new(config).with_random_state(3);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_unfitted_fails() {
        let mlp = Mlp::new(MlpConfig::default());
        assert!(matches!(
            mlp.predict(&array![[1.0]]),
            Err(SieveError::ModelNotFitted)
        ));
    }
}
