//! Support vector classifier trained with SMO.
//!
//! Binary problems train one machine separating the larger label value
//! from the smaller; with more classes one machine per class is trained
//! one-vs-rest and the highest decision score wins.

use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::candidates::{class_values, Classifier};
use crate::error::{Result, SieveError};

/// Cap on eager kernel matrix size; beyond this training refuses
/// rather than exhausting memory.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Kernel {
    /// K(x, y) = x . y
    Linear,
    /// K(x, y) = (gamma * x . y + coef0)^degree
    Polynomial { degree: i32, gamma: f64, coef0: f64 },
    /// K(x, y) = exp(-gamma * ||x - y||^2)
    Rbf { gamma: f64 },
    /// K(x, y) = tanh(gamma * x . y + coef0)
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::Rbf { gamma: 1.0 }
    }
}

impl Kernel {
    fn apply(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            Kernel::Linear => a.dot(&b),
            Kernel::Polynomial { degree, gamma, coef0 } => {
                (*gamma * a.dot(&b) + coef0).powi(*degree)
            }
            Kernel::Rbf { gamma } => {
                let mut norm_sq = 0.0;
                for (ai, bi) in a.iter().zip(b.iter()) {
                    let d = ai - bi;
                    norm_sq += d * d;
                }
                (-gamma * norm_sq).exp()
            }
            Kernel::Sigmoid { gamma, coef0 } => (*gamma * a.dot(&b) + coef0).tanh(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvcConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub kernel: Kernel,
    /// KKT violation tolerance
    pub tol: f64,
    pub max_iter: usize,
    pub random_state: Option<u64>,
}

impl Default for SvcConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: Kernel::default(),
            tol: 1e-3,
            max_iter: 1000,
            random_state: Some(42),
        }
    }
}

impl SvcConfig {
    /// Linear-kernel machine.
    pub fn linear() -> Self {
        Self {
            kernel: Kernel::Linear,
            ..Default::default()
        }
    }
}

/// One trained machine: its support vectors and multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BinarySvm {
    support_vectors: Array2<f64>,
    alphas: Array1<f64>,
    support_labels: Array1<f64>,
    bias: f64,
}

impl BinarySvm {
    fn score(&self, kernel: &Kernel, sample: ArrayView1<f64>) -> f64 {
        let mut sum = self.bias;
        for j in 0..self.support_vectors.nrows() {
            sum += self.alphas[j]
                * self.support_labels[j]
                * kernel.apply(sample, self.support_vectors.row(j));
        }
        sum
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svc {
    config: SvcConfig,
    classes: Vec<f64>,
    /// One machine for binary problems, one per class otherwise.
    models: Vec<BinarySvm>,
    n_features: usize,
}

impl Svc {
    pub fn new(config: SvcConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            models: Vec::new(),
            n_features: 0,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.config.kernel = kernel;
        self
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Train one machine against +1/-1 targets.
    fn train_one(&self, x: &Array2<f64>, y_signed: &Array1<f64>) -> Result<BinarySvm> {
        let (alphas, bias, support_indices) = self.smo_train(x, y_signed)?;

        let mut support_vectors = Array2::zeros((support_indices.len(), x.ncols()));
        let mut support_labels = Array1::zeros(support_indices.len());
        let mut support_alphas = Array1::zeros(support_indices.len());
        for (i, &idx) in support_indices.iter().enumerate() {
            support_vectors.row_mut(i).assign(&x.row(idx));
            support_labels[i] = y_signed[idx];
            support_alphas[i] = alphas[idx];
        }

        Ok(BinarySvm {
            support_vectors,
            alphas: support_alphas,
            support_labels,
            bias,
        })
    }

    fn smo_train(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Array1<f64>, f64, Vec<usize>)> {
        let n = x.nrows();

        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(SieveError::DataError(format!(
                "{} samples exceed the {} sample kernel matrix cap",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let mut alphas = Array1::<f64>::zeros(n);
        let mut bias = 0.0;

        let kernel_matrix = self.compute_kernel_matrix(x);

        let mut rng =
            Xoshiro256PlusPlus::seed_from_u64(self.config.random_state.unwrap_or(42));

        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            if n <= 1 {
                break;
            }

            for i in 0..n {
                let e_i = decision_cached(&kernel_matrix, &alphas, y, bias, i) - y[i];

                let violates_kkt = (y[i] * e_i < -self.config.tol && alphas[i] < self.config.c)
                    || (y[i] * e_i > self.config.tol && alphas[i] > 0.0);
                if !violates_kkt {
                    continue;
                }

                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };

                let e_j = decision_cached(&kernel_matrix, &alphas, y, bias, j) - y[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                let (l, h) = if y[i] != y[j] {
                    (
                        (alphas[j] - alphas[i]).max(0.0),
                        (self.config.c + alphas[j] - alphas[i]).min(self.config.c),
                    )
                } else {
                    (
                        (alphas[i] + alphas[j] - self.config.c).max(0.0),
                        (alphas[i] + alphas[j]).min(self.config.c),
                    )
                };
                if (l - h).abs() < 1e-10 {
                    continue;
                }

                let eta =
                    2.0 * kernel_matrix[[i, j]] - kernel_matrix[[i, i]] - kernel_matrix[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                alphas[j] = (alphas[j] - y[j] * (e_i - e_j) / eta).clamp(l, h);
                if (alphas[j] - alpha_j_old).abs() < 1e-5 {
                    continue;
                }

                alphas[i] += y[i] * y[j] * (alpha_j_old - alphas[j]);

                let b1 = bias
                    - e_i
                    - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, i]]
                    - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[i, j]];
                let b2 = bias
                    - e_j
                    - y[i] * (alphas[i] - alpha_i_old) * kernel_matrix[[i, j]]
                    - y[j] * (alphas[j] - alpha_j_old) * kernel_matrix[[j, j]];

                bias = if alphas[i] > 0.0 && alphas[i] < self.config.c {
                    b1
                } else if alphas[j] > 0.0 && alphas[j] < self.config.c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        let support_indices: Vec<usize> = alphas
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 1e-8)
            .map(|(i, _)| i)
            .collect();

        Ok((alphas, bias, support_indices))
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let kernel = self.config.kernel;

        // Upper triangle rows in parallel, mirrored afterwards
        let rows: Vec<Vec<(usize, f64)>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| (j, kernel.apply(x.row(i), x.row(j))))
                    .collect()
            })
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row_vals) in rows.into_iter().enumerate() {
            for (j, val) in row_vals {
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }
}

fn decision_cached(
    k: &Array2<f64>,
    alphas: &Array1<f64>,
    y: &Array1<f64>,
    bias: f64,
    idx: usize,
) -> f64 {
    let mut sum = 0.0;
    for i in 0..alphas.len() {
        sum += alphas[i] * y[i] * k[[i, idx]];
    }
    sum + bias
}

impl Classifier for Svc {
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

        self.n_features = x.ncols();
        self.models.clear();

        if self.classes.len() == 2 {
            let positive = self.classes[1];
            let y_signed =
                y.mapv(|v| if (v - positive).abs() < f64::EPSILON { 1.0 } else { -1.0 });
            let model = self.train_one(x, &y_signed)?;
            self.models.push(model);
        } else {
            for &class in &self.classes.clone() {
                let y_signed =
                    y.mapv(|v| if (v - class).abs() < f64::EPSILON { 1.0 } else { -1.0 });
                let model = self.train_one(x, &y_signed)?;
                self.models.push(model);
            }
        }

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.models.is_empty() {
            return Err(SieveError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{}", x.ncols()),
            });
        }

        let kernel = &self.config.kernel;
        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let sample = x.row(i);
                if self.classes.len() == 2 {
                    if self.models[0].score(kernel, sample) >= 0.0 {
                        self.classes[1]
                    } else {
                        self.classes[0]
                    }
                } else {
                    let mut best_score = f64::NEG_INFINITY;
                    let mut best_class = self.classes[0];
                    for (c, model) in self.models.iter().enumerate() {
                        let score = model.score(kernel, sample);
                        if score > best_score {
                            best_score = score;
                            best_class = self.classes[c];
                        }
                    }
                    best_class
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}
