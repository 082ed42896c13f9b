//! Truncated SVD over tf-idf matrices.
//!
//! Extracts the leading right singular directions of an uncentered
//! matrix by running power iteration with deflation on its scatter
//! matrix. Text weight matrices are sparse and non-negative, so the
//! data is deliberately not centered before decomposition.

use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::FeatureTable;
use crate::error::{Result, SieveError};

const MAX_POWER_ITERATIONS: usize = 300;
const CONVERGENCE_TOL: f64 = 1e-10;

/// Configuration for truncated SVD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvdConfig {
    /// Number of components to extract. Clamped to the input rank
    /// bound `min(n_samples, n_features)` at fit time.
    pub n_components: usize,
    /// Seed for the power iteration start vectors.
    pub seed: u64,
}

impl Default for SvdConfig {
    fn default() -> Self {
        Self {
            n_components: 2,
            seed: 42,
        }
    }
}

impl SvdConfig {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Truncated SVD fitted by power iteration with deflation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruncatedSvd {
    config: SvdConfig,
    /// Right singular directions, one per row: `(k, n_features)`.
    components: Option<Array2<f64>>,
    eigenvalues: Vec<f64>,
    explained_variance_ratio: Vec<f64>,
}

impl TruncatedSvd {
    pub fn new(config: SvdConfig) -> Self {
        Self {
            config,
            components: None,
            eigenvalues: Vec::new(),
            explained_variance_ratio: Vec::new(),
        }
    }

    /// Learn the leading singular directions of `x`.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples < 2 {
            return Err(SieveError::DataError(
                "truncated SVD requires at least 2 samples".to_string(),
            ));
        }
        if n_features == 0 {
            return Err(SieveError::DataError(
                "truncated SVD requires at least 1 feature".to_string(),
            ));
        }

        let k = self.config.n_components.min(n_features).min(n_samples);
        if k == 0 {
            return Err(SieveError::InvalidParameter {
                name: "n_components".to_string(),
                value: "0".to_string(),
                reason: "at least one component is required".to_string(),
            });
        }

        // Uncentered scatter matrix, (n_features, n_features).
        let scatter = x.t().dot(x) / (n_samples as f64 - 1.0);
        let total_variance = scatter.diag().sum().max(1e-12);

        let (eigenvalues, components) = self.power_iteration(&scatter, k);

        self.explained_variance_ratio = eigenvalues
            .iter()
            .map(|&ev| (ev / total_variance).max(0.0))
            .collect();
        self.eigenvalues = eigenvalues;
        self.components = Some(components);

        Ok(())
    }

    fn power_iteration(&self, scatter: &Array2<f64>, k: usize) -> (Vec<f64>, Array2<f64>) {
        let d = scatter.ncols();
        let mut work = scatter.clone();
        let mut eigenvalues = Vec::with_capacity(k);
        let mut components = Array2::zeros((k, d));
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        for component in 0..k {
            let mut v: Array1<f64> = Array1::from_shape_fn(d, |_| rng.gen_range(-1.0..1.0));
            let norm = v.dot(&v).sqrt().max(1e-12);
            v /= norm;

            let mut eigenvalue = 0.0;
            for _ in 0..MAX_POWER_ITERATIONS {
                let w = work.dot(&v);
                eigenvalue = v.dot(&w);

                let w_norm = w.dot(&w).sqrt().max(1e-12);
                let next = w / w_norm;

                let diff = (&next - &v).mapv(|c| c * c).sum().sqrt();
                v = next;
                if diff < CONVERGENCE_TOL {
                    break;
                }
            }

            eigenvalue = eigenvalue.max(0.0);
            // Deflate so the next pass converges on the next direction.
            let outer = v
                .view()
                .insert_axis(Axis(1))
                .dot(&v.view().insert_axis(Axis(0)));
            work.scaled_add(-eigenvalue, &outer);

            eigenvalues.push(eigenvalue);
            components.row_mut(component).assign(&v);
        }

        (eigenvalues, components)
    }

    /// Project `x` onto the learned directions, giving `(n_samples, k)`.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let components = self.components.as_ref().ok_or(SieveError::ModelNotFitted)?;
        if x.ncols() != components.ncols() {
            return Err(SieveError::ShapeError {
                expected: format!("{} columns", components.ncols()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok(x.dot(&components.t()))
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Fraction of total input variance captured by each component, in
    /// extraction order. Empty until fitted.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    /// Number of components actually extracted. Zero until fitted.
    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }
}

/// Count how many leading components fit under a cumulative variance
/// target.
///
/// The scan walks every ratio in order and admits a component whenever
/// the running total plus that ratio still fits under `target`. It
/// does not stop at the first rejection, so a later small component
/// can still be admitted after a large one was skipped.
pub fn components_for_variance(ratios: &[f64], target: f64) -> usize {
    let mut cumulative = 0.0;
    let mut count = 0;
    for &ratio in ratios {
        if cumulative + ratio <= target {
            count += 1;
            cumulative += ratio;
        }
    }
    count
}

/// Wrap a projected score matrix and a label column into a table with
/// zero-based `Component_{i}` column names.
pub fn component_table(
    scores: &Array2<f64>,
    labels: &Array1<f64>,
    label_name: &str,
) -> Result<FeatureTable> {
    let names: Vec<String> = (0..scores.ncols())
        .map(|i| format!("Component_{i}"))
        .collect();
    FeatureTable::new(names, scores.clone(), label_name, labels.clone())
}
