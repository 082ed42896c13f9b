//! Gaussian naive Bayes.
//!
//! Per-class feature means and variances with a smoothing floor,
//! scored in log space to keep small likelihood products stable.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::candidates::{argmax, class_index, class_values, Classifier};
use crate::error::{Result, SieveError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNbConfig {
    /// Portion of the largest feature variance added to every variance.
    pub var_smoothing: f64,
}

impl Default for GaussianNbConfig {
    fn default() -> Self {
        Self { var_smoothing: 1e-9 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNb {
    config: GaussianNbConfig,
    classes: Vec<f64>,
    priors: Vec<f64>,
    /// Row per class, column per feature.
    means: Option<Array2<f64>>,
    variances: Option<Array2<f64>>,
}

impl GaussianNb {
    pub fn new(config: GaussianNbConfig) -> Self {
        Self {
            config,
            classes: Vec::new(),
            priors: Vec::new(),
            means: None,
            variances: None,
        }
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }
}

impl Classifier for GaussianNb {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(SieveError::ShapeError {
                expected: format!("{} labels", n_samples),
                actual: format!("{}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(SieveError::DataError(
                "cannot fit naive Bayes on zero samples".to_string(),
            ));
        }

        self.classes = class_values(y);
        let n_classes = self.classes.len();

        let mut counts = vec![0usize; n_classes];
        let mut means = Array2::<f64>::zeros((n_classes, n_features));
        let mut variances = Array2::<f64>::zeros((n_classes, n_features));

        for (i, &label) in y.iter().enumerate() {
            let c = class_index(&self.classes, label).ok_or_else(|| {
                SieveError::DataError(format!("label {} missing from class list", label))
            })?;
            counts[c] += 1;
            for f in 0..n_features {
                means[[c, f]] += x[[i, f]];
            }
        }
        for c in 0..n_classes {
            let n = counts[c] as f64;
            for f in 0..n_features {
                means[[c, f]] /= n;
            }
        }
        for (i, &label) in y.iter().enumerate() {
            if let Some(c) = class_index(&self.classes, label) {
                for f in 0..n_features {
                    let d = x[[i, f]] - means[[c, f]];
                    variances[[c, f]] += d * d;
                }
            }
        }

        // Smoothing scaled to the widest feature spread, with an
        // absolute floor for all-constant inputs
        let mut max_feature_var = 0.0f64;
        for f in 0..n_features {
            let mean = x.column(f).sum() / n_samples as f64;
            let var = x
                .column(f)
                .iter()
                .map(|&v| (v - mean).powi(2))
                .sum::<f64>()
                / n_samples as f64;
            if var > max_feature_var {
                max_feature_var = var;
            }
        }
        let epsilon = (self.config.var_smoothing * max_feature_var).max(self.config.var_smoothing);

        for c in 0..n_classes {
            let n = counts[c] as f64;
            for f in 0..n_features {
                variances[[c, f]] = variances[[c, f]] / n + epsilon;
            }
        }

        self.priors = counts
            .iter()
            .map(|&c| c as f64 / n_samples as f64)
            .collect();
        self.means = Some(means);
        self.variances = Some(variances);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let means = self.means.as_ref().ok_or(SieveError::ModelNotFitted)?;
        let variances = self.variances.as_ref().ok_or(SieveError::ModelNotFitted)?;

        if x.ncols() != means.ncols() {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", means.ncols()),
                actual: format!("{}", x.ncols()),
            });
        }

        let n_classes = self.classes.len();
        let ln_2pi = (2.0 * std::f64::consts::PI).ln();

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut scores = Array1::<f64>::zeros(n_classes);
                for c in 0..n_classes {
                    let mut log_likelihood = self.priors[c].max(f64::MIN_POSITIVE).ln();
                    for f in 0..means.ncols() {
                        let var = variances[[c, f]];
                        let diff = x[[i, f]] - means[[c, f]];
                        log_likelihood += -0.5 * (ln_2pi + var.ln()) - diff * diff / (2.0 * var);
                    }
                    scores[c] = log_likelihood;
                }
                self.classes[argmax(scores.view())]
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separated_gaussians() {
        let x = array![
            [-2.0, -2.1],
            [-1.9, -2.0],
            [-2.1, -1.8],
            [2.0, 2.1],
            [1.9, 2.0],
            [2.1, 1.8],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut nb = GaussianNb::new(GaussianNbConfig::default());
        nb.fit(&x, &y).unwrap();

        let predictions = nb.predict(&x).unwrap();
        assert_eq!(predictions, y, "well separated clusters classify exactly");
    }

    #[test]
    fn test_keeps_label_values() {
        let x = array![[-1.0], [-1.2], [3.0], [3.2]];
        let y = array![2.0, 2.0, 5.0, 5.0];

        let mut nb = GaussianNb::new(GaussianNbConfig::default());
        nb.fit(&x, &y).unwrap();

        let predictions = nb.predict(&array![[-1.1], [3.1]]).unwrap();
        assert_eq!(predictions[0], 2.0);
        assert_eq!(predictions[1], 5.0);
    }

    #[test]
    fn test_constant_feature_stays_finite() {
        let x = array![[1.0, 0.5], [1.0, 0.4], [1.0, 2.5], [1.0, 2.6]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut nb = GaussianNb::new(GaussianNbConfig::default());
        nb.fit(&x, &y).unwrap();

        let predictions = nb.predict(&x).unwrap();
        for p in predictions.iter() {
            assert!(p.is_finite());
        }
        assert_eq!(predictions[3], 1.0);
    }

    #[test]
    fn test_predict_unfitted_fails() {
        let nb = GaussianNb::new(GaussianNbConfig::default());
        assert!(matches!(
            nb.predict(&array![[1.0]]),
            Err(SieveError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_three_classes() {
        let x = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [5.0, 5.1],
            [5.1, 5.0],
            [10.0, 10.1],
            [10.1, 10.0],
        ];
        let y = array![1.0, 1.0, 2.0, 2.0, 3.0, 3.0];

        let mut nb = GaussianNb::new(GaussianNbConfig::default());
        nb.fit(&x, &y).unwrap();
        assert_eq!(nb.predict(&x).unwrap(), y);
    }
}
