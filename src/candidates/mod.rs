//! Classifier candidates and the selection roster.
//!
//! Every candidate family exposes the same capability set: `fit` on a
//! feature matrix plus labels, `predict` on a feature matrix. Labels
//! are arbitrary real values; each model maps the sorted distinct
//! values it saw at fit time to internal class indices and always
//! predicts values drawn from that set.

pub mod boosting;
pub mod forest;
pub mod knn;
pub mod linear;
pub mod naive_bayes;
pub mod neural;
pub mod sgd;
pub mod svm;
pub mod tree;

pub use boosting::{GradientBoosting, GradientBoostingConfig};
pub use forest::{MaxFeatures, RandomForest, RandomForestConfig};
pub use knn::{DistanceMetric, KNearestNeighbors, KnnConfig, WeightScheme};
pub use linear::{LogisticRegression, LogisticRegressionConfig};
pub use naive_bayes::{GaussianNb, GaussianNbConfig};
pub use neural::{Activation, Mlp, MlpConfig};
pub use sgd::{LearningSchedule, SgdClassifier, SgdConfig, SgdLoss};
pub use svm::{Kernel, Svc, SvcConfig};
pub use tree::{Criterion, DecisionTree, DecisionTreeConfig};

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Capability set the harness requires of every candidate.
pub trait Classifier: Send + Sync {
    /// Fit the model to training data.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one label value per row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Sorted, deduplicated label values seen at fit time.
pub(crate) fn class_values(y: &Array1<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = y.to_vec();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup();
    values
}

/// Index of `value` in the sorted class list.
pub(crate) fn class_index(classes: &[f64], value: f64) -> Option<usize> {
    classes
        .iter()
        .position(|c| (c - value).abs() < f64::EPSILON)
}

/// Position of the largest score.
pub(crate) fn argmax(scores: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, &v) in scores.iter().enumerate() {
        if v > scores[best] {
            best = i;
        }
    }
    best
}

/// One roster entry: a display name plus everything needed to freshly
/// instantiate the model. Candidates share no state; `build` returns
/// a brand-new unfitted classifier every call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub name: String,
    pub kind: CandidateKind,
}

/// Supported classifier families, each carrying its configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CandidateKind {
    LogisticRegression(LogisticRegressionConfig),
    Svc(SvcConfig),
    KNearestNeighbors(KnnConfig),
    DecisionTree(DecisionTreeConfig),
    RandomForest(RandomForestConfig),
    GaussianNaiveBayes(GaussianNbConfig),
    Mlp(MlpConfig),
    Sgd(SgdConfig),
    GradientBoosting(GradientBoostingConfig),
}

impl ModelCandidate {
    pub fn new(name: impl Into<String>, kind: CandidateKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Instantiate a fresh, unfitted classifier for this candidate.
    pub fn build(&self) -> Box<dyn Classifier> {
        match &self.kind {
            CandidateKind::LogisticRegression(cfg) => {
                Box::new(LogisticRegression::new(cfg.clone()))
            }
            CandidateKind::Svc(cfg) => Box::new(Svc::new(cfg.clone())),
            CandidateKind::KNearestNeighbors(cfg) => Box::new(KNearestNeighbors::new(cfg.clone())),
            CandidateKind::DecisionTree(cfg) => Box::new(DecisionTree::new(cfg.clone())),
            CandidateKind::RandomForest(cfg) => Box::new(RandomForest::new(cfg.clone())),
            CandidateKind::GaussianNaiveBayes(cfg) => Box::new(GaussianNb::new(cfg.clone())),
            CandidateKind::Mlp(cfg) => Box::new(Mlp::new(cfg.clone())),
            CandidateKind::Sgd(cfg) => Box::new(SgdClassifier::new(cfg.clone())),
            CandidateKind::GradientBoosting(cfg) => Box::new(GradientBoosting::new(cfg.clone())),
        }
    }
}

/// The standard roster, in its fixed evaluation order. Order matters:
/// the selector resolves RMSE ties in favor of the earliest
/// qualifying candidate.
pub fn default_roster() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new(
            "LogisticRegression",
            CandidateKind::LogisticRegression(LogisticRegressionConfig::default()),
        ),
        ModelCandidate::new("LinearSVC", CandidateKind::Svc(SvcConfig::linear())),
        ModelCandidate::new("SVC", CandidateKind::Svc(SvcConfig::default())),
        ModelCandidate::new(
            "KNeighbors",
            CandidateKind::KNearestNeighbors(KnnConfig::default()),
        ),
        ModelCandidate::new(
            "DecisionTree",
            CandidateKind::DecisionTree(DecisionTreeConfig::default()),
        ),
        ModelCandidate::new(
            "RandomForest",
            CandidateKind::RandomForest(RandomForestConfig::default()),
        ),
        ModelCandidate::new(
            "GaussianNB",
            CandidateKind::GaussianNaiveBayes(GaussianNbConfig::default()),
        ),
        ModelCandidate::new("Perceptron", CandidateKind::Sgd(SgdConfig::perceptron())),
        ModelCandidate::new("MLP", CandidateKind::Mlp(MlpConfig::default())),
        ModelCandidate::new("SGD", CandidateKind::Sgd(SgdConfig::default())),
        ModelCandidate::new(
            "GradientBoosting",
            CandidateKind::GradientBoosting(GradientBoostingConfig::default()),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_values_sorted_dedup() {
        let y = array![2.0, 1.0, 2.0, 5.0, 1.0];
        assert_eq!(class_values(&y), vec![1.0, 2.0, 5.0]);
    }

    #[test]
    fn test_class_index_lookup() {
        let classes = vec![1.0, 2.0, 5.0];
        assert_eq!(class_index(&classes, 2.0), Some(1));
        assert_eq!(class_index(&classes, 3.0), None);
    }

    #[test]
    fn test_argmax_picks_first_of_equal_maxima() {
        let scores = array![0.1, 0.7, 0.7, 0.2];
        assert_eq!(argmax(scores.view()), 1);
    }

    #[test]
    fn test_default_roster_order() {
        let roster = default_roster();
        let names: Vec<&str> = roster.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "LogisticRegression",
                "LinearSVC",
                "SVC",
                "KNeighbors",
                "DecisionTree",
                "RandomForest",
                "GaussianNB",
                "Perceptron",
                "MLP",
                "SGD",
                "GradientBoosting",
            ]
        );
    }

    #[test]
    fn test_build_returns_fresh_instances() {
        let candidate = ModelCandidate::new(
            "DecisionTree",
            CandidateKind::DecisionTree(DecisionTreeConfig::default()),
        );
        let x = array![[0.0, 1.0], [1.0, 0.0], [0.2, 0.8], [0.9, 0.1]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut first = candidate.build();
        first.fit(&x, &y).unwrap();

        // a second build must be unfitted, independent of the first
        let second = candidate.build();
        assert!(second.predict(&x).is_err(), "fresh instance is unfitted");
        assert!(first.predict(&x).is_ok());
    }
}
