//! Sequential model sweep over a candidate roster.
//!
//! Every candidate is trained on the same split, scored on the held-out
//! rows, and the one with the strictly lowest RMSE wins. Earlier
//! candidates keep the title on ties, so roster order is part of the
//! contract.

use std::time::Instant;

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::candidates::{default_roster, Classifier, ModelCandidate};
use crate::dataset::{train_test_split, FeatureTable, SplitConfig};
use crate::error::{Result, SieveError};
use crate::evaluation::Metrics;

/// Configuration for a selection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Fraction of rows held out for scoring, in the open interval (0, 1).
    pub test_proportion: f64,
    /// Seed for the split shuffle.
    pub seed: u64,
    /// Candidates to sweep, in order.
    pub roster: Vec<ModelCandidate>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            test_proportion: 0.25,
            seed: 0,
            roster: default_roster(),
        }
    }
}

impl SelectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_proportion(mut self, proportion: f64) -> Self {
        self.test_proportion = proportion;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_roster(mut self, roster: Vec<ModelCandidate>) -> Self {
        self.roster = roster;
        self
    }
}

/// One candidate's results from a sweep.
pub struct CandidateEvaluation {
    pub name: String,
    /// The fitted model, kept so the winner can be used afterwards.
    pub model: Box<dyn Classifier>,
    /// Predictions on the held-out rows.
    pub predictions: Array1<f64>,
    pub metrics: Metrics,
    pub training_time_secs: f64,
}

/// Results of a completed sweep. Present only when every candidate
/// trained and scored successfully.
pub struct SelectionOutcome {
    /// Evaluations in roster order.
    pub evaluations: Vec<CandidateEvaluation>,
    /// Index of the winner within `evaluations`.
    pub best_index: usize,
    pub n_train: usize,
    pub n_test: usize,
}

impl SelectionOutcome {
    pub fn best(&self) -> &CandidateEvaluation {
        &self.evaluations[self.best_index]
    }

    pub fn best_name(&self) -> &str {
        &self.evaluations[self.best_index].name
    }
}

/// Runs a candidate roster against a feature table and picks a winner.
pub struct ModelSelector {
    config: SelectionConfig,
}

impl ModelSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Sweeps the roster sequentially and returns the full set of
    /// evaluations plus the winning index.
    ///
    /// Any fit or predict failure aborts the whole run with a
    /// `TrainingError` naming the candidate. A candidate whose RMSE
    /// comes back non-finite is treated the same way, so the winner
    /// comparison only ever sees finite scores.
    pub fn run(&self, table: &FeatureTable) -> Result<SelectionOutcome> {
        if self.config.roster.is_empty() {
            return Err(SieveError::ConfigError(
                "candidate roster is empty".to_string(),
            ));
        }

        let split_config = SplitConfig::new(self.config.test_proportion, self.config.seed);
        let split = train_test_split(table, &split_config)?;
        let (x_train, y_train) = split.train_set(table)?;
        let (x_test, y_test) = split.test_set(table)?;
        // Binary metrics key off the full label column, not the slice
        // of labels that happened to land in either side of the split.
        let label_values = table.distinct_labels();

        info!(
            n_train = split.n_train(),
            n_test = split.n_test(),
            candidates = self.config.roster.len(),
            "Starting model selection sweep"
        );

        let mut evaluations: Vec<CandidateEvaluation> =
            Vec::with_capacity(self.config.roster.len());
        let mut best_rmse = f64::INFINITY;
        let mut best_index = 0;

        for candidate in &self.config.roster {
            let start = Instant::now();
            let mut model = candidate.build();

            model
                .fit(&x_train, &y_train)
                .map_err(|e| SieveError::TrainingError {
                    candidate: candidate.name.clone(),
                    reason: e.to_string(),
                })?;
            let predictions =
                model
                    .predict(&x_test)
                    .map_err(|e| SieveError::TrainingError {
                        candidate: candidate.name.clone(),
                        reason: e.to_string(),
                    })?;
            let training_time_secs = start.elapsed().as_secs_f64();

            let metrics = Metrics::compute(&y_test, &predictions, &label_values)?;
            if !metrics.rmse.is_finite() {
                return Err(SieveError::TrainingError {
                    candidate: candidate.name.clone(),
                    reason: format!("non-finite RMSE {}", metrics.rmse),
                });
            }

            debug!(
                candidate = %candidate.name,
                rmse = metrics.rmse,
                accuracy = metrics.accuracy,
                seconds = training_time_secs,
                "Candidate evaluated"
            );

            if metrics.rmse < best_rmse {
                best_rmse = metrics.rmse;
                best_index = evaluations.len();
            }

            evaluations.push(CandidateEvaluation {
                name: candidate.name.clone(),
                model,
                predictions,
                metrics,
                training_time_secs,
            });
        }

        let outcome = SelectionOutcome {
            evaluations,
            best_index,
            n_train: split.n_train(),
            n_test: split.n_test(),
        };

        info!(
            winner = %outcome.best_name(),
            accuracy = outcome.best().metrics.accuracy,
            rmse = outcome.best().metrics.rmse,
            "Selection complete"
        );

        Ok(outcome)
    }
}
