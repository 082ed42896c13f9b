//! ModelSieve - Classifier selection harness
//!
//! This crate trains a roster of classifier candidates on one shared
//! train/test split of a labeled feature table, scores each candidate
//! on the held-out rows, and picks the winner by lowest RMSE. It also
//! ships the text featurization used to build those tables from raw
//! review corpora.
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Feature tables, deterministic splits, label derivation
//! - [`featurize`] - Tf-idf vectorization and truncated SVD
//!
//! ## Modeling
//! - [`candidates`] - The classifier roster and its model families
//! - [`evaluation`] - Regression and binary classification metrics
//!
//! ## Selection
//! - [`selection`] - The sequential sweep, winner pick, and report

// Core error handling
pub mod error;

// Data
pub mod dataset;
pub mod featurize;

// Modeling
pub mod candidates;
pub mod evaluation;

// Selection
pub mod selection;

pub use error::{Result, SieveError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, SieveError};

    // Data
    pub use crate::dataset::{
        binarize_negative, binarize_positive, train_test_split, FeatureTable, SplitConfig,
        TrainTestSplit,
    };
    pub use crate::featurize::{
        component_table, components_for_variance, to_table, SvdConfig, TfidfConfig,
        TfidfVectorizer, TruncatedSvd,
    };

    // Modeling
    pub use crate::candidates::{default_roster, CandidateKind, Classifier, ModelCandidate};
    pub use crate::evaluation::{ConfusionMatrix, Metrics};

    // Selection
    pub use crate::selection::{
        render_report, CandidateEvaluation, ModelSelector, SelectionConfig, SelectionOutcome,
    };
}
