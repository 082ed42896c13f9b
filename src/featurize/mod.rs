//! Text featurization for review corpora.
//!
//! Turns raw documents into the dense numeric tables the selection
//! harness consumes, either as tf-idf term weights directly or as a
//! truncated SVD projection of them.

pub mod svd;
pub mod tfidf;

pub use svd::{component_table, components_for_variance, SvdConfig, TruncatedSvd};
pub use tfidf::{to_table, TfidfConfig, TfidfVectorizer};
