//! Candidate sweep, winner selection, and reporting.

pub mod report;
pub mod selector;

pub use report::render_report;
pub use selector::{CandidateEvaluation, ModelSelector, SelectionConfig, SelectionOutcome};
