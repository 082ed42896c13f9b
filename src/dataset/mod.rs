//! Dataset handling: the feature table, train/test splitting, and
//! label derivation for the binary rating experiments.

pub mod labels;
pub mod split;
pub mod table;

pub use labels::{binarize_negative, binarize_positive};
pub use split::{train_test_split, SplitConfig, TrainTestSplit};
pub use table::FeatureTable;
