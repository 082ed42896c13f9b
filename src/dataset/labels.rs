//! Label derivation for the binary rating experiments.

use ndarray::Array1;

/// Collapse star ratings into a positive-review indicator: three or
/// more stars maps to 1.0, anything lower to 0.0.
pub fn binarize_positive(ratings: &Array1<f64>) -> Array1<f64> {
    ratings.mapv(|r| if r > 2.0 { 1.0 } else { 0.0 })
}

/// Collapse star ratings into a one-star indicator: exactly one star
/// maps to 1.0, anything else to 0.0.
pub fn binarize_negative(ratings: &Array1<f64>) -> Array1<f64> {
    ratings.mapv(|r| if r == 1.0 { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binarize_positive_threshold() {
        let ratings = array![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(binarize_positive(&ratings), array![0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_binarize_negative_only_one_star() {
        let ratings = array![1.0, 2.0, 3.0, 1.0, 5.0];
        assert_eq!(binarize_negative(&ratings), array![1.0, 0.0, 0.0, 1.0, 0.0]);
    }
}
