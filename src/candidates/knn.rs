//! K-nearest neighbors classifier.
//!
//! Lazy learner: fit stores the training matrix, predict scans it per
//! query row with a bounded max-heap so only the k best distances are
//! kept.

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::candidates::{class_index, class_values, Classifier};
use crate::error::{Result, SieveError};

/// Distance between two feature rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
    /// Cosine similarity converted to a distance
    Cosine,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self::Euclidean
    }
}

/// Neighbor weighting scheme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors count equally
    Uniform,
    /// Closer neighbors count more (inverse distance)
    Distance,
}

impl Default for WeightScheme {
    fn default() -> Self {
        Self::Uniform
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnConfig {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNearestNeighbors {
    config: KnnConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
    classes: Vec<f64>,
}

impl KNearestNeighbors {
    pub fn new(config: KnnConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
            classes: Vec::new(),
        }
    }

    pub fn with_k(k: usize) -> Self {
        Self::new(KnnConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }
}

impl Classifier for KNearestNeighbors {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(SieveError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(SieveError::DataError(
                "cannot fit nearest neighbors on zero samples".to_string(),
            ));
        }
        if self.config.n_neighbors == 0 {
            return Err(SieveError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "at least one neighbor is required".to_string(),
            });
        }

        self.classes = class_values(y);
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(SieveError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(SieveError::ModelNotFitted)?;

        if x.ncols() != x_train.ncols() {
            return Err(SieveError::ShapeError {
                expected: format!("{} features", x_train.ncols()),
                actual: format!("{}", x.ncols()),
            });
        }

        let k = self.config.n_neighbors;
        let metric = self.config.metric;
        let weights = self.config.weights;
        let classes = &self.classes;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let neighbors = find_k_nearest(x.row(i), x_train, y_train, k, metric);
                vote_classify(&neighbors, classes, weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Max-heap entry for partial sort over (distance, label).
#[derive(PartialEq)]
struct DistLabel(f64, f64);

impl Eq for DistLabel {}
impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}
impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap_or(Ordering::Equal)
    }
}

/// Keep the k smallest distances, O(n log k) per query.
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.rows().into_iter().enumerate() {
        let dist = compute_distance(point, row, metric);
        if heap.len() < k {
            heap.push(DistLabel(dist, y_train[i]));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, y_train[i]));
            }
        }
    }

    heap.into_iter().map(|dl| (dl.0, dl.1)).collect()
}

fn compute_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| {
                let d = ai - bi;
                d * d
            })
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
        DistanceMetric::Minkowski(p) => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).abs().powf(p))
            .sum::<f64>()
            .powf(1.0 / p),
        DistanceMetric::Cosine => {
            let mut dot = 0.0;
            let mut norm_a = 0.0;
            let mut norm_b = 0.0;
            for (ai, bi) in a.iter().zip(b.iter()) {
                dot += ai * bi;
                norm_a += ai * ai;
                norm_b += bi * bi;
            }
            let denom = norm_a.sqrt() * norm_b.sqrt();
            if denom > 0.0 {
                1.0 - (dot / denom)
            } else {
                1.0
            }
        }
    }
}

/// Weighted majority vote over the neighbor labels.
fn vote_classify(neighbors: &[(f64, f64)], classes: &[f64], weights: WeightScheme) -> f64 {
    let mut votes = vec![0.0f64; classes.len()];
    for &(dist, label) in neighbors {
        let weight = match weights {
            WeightScheme::Uniform => 1.0,
            WeightScheme::Distance => 1.0 / (dist + 1e-10),
        };
        if let Some(idx) = class_index(classes, label) {
            votes[idx] += weight;
        }
    }
    let mut best = 0;
    for (idx, &v) in votes.iter().enumerate() {
        if v > votes[best] {
            best = idx;
        }
    }
    classes[best]
}
