//! Candidate partners for unlinked registration.
//!
//! A [`NeighborMatrix`] is a dense, row-major weight table of shape
//! `(reference_len, moving_len)`. Row `t` lists the moving points that may
//! correspond to reference point `t`; a zero weight means "not a candidate".

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;
use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};

/// Leaf size of the moving-point tree. Large enough for lattices that put
/// many points on the same axis value.
const BUCKET_SIZE: usize = 256;

/// Dense non-negative weight matrix between reference and moving points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborMatrix {
    rows: usize,
    cols: usize,
    weights: Vec<f32>,
}

impl NeighborMatrix {
    /// Create a matrix from row-major weights.
    pub fn new(rows: usize, cols: usize, weights: Vec<f32>) -> Result<Self> {
        if weights.len() != rows * cols {
            return Err(RegistrationError::ShapeMismatch {
                expected: vec![rows, cols],
                actual: vec![weights.len()],
            });
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(RegistrationError::incompatible(format!(
                "neighbour weights must be finite and non-negative, found {}",
                w
            )));
        }
        Ok(Self { rows, cols, weights })
    }

    /// Matrix without any candidate.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            weights: vec![0.0; rows * cols],
        }
    }

    /// Matrix with weight 1 for every listed `(reference, moving)` pair.
    pub fn from_pairs(rows: usize, cols: usize, pairs: &[(usize, usize)]) -> Result<Self> {
        let mut matrix = Self::zeros(rows, cols);
        for &(t, s) in pairs {
            matrix.set(t, s, 1.0)?;
        }
        Ok(matrix)
    }

    /// All moving points within `radius` of each reference point.
    pub fn within_radius(reference: &[[f64; 2]], moving: &[[f64; 2]], radius: f64) -> Self {
        let mut matrix = Self::zeros(reference.len(), moving.len());
        let Some(tree) = moving_tree(moving) else {
            return matrix;
        };
        if radius.is_nan() || radius < 0.0 {
            return matrix;
        }

        let radius_sq = radius * radius;
        for (t, target) in reference.iter().enumerate() {
            for nn in tree.within::<SquaredEuclidean>(target, radius_sq) {
                matrix.weights[t * matrix.cols + nn.item as usize] = 1.0;
            }
        }
        matrix
    }

    /// The `k` closest moving points of each reference point, optionally
    /// limited to `max_distance`.
    pub fn k_nearest(
        reference: &[[f64; 2]],
        moving: &[[f64; 2]],
        k: usize,
        max_distance: Option<f64>,
    ) -> Self {
        let mut matrix = Self::zeros(reference.len(), moving.len());
        let k = k.min(moving.len());
        let Some(tree) = moving_tree(moving).filter(|_| k > 0) else {
            return matrix;
        };

        let limit = max_distance.map(|d| d * d).unwrap_or(f64::INFINITY);
        for (t, target) in reference.iter().enumerate() {
            for nn in tree.nearest_n::<SquaredEuclidean>(target, k) {
                if nn.distance <= limit {
                    matrix.weights[t * matrix.cols + nn.item as usize] = 1.0;
                }
            }
        }
        matrix
    }

    /// Get the number of reference points.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Get the number of moving points.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Weight of the pair `(t, s)`.
    pub fn get(&self, t: usize, s: usize) -> f32 {
        self.weights[t * self.cols + s]
    }

    /// Set the weight of the pair `(t, s)`.
    pub fn set(&mut self, t: usize, s: usize, weight: f32) -> Result<()> {
        if t >= self.rows || s >= self.cols {
            return Err(RegistrationError::incompatible(format!(
                "pair ({}, {}) is outside a {}x{} neighbour matrix",
                t, s, self.rows, self.cols
            )));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(RegistrationError::incompatible(format!(
                "neighbour weights must be finite and non-negative, got {}",
                weight
            )));
        }
        self.weights[t * self.cols + s] = weight;
        Ok(())
    }

    /// Weights of reference point `t`.
    pub fn row(&self, t: usize) -> &[f32] {
        &self.weights[t * self.cols..(t + 1) * self.cols]
    }

    /// Reference points without any candidate.
    pub fn empty_rows(&self) -> Vec<usize> {
        (0..self.rows)
            .filter(|&t| self.row(t).iter().all(|&w| w == 0.0))
            .collect()
    }

    /// Number of non-zero weights.
    pub fn candidate_count(&self) -> usize {
        self.weights.iter().filter(|&&w| w > 0.0).count()
    }

    /// Restriction to the given reference rows and moving columns.
    pub fn submatrix(&self, rows: &[usize], cols: &[usize]) -> Self {
        let weights = rows
            .iter()
            .flat_map(|&t| cols.iter().map(move |&s| self.get(t, s)))
            .collect();
        Self {
            rows: rows.len(),
            cols: cols.len(),
            weights,
        }
    }

    /// Upload as a `[rows, cols]` tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::from_data(
            TensorData::new(self.weights.clone(), [self.rows, self.cols]),
            device,
        )
    }
}

/// Static k-d tree over the moving points; item `i` is moving point `i`.
fn moving_tree(moving: &[[f64; 2]]) -> Option<ImmutableKdTree<f64, u64, 2, BUCKET_SIZE>> {
    if moving.is_empty() {
        return None;
    }
    Some(moving.into())
}
