//! Residual analysis of linked channels.

use burn::tensor::backend::Backend;
use locreg_core::PointSet;
use serde::{Deserialize, Serialize};

use crate::error::{RegistrationError, Result};

/// Distances between linked pairs after registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualStats {
    /// Euclidean distance of every pair, in input order.
    pub distances: Vec<f64>,
    /// Mean of `distances`.
    pub mean: f64,
    /// Mean residual vector `moving - reference` per axis.
    pub mean_xy: [f64; 2],
    /// Population standard deviation of the residual per axis.
    pub std_xy: [f64; 2],
}

impl ResidualStats {
    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Largest pair distance.
    pub fn max(&self) -> f64 {
        self.distances.iter().copied().fold(0.0, f64::max)
    }
}

fn paired_coords<B: Backend>(
    reference: &PointSet<B>,
    moving: &PointSet<B>,
) -> Result<(Vec<[f64; 2]>, Vec<[f64; 2]>)> {
    if reference.len() != moving.len() {
        return Err(RegistrationError::incompatible(format!(
            "linked channels need equal lengths, got {} reference and {} moving points",
            reference.len(),
            moving.len()
        )));
    }
    Ok((reference.to_coords(), moving.to_coords()))
}

/// Residual statistics of index-aligned channels.
pub fn residuals<B: Backend>(reference: &PointSet<B>, moving: &PointSet<B>) -> Result<ResidualStats> {
    let (reference, moving) = paired_coords(reference, moving)?;
    if reference.is_empty() {
        return Err(RegistrationError::invalid_configuration(
            "residuals need at least one pair",
        ));
    }

    let n = reference.len() as f64;
    let deltas: Vec<[f64; 2]> = reference
        .iter()
        .zip(&moving)
        .map(|(r, m)| [m[0] - r[0], m[1] - r[1]])
        .collect();

    let distances: Vec<f64> = deltas.iter().map(|d| d[0].hypot(d[1])).collect();
    let mean = distances.iter().sum::<f64>() / n;

    let mut mean_xy = [0.0; 2];
    for d in &deltas {
        mean_xy[0] += d[0] / n;
        mean_xy[1] += d[1] / n;
    }
    let mut var_xy = [0.0; 2];
    for d in &deltas {
        var_xy[0] += (d[0] - mean_xy[0]).powi(2) / n;
        var_xy[1] += (d[1] - mean_xy[1]).powi(2) / n;
    }

    Ok(ResidualStats {
        distances,
        mean,
        mean_xy,
        std_xy: [var_xy[0].sqrt(), var_xy[1].sqrt()],
    })
}

/// Indices of the pairs whose distance is at most `max_distance`.
pub fn pairs_within<B: Backend>(
    reference: &PointSet<B>,
    moving: &PointSet<B>,
    max_distance: f64,
) -> Result<Vec<usize>> {
    if max_distance.is_nan() || max_distance < 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Maximum pair distance must be non-negative, got {}",
            max_distance
        )));
    }
    let (reference, moving) = paired_coords(reference, moving)?;
    Ok(reference
        .iter()
        .zip(&moving)
        .enumerate()
        .filter(|(_, (r, m))| (m[0] - r[0]).hypot(m[1] - r[1]) <= max_distance)
        .map(|(i, _)| i)
        .collect())
}
