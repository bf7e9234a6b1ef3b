//! Validation utilities for registration operations.
//!
//! This module checks hyperparameters before training and the numerical
//! health of transformed coordinates after it.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use crate::error::{RegistrationError, Result};
use crate::stage::Stage;

/// Validate learning rate.
pub fn validate_learning_rate(lr: f64) -> Result<()> {
    if !lr.is_finite() || lr <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Learning rate must be positive and finite, got {}",
            lr
        )));
    }
    Ok(())
}

/// Validate control-point cell size.
pub fn validate_cell_size(cell_size: f64) -> Result<()> {
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Cell size must be positive and finite, got {}",
            cell_size
        )));
    }
    Ok(())
}

/// Validate control-point edge padding.
pub fn validate_edge_padding(edge_padding: usize) -> Result<()> {
    if edge_padding < 1 {
        return Err(RegistrationError::invalid_configuration(
            "Edge padding must be at least 1 cell",
        ));
    }
    Ok(())
}

/// Validate the localization precision of the mixture loss.
pub fn validate_sigma(sigma: f64) -> Result<()> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Sigma must be positive and finite, got {}",
            sigma
        )));
    }
    Ok(())
}

/// Validate that a tensor holds `[N, 2]` points.
pub fn validate_points_shape<B: Backend>(points: &Tensor<B, 2>, expected_len: Option<usize>) -> Result<()> {
    let [n, d] = points.dims();
    let expected_n = expected_len.unwrap_or(n);
    if d != 2 || n != expected_n {
        return Err(RegistrationError::ShapeMismatch {
            expected: vec![expected_n, 2],
            actual: vec![n, d],
        });
    }
    Ok(())
}

/// Number of NaN or infinite entries.
pub fn count_non_finite<B: Backend, const D: usize>(tensor: &Tensor<B, D>) -> usize {
    tensor
        .clone()
        .is_finite()
        .bool_not()
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

/// Fail with [`RegistrationError::DivergedTransform`] if `points` is not finite.
pub fn check_finite<B: Backend>(points: &Tensor<B, 2>, stage: Stage) -> Result<()> {
    let non_finite = count_non_finite(points);
    if non_finite > 0 {
        tracing::error!(
            "The {} stage produced {} non-finite coordinates; the result is discarded",
            stage,
            non_finite
        );
        return Err(RegistrationError::DivergedTransform { stage, non_finite });
    }
    Ok(())
}
