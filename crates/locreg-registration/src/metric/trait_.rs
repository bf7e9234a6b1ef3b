//! Metric trait for point-cloud registration losses.
//!
//! This module defines the core Metric trait that every registration loss
//! implements.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use locreg_core::transform::Transform;

use crate::batch::Batch;

/// Metric trait for measuring how far the transformed moving points are from
/// the reference points.
///
/// Lower values indicate better alignment. The transform is always applied to
/// the batch's `source` (moving) points, never to the `target`.
pub trait Metric<B: Backend> {
    /// Calculate the loss of one batch.
    ///
    /// # Arguments
    /// * `transform` - The mapping applied to the moving points
    /// * `batch` - Moving points, reference points and optional candidate weights
    ///
    /// # Returns
    /// Scalar tensor of shape `[1]`
    fn forward(&self, transform: &impl Transform<B>, batch: &Batch<B>) -> Tensor<B, 1>;

    /// Get the name of this metric.
    fn name(&self) -> &'static str;
}
