//! Squared distance metric for linked point pairs.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use locreg_core::transform::Transform;

use super::trait_::Metric;
use crate::batch::Batch;

/// Sum of squared distances between index-aligned pairs:
/// `L = Σ_i ‖T(source_i) − target_i‖²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredDistance;

impl SquaredDistance {
    /// Create a new squared distance metric.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Metric<B> for SquaredDistance {
    fn forward(&self, transform: &impl Transform<B>, batch: &Batch<B>) -> Tensor<B, 1> {
        let moved = transform.transform_points(batch.source.clone());
        (moved - batch.target.clone()).powi_scalar(2).sum()
    }

    fn name(&self) -> &'static str {
        "SquaredDistance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use locreg_core::transform::ShiftTransform;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_squared_distance() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0], [1.0, 1.0]], &device);
        let target = Tensor::<TestBackend, 2>::from_floats([[3.0, 4.0], [1.0, 2.0]], &device);
        let batch = Batch::linked(source, target);

        let identity = ShiftTransform::<TestBackend>::identity(&device);
        let loss = SquaredDistance::new().forward(&identity, &batch).into_scalar();
        assert!((loss - 26.0).abs() < 1e-5);

        let shift = ShiftTransform::new(Tensor::<TestBackend, 1>::from_floats([0.0, 1.0], &device));
        let loss = SquaredDistance::new().forward(&shift, &batch).into_scalar();
        assert!((loss - 18.0).abs() < 1e-5);
    }
}
