//! Gaussian mixture metric for unlinked point clouds.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use locreg_core::transform::Transform;

use super::trait_::Metric;
use crate::batch::Batch;

/// Default localization precision, in the units of the coordinates.
pub const DEFAULT_SIGMA: f64 = 0.15;

/// Upper bound on `targets x sources` pairs evaluated at once.
const MAX_PAIRS_PER_CHUNK: usize = 1 << 22;

/// Log-value given to non-candidate pairs; far below any real term.
const MASKED_LOG_WEIGHT: f32 = -1e30;

/// Negative log-likelihood of a Gaussian mixture around every target:
///
/// `L = Σ_t −log( Σ_s N[t, s] · exp(−‖T(s) − t‖² / σ²) / Σ_s N[t, s] )`
///
/// Each row is a weighted mean of kernels bounded by 1, so the loss is never
/// negative.
///
/// The inner sum is evaluated in log-sum-exp form with the row maximum
/// subtracted (and detached), so the loss and its gradient stay finite even
/// when every candidate is many σ away. Targets without candidates
/// contribute exactly zero.
///
/// Batches without candidate weights are treated as linked: each target
/// only has the source with the same index.
#[derive(Debug, Clone, Copy)]
pub struct GaussianMixture {
    sigma: f64,
}

impl GaussianMixture {
    /// Create a new mixture metric with localization precision `sigma`.
    pub fn new(sigma: f64) -> Self {
        Self { sigma }
    }

    /// Get the localization precision.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    fn chunk_loss<B: Backend>(
        &self,
        moved: Tensor<B, 2>,
        target: Tensor<B, 2>,
        weights: Tensor<B, 2>,
    ) -> Tensor<B, 1> {
        let [t, _] = target.dims();
        let [s, _] = moved.dims();

        // Pairwise squared distances [T, S]
        let diff = target.reshape([t, 1, 2]) - moved.reshape([1, s, 2]);
        let d2 = diff.powi_scalar(2).sum_dim(2).reshape([t, s]);

        let inactive = weights.clone().equal_elem(0.0);
        let log_kernel = d2
            .div_scalar(self.sigma * self.sigma)
            .neg()
            .clamp_min(MASKED_LOG_WEIGHT)
            .mask_fill(inactive, MASKED_LOG_WEIGHT);

        let row_max = log_kernel.clone().max_dim(1).detach(); // [T, 1]
        let mass = (weights.clone() * (log_kernel - row_max.clone()).exp())
            .sum_dim(1)
            .clamp_min(1e-30); // [T, 1]

        let row_weight = weights.sum_dim(1); // [T, 1]
        let active = row_weight.clone().greater_elem(0.0).float();
        let log_mean = mass.log() - row_weight.clamp_min(1e-30).log() + row_max;
        (log_mean.neg() * active).sum()
    }
}

impl Default for GaussianMixture {
    fn default() -> Self {
        Self::new(DEFAULT_SIGMA)
    }
}

impl<B: Backend> Metric<B> for GaussianMixture {
    fn forward(&self, transform: &impl Transform<B>, batch: &Batch<B>) -> Tensor<B, 1> {
        let moved = transform.transform_points(batch.source.clone());
        let target = batch.target.clone();
        let device = moved.device();
        let [t, _] = target.dims();
        let [s, _] = moved.dims();

        let weights = batch
            .neighbors
            .clone()
            .unwrap_or_else(|| Tensor::eye(t.max(s), &device).slice([0..t, 0..s]));

        // Chunk over targets to bound the pairwise table
        let rows_per_chunk = (MAX_PAIRS_PER_CHUNK / s.max(1)).max(1);
        if t <= rows_per_chunk {
            return self.chunk_loss(moved, target, weights);
        }

        let mut total = Tensor::<B, 1>::zeros([1], &device);
        let mut start = 0;
        while start < t {
            let end = (start + rows_per_chunk).min(t);
            total = total
                + self.chunk_loss(
                    moved.clone(),
                    target.clone().slice([start..end, 0..2]),
                    weights.clone().slice([start..end, 0..s]),
                );
            start = end;
        }
        total
    }

    fn name(&self) -> &'static str {
        "GaussianMixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use locreg_core::transform::ShiftTransform;

    type TestBackend = NdArray<f32>;
    type TrainBackend = Autodiff<NdArray<f32>>;

    fn batch(device: &<TestBackend as Backend>::Device) -> Batch<TestBackend> {
        let source = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0], [5.0, 0.0], [9.0, 9.0]], device);
        let target = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [5.0, 2.0], [-4.0, 3.0]], device);
        // Row 2 has no candidate
        let neighbors = Tensor::<TestBackend, 2>::from_floats(
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]],
            device,
        );
        Batch::unlinked(source, target, neighbors)
    }

    #[test]
    fn test_single_candidate_rows_reduce_to_scaled_distance() {
        let device = Default::default();
        let identity = ShiftTransform::<TestBackend>::identity(&device);
        let loss = GaussianMixture::new(1.0).forward(&identity, &batch(&device)).into_scalar();

        // rows: 1² + 2², empty row contributes 0
        assert!(loss.is_finite());
        assert!((loss - 5.0).abs() < 1e-4, "loss = {}", loss);
    }

    #[test]
    fn test_sigma_scales_loss() {
        let device = Default::default();
        let identity = ShiftTransform::<TestBackend>::identity(&device);
        let loss = GaussianMixture::new(0.5).forward(&identity, &batch(&device)).into_scalar();
        assert!((loss - 20.0).abs() < 1e-3, "loss = {}", loss);
    }

    #[test]
    fn test_linked_batch_uses_diagonal() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0], [2.0, 0.0]], &device);
        let target = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0], [2.0, 3.0]], &device);
        let identity = ShiftTransform::<TestBackend>::identity(&device);
        let loss = GaussianMixture::new(1.0)
            .forward(&identity, &Batch::linked(source, target))
            .into_scalar();
        assert!((loss - 10.0).abs() < 1e-4, "loss = {}", loss);
    }

    #[test]
    fn test_coincident_candidates_are_not_negative() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 2>::from_floats([[2.0, 2.0], [2.0, 2.0], [2.0, 2.0]], &device);
        let target = Tensor::<TestBackend, 2>::from_floats([[2.0, 2.0], [2.0, 2.0]], &device);
        let neighbors = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0, 1.0], [1.0, 1.0, 0.0]], &device);
        let batch = Batch::unlinked(source, target, neighbors);

        let identity = ShiftTransform::<TestBackend>::identity(&device);
        let loss = GaussianMixture::new(0.15).forward(&identity, &batch).into_scalar();
        assert!(loss >= 0.0, "loss = {}", loss);
        assert!(loss.abs() < 1e-5, "loss = {}", loss);
    }

    #[test]
    fn test_weighted_rows_are_normalised() {
        let device = Default::default();
        // One candidate on the target, one 1 unit away, weights 3 and 1
        let source = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0], [1.0, 0.0]], &device);
        let target = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0]], &device);
        let neighbors = Tensor::<TestBackend, 2>::from_floats([[3.0, 1.0]], &device);
        let batch = Batch::unlinked(source, target, neighbors);

        let identity = ShiftTransform::<TestBackend>::identity(&device);
        let loss = GaussianMixture::new(1.0).forward(&identity, &batch).into_scalar();
        let expected = -((3.0 + (-1.0f32).exp()) / 4.0).ln();
        assert!(loss > 0.0);
        assert!((loss - expected).abs() < 1e-5, "loss = {}", loss);
    }

    #[test]
    fn test_small_sigma_keeps_gradient() {
        let device = Default::default();
        let source = Tensor::<TrainBackend, 2>::from_floats([[0.0, 0.0]], &device);
        let target = Tensor::<TrainBackend, 2>::from_floats([[5.0, 0.0]], &device);
        let neighbors = Tensor::<TrainBackend, 2>::from_floats([[1.0]], &device);
        let batch = Batch::unlinked(source, target, neighbors);

        let shift = ShiftTransform::<TrainBackend>::identity(&device);
        let loss = GaussianMixture::new(1e-3).forward(&shift, &batch);
        let value = loss.clone().into_scalar();
        assert!(value.is_finite());
        assert!(value > 1e6);

        let grads = loss.backward();
        let grad = shift.shift().grad(&grads).unwrap().into_data();
        let grad = grad.as_slice::<f32>().unwrap();
        assert!(grad[0].is_finite() && grad[0] < 0.0);
    }
}
