//! Metric implementations.
//!
//! Linked channels use [`SquaredDistance`]; unlinked channels use
//! [`GaussianMixture`] over the candidate weights. [`CorrespondenceMetric`]
//! picks the right one for a [`Correspondence`].

pub mod trait_;
pub mod squared_distance;
pub mod gaussian_mixture;

pub use trait_::Metric;
pub use squared_distance::SquaredDistance;
pub use gaussian_mixture::{GaussianMixture, DEFAULT_SIGMA};

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use locreg_core::transform::Transform;

use crate::batch::Batch;
use crate::correspondence::Correspondence;
use crate::error::Result;
use crate::validation::{validate_points_shape, validate_sigma};

/// Loss selected by the correspondence mode.
#[derive(Debug, Clone, Copy)]
pub enum CorrespondenceMetric {
    Linked(SquaredDistance),
    Unlinked(GaussianMixture),
}

impl CorrespondenceMetric {
    /// Metric matching `correspondence`; `sigma` is only used when unlinked.
    pub fn for_correspondence(correspondence: &Correspondence, sigma: f64) -> Self {
        match correspondence {
            Correspondence::Linked => Self::Linked(SquaredDistance::new()),
            Correspondence::Unlinked(_) => Self::Unlinked(GaussianMixture::new(sigma)),
        }
    }
}

impl<B: Backend> Metric<B> for CorrespondenceMetric {
    fn forward(&self, transform: &impl Transform<B>, batch: &Batch<B>) -> Tensor<B, 1> {
        match self {
            Self::Linked(metric) => metric.forward(transform, batch),
            Self::Unlinked(metric) => metric.forward(transform, batch),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Linked(metric) => <SquaredDistance as Metric<B>>::name(metric),
            Self::Unlinked(metric) => <GaussianMixture as Metric<B>>::name(metric),
        }
    }
}

/// Registration loss of `transform` mapping `source` (moving) onto `target`
/// (reference) under the given correspondence.
pub fn loss<B: Backend>(
    transform: &impl Transform<B>,
    source: Tensor<B, 2>,
    target: Tensor<B, 2>,
    correspondence: &Correspondence,
    sigma: f64,
) -> Result<Tensor<B, 1>> {
    validate_points_shape(&source, None)?;
    validate_points_shape(&target, None)?;
    correspondence.validate(target.dims()[0], source.dims()[0])?;

    let batch = match correspondence {
        Correspondence::Linked => Batch::linked(source, target),
        Correspondence::Unlinked(matrix) => {
            validate_sigma(sigma)?;
            let neighbors = matrix.to_tensor(&source.device());
            Batch::unlinked(source, target, neighbors)
        }
    };
    Ok(CorrespondenceMetric::for_correspondence(correspondence, sigma).forward(transform, &batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correspondence::NeighborMatrix;
    use burn_ndarray::NdArray;
    use locreg_core::transform::ShiftTransform;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_loss_linked() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0], [1.0, 0.0]], &device);
        let target = Tensor::<TestBackend, 2>::from_floats([[0.0, 2.0], [1.0, 0.0]], &device);
        let identity = ShiftTransform::<TestBackend>::identity(&device);

        let value = loss(&identity, source, target, &Correspondence::Linked, DEFAULT_SIGMA)
            .unwrap()
            .into_scalar();
        assert!((value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_loss_rejects_mismatched_inputs() {
        let device = Default::default();
        let source = Tensor::<TestBackend, 2>::zeros([3, 2], &device);
        let target = Tensor::<TestBackend, 2>::zeros([2, 2], &device);
        let identity = ShiftTransform::<TestBackend>::identity(&device);

        assert!(loss(&identity, source.clone(), target.clone(), &Correspondence::Linked, 0.15).is_err());

        let wrong = Correspondence::Unlinked(NeighborMatrix::zeros(3, 2));
        assert!(loss(&identity, source.clone(), target.clone(), &wrong, 0.15).is_err());

        let right = Correspondence::Unlinked(NeighborMatrix::zeros(2, 3));
        assert!(loss(&identity, source.clone(), target.clone(), &right, 0.15).is_ok());
        assert!(loss(&identity, source, target, &right, 0.0).is_err());
    }

    #[test]
    fn test_metric_selection() {
        let linked = CorrespondenceMetric::for_correspondence(&Correspondence::Linked, 0.15);
        assert_eq!(<CorrespondenceMetric as Metric<TestBackend>>::name(&linked), "SquaredDistance");

        let unlinked = CorrespondenceMetric::for_correspondence(
            &Correspondence::Unlinked(NeighborMatrix::zeros(1, 1)),
            0.15,
        );
        assert_eq!(<CorrespondenceMetric as Metric<TestBackend>>::name(&unlinked), "GaussianMixture");
    }
}
