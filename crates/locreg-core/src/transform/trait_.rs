//! Transform traits for 2-D coordinate mappings.
//!
//! [`Transform`] is the pure mapping; [`Trainable`] exposes the named
//! parameters so a training schedule can freeze and unfreeze them.

use burn::module::Param;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::error::{CoreError, Result};

/// Transform trait for spatial coordinate transformations.
///
/// Maps points of the moving channel into the frame of the reference channel.
pub trait Transform<B: Backend> {
    /// Apply transform to a batch of points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, 2]` containing the input points
    ///
    /// # Returns
    /// Tensor of shape `[Batch, 2]` containing the transformed points
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2>;
}

/// Named parameters that can be individually frozen.
///
/// Freezing only has an effect on autodiff backends: a frozen parameter does
/// not require gradients, so optimizers leave it untouched. On plain
/// backends every parameter reports as not trainable.
pub trait Trainable: Sized {
    /// Every parameter name, in declaration order.
    const PARAMETERS: &'static [&'static str];

    /// Short name used in errors and logs.
    const NAME: &'static str;

    /// Whether the parameter currently receives gradients.
    fn is_trainable(&self, name: &str) -> Result<bool>;

    /// Mark a parameter trainable or frozen.
    fn set_trainable(self, name: &str, trainable: bool) -> Result<Self>;

    /// Every parameter name.
    fn parameter_names(&self) -> &'static [&'static str] {
        Self::PARAMETERS
    }

    /// Names of the parameters that currently receive gradients.
    fn trainable_parameters(&self) -> Vec<&'static str> {
        Self::PARAMETERS
            .iter()
            .copied()
            .filter(|name| self.is_trainable(name).unwrap_or(false))
            .collect()
    }

    /// Stop updating a parameter.
    fn freeze(self, name: &str) -> Result<Self> {
        self.set_trainable(name, false)
    }

    /// Resume updating a parameter.
    fn unfreeze(self, name: &str) -> Result<Self> {
        self.set_trainable(name, true)
    }

    /// Error for a name outside [`Self::PARAMETERS`].
    fn unknown_parameter(name: &str) -> CoreError {
        CoreError::UnknownParameter {
            transform: Self::NAME,
            name: name.to_string(),
            expected: Self::PARAMETERS,
        }
    }
}

/// Transforms made of a linear part followed by a translation.
///
/// These are fitted in two phases: first the linear part with the
/// translation pinned at zero, then the translation alone.
pub trait LinearWithTranslation: Trainable {
    /// Name of the linear parameter.
    const LINEAR: &'static str;

    /// Name of the translation parameter.
    const TRANSLATION: &'static str;
}

pub(crate) fn param_trainable<B: Backend, const D: usize>(param: &Param<Tensor<B, D>>) -> bool {
    param.val().is_require_grad()
}
