//! Optimizer trait for parameter optimization.
//!
//! This module defines the core Optimizer trait used by the training loop.

use burn::module::AutodiffModule;
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;

/// Optimizer trait for training transforms.
///
/// Optimizers update the trainable transform parameters based on computed
/// gradients to minimize the registration loss. Frozen parameters receive no
/// gradient and are left untouched.
///
/// # Type Parameters
/// * `M` - The module/transform type to optimize
/// * `B` - The backend for tensor operations (must support autodiff)
pub trait Optimizer<M, B>
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
{
    /// Perform a single optimization step.
    ///
    /// # Arguments
    /// * `module` - The module/transform to update
    /// * `gradients` - The gradients of the loss with respect to module parameters
    ///
    /// # Returns
    /// The updated module with new parameter values
    fn step(&mut self, module: M, gradients: GradientsParams) -> M;

    /// Get the current learning rate.
    fn learning_rate(&self) -> f64;

    /// Set the learning rate.
    fn set_learning_rate(&mut self, lr: f64);
}
