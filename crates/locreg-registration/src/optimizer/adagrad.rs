use crate::optimizer::Optimizer;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{AdaGrad, AdaGradConfig, GradientsParams, Optimizer as BurnOptimizer};
use burn::tensor::backend::AutodiffBackend;

/// AdaGrad optimizer.
///
/// A wrapper around Burn's AdaGrad optimizer. Each parameter element keeps
/// its own accumulated squared gradient, so the accumulator belongs to one
/// fit; create a new optimizer for every training phase.
pub struct AdaGradOptimizer<M: AutodiffModule<B>, B: AutodiffBackend> {
    optimizer: OptimizerAdaptor<AdaGrad, M, B>,
    learning_rate: f64,
}

impl<M: AutodiffModule<B>, B: AutodiffBackend> AdaGradOptimizer<M, B> {
    /// Create a new AdaGrad optimizer.
    ///
    /// # Arguments
    /// * `learning_rate` - The learning rate
    pub fn new(learning_rate: f64) -> Self {
        Self {
            optimizer: AdaGradConfig::new().init(),
            learning_rate,
        }
    }

    /// Create a new AdaGrad optimizer with a custom epsilon.
    ///
    /// # Arguments
    /// * `learning_rate` - The learning rate
    /// * `epsilon` - Small value added to the accumulator root
    pub fn with_epsilon(learning_rate: f64, epsilon: f32) -> Self {
        Self {
            optimizer: AdaGradConfig::new().with_epsilon(epsilon).init(),
            learning_rate,
        }
    }
}

impl<M, B> Optimizer<M, B> for AdaGradOptimizer<M, B>
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
{
    fn step(&mut self, module: M, gradients: GradientsParams) -> M {
        self.optimizer.step(self.learning_rate, module, gradients)
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}
