//! Gradient-based training loop.
//!
//! [`Registration::train`] runs a fixed number of iterations. Each iteration
//! takes one optimizer step per batch, in batch order, all sharing the same
//! model and optimizer state. There is no convergence check.

use std::marker::PhantomData;

use burn::module::AutodiffModule;
use burn::optim::GradientsParams;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use locreg_core::transform::{LinearWithTranslation, Trainable, Transform};

use crate::batch::Batch;
use crate::error::{RegistrationError, Result};
use crate::metric::Metric;
use crate::optimizer::{AdaGradOptimizer, Optimizer};
use crate::progress::ProgressTracker;
use crate::validation::validate_learning_rate;

pub struct Registration<B, O, M, T>
where
    B: AutodiffBackend,
    O: Optimizer<T, B>,
    M: Metric<B>,
    T: Transform<B> + AutodiffModule<B>,
{
    optimizer: O,
    metric: M,
    tracker: ProgressTracker,
    _phantom: PhantomData<(B, T)>,
}

impl<B, O, M, T> Registration<B, O, M, T>
where
    B: AutodiffBackend,
    O: Optimizer<T, B>,
    M: Metric<B>,
    T: Transform<B> + AutodiffModule<B>,
{
    pub fn new(optimizer: O, metric: M) -> Self {
        Self {
            optimizer,
            metric,
            tracker: ProgressTracker::new(),
            _phantom: PhantomData,
        }
    }

    /// Report progress through `tracker`.
    pub fn with_tracker(mut self, tracker: ProgressTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Sum of the batch losses without updating the model.
    pub fn evaluate(&self, transform: &T, batches: &[Batch<B>]) -> f64 {
        batches
            .iter()
            .map(|batch| {
                self.metric
                    .forward(transform, batch)
                    .into_scalar()
                    .elem::<f64>()
            })
            .sum()
    }

    /// Train `transform` and return it with the final loss.
    ///
    /// The final loss is the sum of the batch losses of the last iteration,
    /// each evaluated just before its update. With zero iterations the loss
    /// is evaluated once and the model is returned unchanged.
    pub fn train(
        &mut self,
        mut transform: T,
        batches: &[Batch<B>],
        iterations: usize,
        learning_rate: f64,
    ) -> Result<(T, f64)> {
        validate_learning_rate(learning_rate)?;
        if batches.is_empty() {
            return Err(RegistrationError::invalid_configuration(
                "training needs at least one batch",
            ));
        }

        self.optimizer.set_learning_rate(learning_rate);
        self.tracker.start();

        if iterations == 0 {
            let loss = self.evaluate(&transform, batches);
            self.tracker.complete(0, loss, learning_rate);
            return Ok((transform, loss));
        }

        let mut final_loss = 0.0;
        for i in 0..iterations {
            let mut iteration_loss = 0.0;
            for batch in batches {
                // Forward pass
                let loss = self.metric.forward(&transform, batch);
                iteration_loss += loss.clone().into_scalar().elem::<f64>();

                // Backward pass
                let grads = loss.backward();
                let grads_params = GradientsParams::from_grads(grads, &transform);

                // Optimizer step
                transform = self.optimizer.step(transform, grads_params);
            }

            self.tracker
                .update(i + 1, Some(iterations), iteration_loss, learning_rate);
            final_loss = iteration_loss;
        }

        self.tracker.complete(iterations, final_loss, learning_rate);
        Ok((transform, final_loss))
    }
}

/// Phase 1 of a two-phase fit: train the linear part with the translation
/// frozen, using a fresh optimizer.
pub fn train_linear_phase<B, M, T>(
    transform: T,
    metric: M,
    batches: &[Batch<B>],
    iterations: usize,
    learning_rate: f64,
    tracker: &ProgressTracker,
) -> Result<(T, f64)>
where
    B: AutodiffBackend,
    M: Metric<B>,
    T: Transform<B> + AutodiffModule<B> + LinearWithTranslation,
{
    let transform = transform.unfreeze(T::LINEAR)?.freeze(T::TRANSLATION)?;
    let tracker = tracker.for_phase(format!("{}/linear", tracker.phase()));
    Registration::new(AdaGradOptimizer::<T, B>::new(learning_rate), metric)
        .with_tracker(tracker)
        .train(transform, batches, iterations, learning_rate)
}

/// Phase 2 of a two-phase fit: train the translation with the linear part
/// frozen, using a fresh optimizer.
pub fn train_translation_phase<B, M, T>(
    transform: T,
    metric: M,
    batches: &[Batch<B>],
    iterations: usize,
    learning_rate: f64,
    tracker: &ProgressTracker,
) -> Result<(T, f64)>
where
    B: AutodiffBackend,
    M: Metric<B>,
    T: Transform<B> + AutodiffModule<B> + LinearWithTranslation,
{
    let transform = transform.freeze(T::LINEAR)?.unfreeze(T::TRANSLATION)?;
    let tracker = tracker.for_phase(format!("{}/translation", tracker.phase()));
    Registration::new(AdaGradOptimizer::<T, B>::new(learning_rate), metric)
        .with_tracker(tracker)
        .train(transform, batches, iterations, learning_rate)
}

/// Train every parameter of `transform` with a fresh optimizer.
pub fn train_single_phase<B, M, T>(
    transform: T,
    metric: M,
    batches: &[Batch<B>],
    iterations: usize,
    learning_rate: f64,
    tracker: &ProgressTracker,
) -> Result<(T, f64)>
where
    B: AutodiffBackend,
    M: Metric<B>,
    T: Transform<B> + AutodiffModule<B>,
{
    Registration::new(AdaGradOptimizer::<T, B>::new(learning_rate), metric)
        .with_tracker(tracker.clone())
        .train(transform, batches, iterations, learning_rate)
}

/// Linear part first, then translation, each for `iterations` iterations.
///
/// Returns the loss of the translation phase.
pub fn train_two_phase<B, M, T>(
    transform: T,
    metric: M,
    batches: &[Batch<B>],
    iterations: usize,
    learning_rate: f64,
    tracker: &ProgressTracker,
) -> Result<(T, f64)>
where
    B: AutodiffBackend,
    M: Metric<B> + Clone,
    T: Transform<B> + AutodiffModule<B> + LinearWithTranslation,
{
    let (transform, linear_loss) =
        train_linear_phase(transform, metric.clone(), batches, iterations, learning_rate, tracker)?;
    tracing::debug!("[{}] linear phase finished with loss {:.6}", tracker.phase(), linear_loss);
    train_translation_phase(transform, metric, batches, iterations, learning_rate, tracker)
}
