//! Optimizer module for training transforms.
//!
//! Registration trains with AdaGrad, wrapped behind the [`Optimizer`] trait
//! so the training loop does not depend on burn's adaptor types.
//!
//! # Examples
//!
//! ```rust,ignore
//! use locreg_registration::optimizer::{AdaGradOptimizer, Optimizer};
//!
//! let mut optimizer = AdaGradOptimizer::<ShiftTransform<B>, B>::new(1.0);
//! let model = optimizer.step(model, grads);
//! ```

pub mod trait_;
pub mod adagrad;

pub use trait_::Optimizer;
pub use adagrad::AdaGradOptimizer;
