//! Transform types and operations.
//!
//! This module provides the transform traits and the five trainable models
//! used by the registration stages.

pub mod trait_;
pub mod shift;
pub mod rigid;
pub mod affine;
pub mod polynomial;
pub mod catmull_rom;

pub use trait_::{LinearWithTranslation, Trainable, Transform};
pub use shift::ShiftTransform;
pub use rigid::RigidBodyTransform;
pub use affine::AffineTransform;
pub use polynomial::{Polynomial3Transform, POLYNOMIAL3_TERMS};
pub use catmull_rom::CatmullRomSplineTransform;
