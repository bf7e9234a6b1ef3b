//! Shift transform implementation.
//!
//! This module provides a pure translation, the first registration stage.

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::trait_::{param_trainable, Trainable, Transform};
use crate::error::Result;
use crate::spatial::Vector2;

/// Shift Transform.
///
/// Translates points by a fixed offset vector: `T(p) = p + d`.
#[derive(Module, Debug)]
pub struct ShiftTransform<B: Backend> {
    shift: Param<Tensor<B, 1>>, // [2]
}

impl<B: Backend> ShiftTransform<B> {
    /// Create a new shift transform.
    ///
    /// # Arguments
    /// * `shift` - Tensor of shape `[2]` containing the offset
    pub fn new(shift: Tensor<B, 1>) -> Self {
        Self {
            shift: Param::from_tensor(shift),
        }
    }

    /// Create a zero shift.
    pub fn identity(device: &B::Device) -> Self {
        Self::new(Tensor::zeros([2], device))
    }

    /// Get the shift vector.
    pub fn shift(&self) -> Tensor<B, 1> {
        self.shift.val()
    }

    /// Get the shift vector on the host.
    pub fn shift_vector(&self) -> Vector2 {
        let v: Vec<f64> = self.shift.val().into_data().iter::<f64>().collect();
        Vector2::new(v[0], v[1])
    }
}

impl<B: Backend> Transform<B> for ShiftTransform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        points + self.shift.val().reshape([1, 2])
    }
}

impl<B: Backend> Trainable for ShiftTransform<B> {
    const PARAMETERS: &'static [&'static str] = &["shift"];
    const NAME: &'static str = "ShiftTransform";

    fn is_trainable(&self, name: &str) -> Result<bool> {
        match name {
            "shift" => Ok(param_trainable(&self.shift)),
            _ => Err(Self::unknown_parameter(name)),
        }
    }

    fn set_trainable(mut self, name: &str, trainable: bool) -> Result<Self> {
        match name {
            "shift" => self.shift = self.shift.set_require_grad(trainable),
            _ => return Err(Self::unknown_parameter(name)),
        }
        Ok(self)
    }
}
