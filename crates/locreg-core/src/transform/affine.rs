//! Affine transform implementation.
//!
//! This module provides an affine transform (linear transformation + translation).

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::trait_::{param_trainable, LinearWithTranslation, Trainable, Transform};
use crate::error::Result;
use crate::spatial::{Matrix2, Vector2};

/// Affine Transform (Linear transformation + Translation).
///
/// `T(p) = A·p + d`, where `A` is a free 2x2 matrix (rotation, scale, shear)
/// acting about the origin.
#[derive(Module, Debug)]
pub struct AffineTransform<B: Backend> {
    matrix: Param<Tensor<B, 2>>,      // [2, 2]
    translation: Param<Tensor<B, 1>>, // [2]
}

impl<B: Backend> AffineTransform<B> {
    /// Create a new affine transform.
    ///
    /// # Arguments
    /// * `matrix` - Tensor of shape `[2, 2]` containing the linear part
    /// * `translation` - Tensor of shape `[2]` containing the translation vector
    pub fn new(matrix: Tensor<B, 2>, translation: Tensor<B, 1>) -> Self {
        Self {
            matrix: Param::from_tensor(matrix),
            translation: Param::from_tensor(translation),
        }
    }

    /// Create an identity affine transform.
    pub fn identity(device: &B::Device) -> Self {
        Self::new(Tensor::eye(2, device), Tensor::zeros([2], device))
    }

    /// Get the transformation matrix.
    pub fn matrix(&self) -> Tensor<B, 2> {
        self.matrix.val()
    }

    /// Get the translation vector.
    pub fn translation(&self) -> Tensor<B, 1> {
        self.translation.val()
    }

    /// Get the transformation matrix on the host.
    pub fn matrix_host(&self) -> Matrix2 {
        let v: Vec<f64> = self.matrix.val().into_data().iter::<f64>().collect();
        Matrix2::new(v[0], v[1], v[2], v[3])
    }

    /// Get the translation on the host.
    pub fn translation_vector(&self) -> Vector2 {
        let v: Vec<f64> = self.translation.val().into_data().iter::<f64>().collect();
        Vector2::new(v[0], v[1])
    }
}

impl<B: Backend> Transform<B> for AffineTransform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row vectors: y = x @ A^T + t
        let a = self.matrix.val();
        let t = self.translation.val().reshape([1, 2]);
        points.matmul(a.transpose()) + t
    }
}

impl<B: Backend> Trainable for AffineTransform<B> {
    const PARAMETERS: &'static [&'static str] = &["matrix", "translation"];
    const NAME: &'static str = "AffineTransform";

    fn is_trainable(&self, name: &str) -> Result<bool> {
        match name {
            "matrix" => Ok(param_trainable(&self.matrix)),
            "translation" => Ok(param_trainable(&self.translation)),
            _ => Err(Self::unknown_parameter(name)),
        }
    }

    fn set_trainable(mut self, name: &str, trainable: bool) -> Result<Self> {
        match name {
            "matrix" => self.matrix = self.matrix.set_require_grad(trainable),
            "translation" => self.translation = self.translation.set_require_grad(trainable),
            _ => return Err(Self::unknown_parameter(name)),
        }
        Ok(self)
    }
}

impl<B: Backend> LinearWithTranslation for AffineTransform<B> {
    const LINEAR: &'static str = "matrix";
    const TRANSLATION: &'static str = "translation";
}
