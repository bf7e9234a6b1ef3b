//! Rigid body transform implementation.
//!
//! This module provides a 2-D rotation about the origin followed by a
//! translation.

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::trait_::{param_trainable, LinearWithTranslation, Trainable, Transform};
use crate::error::Result;
use crate::spatial::Vector2;

/// Rigid Body Transform (Rotation + Translation).
///
/// `T(p) = R(θ)·p + d` with a single rotation angle in radians. The rotation
/// is about the origin, so point clouds should be centered first.
#[derive(Module, Debug)]
pub struct RigidBodyTransform<B: Backend> {
    rotation: Param<Tensor<B, 1>>,    // [1] angle in radians
    translation: Param<Tensor<B, 1>>, // [2]
}

impl<B: Backend> RigidBodyTransform<B> {
    /// Create a new rigid body transform.
    ///
    /// # Arguments
    /// * `rotation` - Tensor of shape `[1]` containing the angle in radians
    /// * `translation` - Tensor of shape `[2]` containing the translation vector
    pub fn new(rotation: Tensor<B, 1>, translation: Tensor<B, 1>) -> Self {
        Self {
            rotation: Param::from_tensor(rotation),
            translation: Param::from_tensor(translation),
        }
    }

    /// Create an identity rigid body transform (no rotation, no translation).
    pub fn identity(device: &B::Device) -> Self {
        Self::new(Tensor::zeros([1], device), Tensor::zeros([2], device))
    }

    /// Get the rotation angle.
    pub fn rotation(&self) -> Tensor<B, 1> {
        self.rotation.val()
    }

    /// Get the translation vector.
    pub fn translation(&self) -> Tensor<B, 1> {
        self.translation.val()
    }

    /// Get the rotation angle on the host.
    pub fn angle(&self) -> f64 {
        self.rotation.val().into_data().iter::<f64>().next().unwrap_or(0.0)
    }

    /// Get the translation on the host.
    pub fn translation_vector(&self) -> Vector2 {
        let v: Vec<f64> = self.translation.val().into_data().iter::<f64>().collect();
        Vector2::new(v[0], v[1])
    }

    /// Build the rotation matrix `[[c, -s], [s, c]]`.
    fn rotation_matrix(&self) -> Tensor<B, 2> {
        let theta = self.rotation.val();
        let c = theta.clone().cos();
        let s = theta.sin();

        let row1 = Tensor::cat(vec![c.clone(), s.clone().neg()], 0).reshape([1, 2]);
        let row2 = Tensor::cat(vec![s, c], 0).reshape([1, 2]);

        Tensor::cat(vec![row1, row2], 0)
    }
}

impl<B: Backend> Transform<B> for RigidBodyTransform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row vectors: y = x @ R^T + t
        let r = self.rotation_matrix();
        let t = self.translation.val().reshape([1, 2]);
        points.matmul(r.transpose()) + t
    }
}

impl<B: Backend> Trainable for RigidBodyTransform<B> {
    const PARAMETERS: &'static [&'static str] = &["rotation", "translation"];
    const NAME: &'static str = "RigidBodyTransform";

    fn is_trainable(&self, name: &str) -> Result<bool> {
        match name {
            "rotation" => Ok(param_trainable(&self.rotation)),
            "translation" => Ok(param_trainable(&self.translation)),
            _ => Err(Self::unknown_parameter(name)),
        }
    }

    fn set_trainable(mut self, name: &str, trainable: bool) -> Result<Self> {
        match name {
            "rotation" => self.rotation = self.rotation.set_require_grad(trainable),
            "translation" => self.translation = self.translation.set_require_grad(trainable),
            _ => return Err(Self::unknown_parameter(name)),
        }
        Ok(self)
    }
}

impl<B: Backend> LinearWithTranslation for RigidBodyTransform<B> {
    const LINEAR: &'static str = "rotation";
    const TRANSLATION: &'static str = "translation";
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use std::f32::consts::FRAC_PI_2;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_rigid_identity_is_exact() {
        let device = Default::default();
        let transform = RigidBodyTransform::<TestBackend>::identity(&device);

        let points = Tensor::<TestBackend, 2>::from_floats([[1.25, -3.5], [1000.0, 0.001]], &device);
        let data = transform.transform_points(points).to_data();
        assert_eq!(data.as_slice::<f32>().unwrap(), &[1.25, -3.5, 1000.0, 0.001]);
    }

    #[test]
    fn test_rigid_rotation_quarter_turn() {
        let device = Default::default();
        let rotation = Tensor::<TestBackend, 1>::from_floats([FRAC_PI_2], &device);
        let translation = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device);
        let transform = RigidBodyTransform::new(rotation, translation);

        // (1, 0) rotated by 90 degrees is (0, 1), then shifted to (1, 1)
        let points = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device);
        let data = transform.transform_points(points).to_data();
        let slice = data.as_slice::<f32>().unwrap();

        assert!((slice[0] - 1.0).abs() < 1e-6);
        assert!((slice[1] - 1.0).abs() < 1e-6);
        assert!((transform.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
