//! Third-degree polynomial transform implementation.

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};

use super::trait_::{param_trainable, Trainable, Transform};
use crate::error::Result;

/// Number of monomials of a bivariate cubic.
pub const POLYNOMIAL3_TERMS: usize = 10;

/// Bivariate cubic polynomial map.
///
/// Each output coordinate is a linear combination of the monomials
/// `1, x, y, x², xy, y², x³, x²y, xy², y³`, evaluated on `p / scale`; the
/// result is multiplied back by `scale`. With a scale of the largest
/// absolute coordinate every monomial stays within `[-1, 1]`, so the cubic
/// terms train at the same learning rate as the linear ones.
#[derive(Module, Debug)]
pub struct Polynomial3Transform<B: Backend> {
    coefficients: Param<Tensor<B, 2>>, // [10, 2]
    scale: f64,
}

impl<B: Backend> Polynomial3Transform<B> {
    /// Create a new polynomial transform.
    ///
    /// # Arguments
    /// * `coefficients` - Tensor of shape `[10, 2]`, one column per output axis
    /// * `scale` - Coordinate normalisation applied before evaluating the basis
    pub fn new(coefficients: Tensor<B, 2>, scale: f64) -> Self {
        Self {
            coefficients: Param::from_tensor(coefficients),
            scale,
        }
    }

    /// Create the identity map: only the `x` and `y` monomials are non-zero.
    pub fn identity(scale: f64, device: &B::Device) -> Self {
        let mut values = vec![0.0f32; POLYNOMIAL3_TERMS * 2];
        values[2] = 1.0; // x -> x'
        values[5] = 1.0; // y -> y'
        let coefficients = Tensor::from_data(TensorData::new(values, [POLYNOMIAL3_TERMS, 2]), device);
        Self::new(coefficients, scale)
    }

    /// Get the coefficients.
    pub fn coefficients(&self) -> Tensor<B, 2> {
        self.coefficients.val()
    }

    /// Get the coordinate normalisation.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Monomial basis of `[N, 2]` points as an `[N, 10]` tensor.
    pub fn basis(points: Tensor<B, 2>) -> Tensor<B, 2> {
        let [n, _] = points.dims();
        let x = points.clone().slice([0..n, 0..1]);
        let y = points.slice([0..n, 1..2]);
        let one = x.ones_like();
        let x2 = x.clone() * x.clone();
        let y2 = y.clone() * y.clone();
        let xy = x.clone() * y.clone();

        Tensor::cat(
            vec![
                one,
                x.clone(),
                y.clone(),
                x2.clone(),
                xy.clone(),
                y2.clone(),
                x2.clone() * x.clone(),
                x2 * y.clone(),
                xy * y.clone(),
                y2 * y,
            ],
            1,
        )
    }
}

impl<B: Backend> Transform<B> for Polynomial3Transform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let normalised = points.div_scalar(self.scale);
        Self::basis(normalised)
            .matmul(self.coefficients.val())
            .mul_scalar(self.scale)
    }
}

impl<B: Backend> Trainable for Polynomial3Transform<B> {
    const PARAMETERS: &'static [&'static str] = &["coefficients"];
    const NAME: &'static str = "Polynomial3Transform";

    fn is_trainable(&self, name: &str) -> Result<bool> {
        match name {
            "coefficients" => Ok(param_trainable(&self.coefficients)),
            _ => Err(Self::unknown_parameter(name)),
        }
    }

    fn set_trainable(mut self, name: &str, trainable: bool) -> Result<Self> {
        match name {
            "coefficients" => self.coefficients = self.coefficients.set_require_grad(trainable),
            _ => return Err(Self::unknown_parameter(name)),
        }
        Ok(self)
    }
}
