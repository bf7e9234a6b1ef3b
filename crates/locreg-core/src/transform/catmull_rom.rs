//! Catmull-Rom spline transform implementation.
//!
//! This module provides a free-form deformation driven by a lattice of
//! control-point displacements, interpolated with Catmull-Rom cubics over the
//! 4x4 neighbourhood of each point.

use burn::module::{Module, Param};
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use super::trait_::{param_trainable, Trainable, Transform};
use crate::error::{CoreError, Result};
use crate::grid::ControlPointGrid;

/// Catmull-Rom Spline Transform (Free-form deformation).
///
/// `T(p) = p + cell_size * D(to_grid_space(p))`, where `D` interpolates the
/// control-point displacements (stored in grid units). The spline passes
/// through the control values, so a displacement set on one node is reached
/// exactly at that node. Points outside the padded lattice use the outermost
/// valid cell with the local coordinate clamped to `[0, 1]`.
#[derive(Module, Debug)]
pub struct CatmullRomSplineTransform<B: Backend> {
    /// Lattice geometry
    grid: ControlPointGrid,
    /// Control point displacements `[num_control_points, 2]`, grid units
    displacements: Param<Tensor<B, 2>>,
}

impl<B: Backend> CatmullRomSplineTransform<B> {
    /// Create a new spline transform.
    ///
    /// # Arguments
    /// * `grid` - Control-point lattice
    /// * `displacements` - Tensor of shape `[grid.node_count(), 2]` in grid units
    pub fn new(grid: ControlPointGrid, displacements: Tensor<B, 2>) -> Result<Self> {
        let [n, dims] = displacements.dims();
        if n != grid.node_count() || dims != 2 {
            return Err(CoreError::LengthMismatch {
                what: "control-point displacements",
                expected: grid.node_count(),
                actual: n,
            });
        }
        Ok(Self {
            grid,
            displacements: Param::from_tensor(displacements),
        })
    }

    /// Create a spline with all displacements at zero.
    pub fn identity(grid: ControlPointGrid, device: &B::Device) -> Self {
        let displacements = Tensor::zeros([grid.node_count(), 2], device);
        Self {
            grid,
            displacements: Param::from_tensor(displacements),
        }
    }

    /// Get the lattice geometry.
    pub fn grid(&self) -> &ControlPointGrid {
        &self.grid
    }

    /// Get the displacements.
    pub fn displacements(&self) -> Tensor<B, 2> {
        self.displacements.val()
    }

    /// Catmull-Rom weights of the four nodes around local coordinate `t`.
    fn catmull_rom_basis(t: Tensor<B, 1>) -> [Tensor<B, 1>; 4] {
        let t2 = t.clone().powi_scalar(2);
        let t3 = t.clone().powi_scalar(3);

        // w0 = (-t³ + 2t² - t) / 2
        let w0 = (t3.clone().neg() + t2.clone().mul_scalar(2.0) - t.clone()).div_scalar(2.0);
        // w1 = (3t³ - 5t² + 2) / 2
        let w1 = (t3.clone().mul_scalar(3.0) - t2.clone().mul_scalar(5.0))
            .add_scalar(2.0)
            .div_scalar(2.0);
        // w2 = (-3t³ + 4t² + t) / 2
        let w2 = (t3.clone().mul_scalar(-3.0) + t2.clone().mul_scalar(4.0) + t).div_scalar(2.0);
        // w3 = (t³ - t²) / 2
        let w3 = (t3 - t2).div_scalar(2.0);

        [w0, w1, w2, w3]
    }

    /// Weights stacked into a tensor `[Batch, 4]`.
    fn compute_basis_tensor(t: Tensor<B, 1>) -> Tensor<B, 2> {
        let [w0, w1, w2, w3] = Self::catmull_rom_basis(t);
        Tensor::cat(
            vec![
                w0.unsqueeze_dim::<2>(1),
                w1.unsqueeze_dim::<2>(1),
                w2.unsqueeze_dim::<2>(1),
                w3.unsqueeze_dim::<2>(1),
            ],
            1,
        )
    }

    /// Lower cell index and local coordinate along one axis.
    ///
    /// The cell index is clamped to `[1, n - 3]` so the stencil
    /// `index - 1 ..= index + 2` stays inside the lattice.
    fn locate(coord: Tensor<B, 1>, nodes: usize) -> (Tensor<B, 1, Int>, Tensor<B, 1>) {
        let cell = coord.clone().floor().clamp(1.0, (nodes - 3) as f64);
        let t = (coord - cell.clone()).clamp(0.0, 1.0);
        (cell.int() - 1, t)
    }

    /// Interpolated displacement, in grid units, at grid-space points.
    pub fn displacement_at(&self, grid_points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = grid_points.device();
        let batch_size = grid_points.dims()[0];
        let [nx, ny] = self.grid.dims();

        let gx = grid_points.clone().slice([0..batch_size, 0..1]).squeeze::<1>(1);
        let gy = grid_points.slice([0..batch_size, 1..2]).squeeze::<1>(1);

        let (start_x, tx) = Self::locate(gx, nx);
        let (start_y, ty) = Self::locate(gy, ny);

        let bx = Self::compute_basis_tensor(tx); // [Batch, 4]
        let by = Self::compute_basis_tensor(ty); // [Batch, 4]

        // W[b, i, j] = Bx[b, i] * By[b, j]
        let weights = bx.unsqueeze_dim::<3>(2) * by.unsqueeze_dim::<3>(1);
        let weights = weights.reshape([batch_size, 16, 1]);

        let range = Tensor::<B, 1, Int>::from_ints([0, 1, 2, 3], &device);
        let idx_x = start_x.reshape([batch_size, 1, 1]) + range.clone().reshape([1, 4, 1]);
        let idx_y = start_y.reshape([batch_size, 1, 1]) + range.reshape([1, 1, 4]);

        // Broadcast both to [Batch, 4, 4] by adding zeros
        let zeros = Tensor::<B, 3, Int>::zeros([1, 4, 4], &device);
        let idx_x = idx_x + zeros.clone();
        let idx_y = idx_y + zeros;

        // Flat index = x * Ny + y
        let flat_indices = idx_x.mul_scalar(ny as i64) + idx_y;
        let gather_indices = flat_indices.reshape([batch_size * 16]);

        let coeffs = self
            .displacements
            .val()
            .select(0, gather_indices)
            .reshape([batch_size, 16, 2]);

        (coeffs * weights).sum_dim(1).reshape([batch_size, 2])
    }
}

impl<B: Backend> Transform<B> for CatmullRomSplineTransform<B> {
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let grid_points = self.grid.to_grid_space_tensor(points.clone());
        let displacement = self.displacement_at(grid_points);
        points + displacement.mul_scalar(self.grid.cell_size())
    }
}

impl<B: Backend> Trainable for CatmullRomSplineTransform<B> {
    const PARAMETERS: &'static [&'static str] = &["displacements"];
    const NAME: &'static str = "CatmullRomSplineTransform";

    fn is_trainable(&self, name: &str) -> Result<bool> {
        match name {
            "displacements" => Ok(param_trainable(&self.displacements)),
            _ => Err(Self::unknown_parameter(name)),
        }
    }

    fn set_trainable(mut self, name: &str, trainable: bool) -> Result<Self> {
        match name {
            "displacements" => self.displacements = self.displacements.set_require_grad(trainable),
            _ => return Err(Self::unknown_parameter(name)),
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Bounds, Point2};
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn grid() -> ControlPointGrid {
        let bounds = Bounds::new(Point2::new(0.0, 0.0), Point2::new(40.0, 30.0));
        ControlPointGrid::build(&bounds, 10.0, 1).unwrap()
    }

    #[test]
    fn test_spline_weights_partition_of_unity() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 1>::from_floats([0.0, 0.25, 0.5, 0.9, 1.0], &device);
        let basis = CatmullRomSplineTransform::<TestBackend>::compute_basis_tensor(t);
        let sums = basis.sum_dim(1).to_data();
        for s in sums.as_slice::<f32>().unwrap() {
            assert!((s - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_spline_identity() {
        let device = Default::default();
        let transform = CatmullRomSplineTransform::<TestBackend>::identity(grid(), &device);

        let points = Tensor::<TestBackend, 2>::from_floats([[5.0, 5.0], [-100.0, 250.0]], &device);
        let data = transform.transform_points(points).to_data();
        assert_eq!(data.as_slice::<f32>().unwrap(), &[5.0, 5.0, -100.0, 250.0]);
    }

    #[test]
    fn test_spline_interpolates_control_value() {
        let device = Default::default();
        let grid = grid();
        // extent 40 x 30 with cell 10 -> 4 x 3 cells, lattice 8 x 7
        assert_eq!(grid.dims(), [8, 7]);

        let mut values = vec![0.0f32; grid.node_count() * 2];
        let node = grid.flat_index(3, 3);
        values[node * 2] = 0.5;
        values[node * 2 + 1] = -0.25;
        let displacements =
            Tensor::<TestBackend, 2>::from_data(TensorData::new(values, [grid.node_count(), 2]), &device);
        let transform = CatmullRomSplineTransform::new(grid.clone(), displacements).unwrap();

        let at_node = grid.from_grid_space([3.0, 3.0]);
        let points = Tensor::<TestBackend, 2>::from_floats(
            [[at_node[0] as f32, at_node[1] as f32]],
            &device,
        );
        let data = transform.transform_points(points).to_data();
        let slice = data.as_slice::<f32>().unwrap();

        assert!((slice[0] as f64 - (at_node[0] + 5.0)).abs() < 1e-4);
        assert!((slice[1] as f64 - (at_node[1] - 2.5)).abs() < 1e-4);
    }

    #[test]
    fn test_spline_rejects_wrong_table() {
        let device = Default::default();
        let displacements = Tensor::<TestBackend, 2>::zeros([3, 2], &device);
        assert!(CatmullRomSplineTransform::new(grid(), displacements).is_err());
    }
}
