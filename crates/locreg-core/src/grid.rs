//! Control-point lattice geometry for the spline stage.
//!
//! Grid space is physical space divided by the cell size and shifted so the
//! data bounding box starts `edge_padding` cells inside the lattice:
//!
//! `to_grid_space(p) = p / cell_size - origin + edge_padding`
//!
//! with `origin = min / cell_size` taken from the bounding box of both
//! channels. Each axis holds `floor(extent / cell_size) + 2 * edge_padding + 2`
//! nodes so every point inside the box has a full 4x4 neighbourhood.

use burn::module::{AutodiffModule, Content, Module, ModuleDisplay, ModuleDisplayDefault};
use burn::record::{PrecisionSettings, Record};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::points::PointSet;
use crate::spatial::Bounds;

/// Largest lattice the builder accepts.
pub const MAX_CONTROL_POINTS: usize = 1 << 24;

/// Geometry of the regular control-point lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlPointGrid {
    /// Lower corner of the data in grid units.
    origin: [f64; 2],
    /// Physical units per grid unit.
    cell_size: f64,
    /// Extra cells kept around the data.
    edge_padding: usize,
    /// Nodes along x and y.
    dims: [usize; 2],
}

impl ControlPointGrid {
    /// Build the lattice covering `bounds`.
    pub fn build(bounds: &Bounds, cell_size: f64, edge_padding: usize) -> Result<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(CoreError::invalid_grid(format!(
                "cell size must be positive and finite, got {}",
                cell_size
            )));
        }
        if edge_padding < 1 {
            return Err(CoreError::invalid_grid("edge padding must be at least 1"));
        }
        let (min, extent) = (bounds.min(), bounds.extent());
        if !(min.x.is_finite() && min.y.is_finite() && extent.x.is_finite() && extent.y.is_finite()) {
            return Err(CoreError::invalid_grid("data bounds are not finite"));
        }

        let too_fine = || {
            CoreError::invalid_grid(format!(
                "cell size {} needs more than {} control points",
                cell_size, MAX_CONTROL_POINTS
            ))
        };
        let pad = edge_padding
            .checked_mul(2)
            .and_then(|p| p.checked_add(2))
            .ok_or_else(too_fine)?;
        let axis = |e: f64| -> Result<usize> {
            let cells = (e / cell_size).floor();
            if !(cells < MAX_CONTROL_POINTS as f64) {
                return Err(too_fine());
            }
            (cells as usize).checked_add(pad).ok_or_else(too_fine)
        };
        let dims = [axis(extent.x)?, axis(extent.y)?];
        match dims[0].checked_mul(dims[1]) {
            Some(n) if n <= MAX_CONTROL_POINTS => {}
            _ => return Err(too_fine()),
        }

        let origin = [min.x / cell_size, min.y / cell_size];
        if !(origin[0].is_finite() && origin[1].is_finite()) {
            return Err(CoreError::invalid_grid(format!(
                "cell size {} puts the grid origin out of range",
                cell_size
            )));
        }
        Ok(Self {
            origin,
            cell_size,
            edge_padding,
            dims,
        })
    }

    /// Build the lattice covering the union of several point sets.
    pub fn from_point_sets<B: Backend>(
        sets: &[&PointSet<B>],
        cell_size: f64,
        edge_padding: usize,
    ) -> Result<Self> {
        let bounds = sets
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.bounds())
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .reduce(|a, b| a.union(&b))
            .ok_or_else(|| CoreError::empty("cannot build a control-point grid without points"))?;
        Self::build(&bounds, cell_size, edge_padding)
    }

    /// Get the grid origin in grid units.
    pub fn origin(&self) -> [f64; 2] {
        self.origin
    }

    /// Get the cell size.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Get the edge padding.
    pub fn edge_padding(&self) -> usize {
        self.edge_padding
    }

    /// Get the lattice dimensions.
    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }

    /// Total number of control points.
    pub fn node_count(&self) -> usize {
        self.dims[0] * self.dims[1]
    }

    /// Row of node `(ix, iy)` in the displacement table.
    pub fn flat_index(&self, ix: usize, iy: usize) -> usize {
        ix * self.dims[1] + iy
    }

    fn shift(&self) -> [f64; 2] {
        let pad = self.edge_padding as f64;
        [self.origin[0] - pad, self.origin[1] - pad]
    }

    /// Map a physical point to grid space.
    pub fn to_grid_space(&self, p: [f64; 2]) -> [f64; 2] {
        let s = self.shift();
        [p[0] / self.cell_size - s[0], p[1] / self.cell_size - s[1]]
    }

    /// Map a grid-space point back to physical space.
    pub fn from_grid_space(&self, g: [f64; 2]) -> [f64; 2] {
        let s = self.shift();
        [(g[0] + s[0]) * self.cell_size, (g[1] + s[1]) * self.cell_size]
    }

    /// Tensor version of [`Self::to_grid_space`] for `[N, 2]` points.
    pub fn to_grid_space_tensor<B: Backend>(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let s = self.shift_tensor::<B>(&points.device());
        points.div_scalar(self.cell_size) - s
    }

    /// Tensor version of [`Self::from_grid_space`] for `[N, 2]` points.
    pub fn from_grid_space_tensor<B: Backend>(&self, grid_points: Tensor<B, 2>) -> Tensor<B, 2> {
        let s = self.shift_tensor::<B>(&grid_points.device());
        (grid_points + s).mul_scalar(self.cell_size)
    }

    fn shift_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let s = self.shift();
        Tensor::<B, 1>::from_floats([s[0] as f32, s[1] as f32], device).reshape([1, 2])
    }

    /// Physical position of every control point, in displacement-table order.
    pub fn node_positions(&self) -> Vec<[f64; 2]> {
        let [nx, ny] = self.dims;
        (0..nx)
            .flat_map(|ix| (0..ny).map(move |iy| [ix as f64, iy as f64]))
            .map(|g| self.from_grid_space(g))
            .collect()
    }
}

impl<B: Backend> Record<B> for ControlPointGrid {
    type Item<S: PrecisionSettings> = ControlPointGrid;

    fn into_item<S: PrecisionSettings>(self) -> Self::Item<S> {
        self
    }

    fn from_item<S: PrecisionSettings>(item: Self::Item<S>, _device: &B::Device) -> Self {
        item
    }
}

impl<B: Backend> Module<B> for ControlPointGrid {
    type Record = Self;

    fn visit<V: burn::module::ModuleVisitor<B>>(&self, _visitor: &mut V) {}

    fn map<M: burn::module::ModuleMapper<B>>(self, _mapper: &mut M) -> Self {
        self
    }

    fn into_record(self) -> Self::Record {
        self
    }

    fn load_record(self, record: Self::Record) -> Self {
        record
    }

    fn collect_devices(&self, devices: Vec<B::Device>) -> Vec<B::Device> {
        devices
    }

    fn to_device(self, _device: &B::Device) -> Self {
        self
    }

    fn fork(self, _device: &B::Device) -> Self {
        self
    }
}

impl<B: AutodiffBackend> AutodiffModule<B> for ControlPointGrid {
    type InnerModule = ControlPointGrid;

    fn valid(&self) -> Self::InnerModule {
        self.clone()
    }
}

impl ModuleDisplayDefault for ControlPointGrid {
    fn content(&self, content: Content) -> Option<Content> {
        Some(content.set_top_level_type(&format!(
            "ControlPointGrid {}x{}",
            self.dims[0], self.dims[1]
        )))
    }
}

impl ModuleDisplay for ControlPointGrid {}
