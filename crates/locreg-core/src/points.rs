//! Point clouds of one acquisition channel.
//!
//! A [`PointSet`] holds `[N, 2]` physical coordinates on a burn device plus
//! optional per-point frame ids used for batching.

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};

use crate::error::{CoreError, Result};
use crate::spatial::{Bounds, Point2, Vector2};

/// Build an integer index tensor usable with `Tensor::select`.
pub fn index_tensor<B: Backend>(indices: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<i64> = indices.iter().map(|&i| i as i64).collect();
    Tensor::from_data(TensorData::new(values, [indices.len()]), device)
}

/// Read an `[N, 2]` tensor back to host coordinates.
pub fn tensor_to_coords<B: Backend>(points: Tensor<B, 2>) -> Vec<[f64; 2]> {
    let values: Vec<f64> = points.into_data().iter::<f64>().collect();
    values.chunks_exact(2).map(|c| [c[0], c[1]]).collect()
}

/// Upload host coordinates as an `[N, 2]` tensor.
pub fn coords_to_tensor<B: Backend>(coords: &[[f64; 2]], device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = coords.iter().flat_map(|c| [c[0] as f32, c[1] as f32]).collect();
    Tensor::from_data(TensorData::new(values, [coords.len(), 2]), device)
}

/// Localizations of one channel.
#[derive(Debug, Clone)]
pub struct PointSet<B: Backend> {
    positions: Tensor<B, 2>,
    frames: Option<Vec<u32>>,
}

impl<B: Backend> PointSet<B> {
    /// Create a point set from host coordinates.
    pub fn from_coords(coords: &[[f64; 2]], device: &B::Device) -> Self {
        Self {
            positions: coords_to_tensor(coords, device),
            frames: None,
        }
    }

    /// Create a point set from an `[N, 2]` tensor.
    pub fn from_tensor(positions: Tensor<B, 2>) -> Result<Self> {
        let [_, dims] = positions.dims();
        if dims != 2 {
            return Err(CoreError::LengthMismatch {
                what: "coordinate columns",
                expected: 2,
                actual: dims,
            });
        }
        Ok(Self {
            positions,
            frames: None,
        })
    }

    /// Attach one frame id per point.
    pub fn with_frames(mut self, frames: Vec<u32>) -> Result<Self> {
        if frames.len() != self.len() {
            return Err(CoreError::LengthMismatch {
                what: "frame ids",
                expected: self.len(),
                actual: frames.len(),
            });
        }
        self.frames = Some(frames);
        Ok(self)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.positions.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the coordinates as an `[N, 2]` tensor.
    pub fn positions(&self) -> Tensor<B, 2> {
        self.positions.clone()
    }

    /// Get the frame ids, if any.
    pub fn frames(&self) -> Option<&[u32]> {
        self.frames.as_deref()
    }

    /// Get the device the coordinates live on.
    pub fn device(&self) -> B::Device {
        self.positions.device()
    }

    /// Copy the coordinates to the host.
    pub fn to_coords(&self) -> Vec<[f64; 2]> {
        tensor_to_coords(self.positions.clone())
    }

    /// Axis-aligned bounding box.
    pub fn bounds(&self) -> Result<Bounds> {
        Bounds::from_coords(&self.to_coords())
            .ok_or_else(|| CoreError::empty("bounding box of an empty point set"))
    }

    /// Centroid of the points.
    pub fn mean(&self) -> Result<Point2> {
        let coords = self.to_coords();
        if coords.is_empty() {
            return Err(CoreError::empty("mean of an empty point set"));
        }
        let sum = coords
            .iter()
            .fold(Vector2::zeros(), |acc, c| acc + Vector2::new(c[0], c[1]));
        Ok(Point2::from(sum / coords.len() as f64))
    }

    /// Subset of the points (and their frame ids) in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        let device = self.device();
        let positions = self
            .positions
            .clone()
            .select(0, index_tensor::<B>(indices, &device));
        let frames = self
            .frames
            .as_ref()
            .map(|f| indices.iter().map(|&i| f[i]).collect());
        Self { positions, frames }
    }

    /// Copy of the set moved by `offset`.
    pub fn translate(&self, offset: Vector2) -> Self {
        let device = self.device();
        let offset = Tensor::<B, 1>::from_floats([offset.x as f32, offset.y as f32], &device)
            .reshape([1, 2]);
        Self {
            positions: self.positions.clone() + offset,
            frames: self.frames.clone(),
        }
    }

    /// Replace the coordinates, keeping the number of points.
    pub fn set_positions(&mut self, positions: Tensor<B, 2>) -> Result<()> {
        let [n, dims] = positions.dims();
        if dims != 2 {
            return Err(CoreError::LengthMismatch {
                what: "coordinate columns",
                expected: 2,
                actual: dims,
            });
        }
        if n != self.len() {
            return Err(CoreError::LengthMismatch {
                what: "replacement positions",
                expected: self.len(),
                actual: n,
            });
        }
        self.positions = positions;
        Ok(())
    }

    /// Distinct frame ids in ascending order.
    pub fn unique_frames(&self) -> Vec<u32> {
        let mut frames = self.frames.clone().unwrap_or_default();
        frames.sort_unstable();
        frames.dedup();
        frames
    }

    /// Indices of the points recorded in `frame`.
    pub fn indices_of_frame(&self, frame: u32) -> Vec<usize> {
        self.frames
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .filter(|(_, &f)| f == frame)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample() -> PointSet<TestBackend> {
        let device = Default::default();
        PointSet::from_coords(&[[0.0, 0.0], [2.0, 4.0], [4.0, -2.0], [6.0, 2.0]], &device)
            .with_frames(vec![3, 1, 3, 1])
            .unwrap()
    }

    #[test]
    fn test_point_set_basics() {
        let set = sample();
        assert_eq!(set.len(), 4);
        assert!(!set.is_empty());
        assert_eq!(set.to_coords()[1], [2.0, 4.0]);
        assert_eq!(set.unique_frames(), vec![1, 3]);
        assert_eq!(set.indices_of_frame(3), vec![0, 2]);
    }

    #[test]
    fn test_point_set_frames_length_checked() {
        let device = Default::default();
        let result = PointSet::<TestBackend>::from_coords(&[[0.0, 0.0]], &device).with_frames(vec![1, 2]);
        assert!(matches!(result, Err(CoreError::LengthMismatch { .. })));
    }

    #[test]
    fn test_point_set_mean_and_bounds() {
        let set = sample();
        let mean = set.mean().unwrap();
        assert!((mean.x - 3.0).abs() < 1e-9);
        assert!((mean.y - 1.0).abs() < 1e-9);

        let bounds = set.bounds().unwrap();
        assert_eq!(bounds.min(), Point2::new(0.0, -2.0));
        assert_eq!(bounds.max(), Point2::new(6.0, 4.0));
    }

    #[test]
    fn test_point_set_select_keeps_frames() {
        let set = sample().select(&[2, 1]);
        assert_eq!(set.to_coords(), vec![[4.0, -2.0], [2.0, 4.0]]);
        assert_eq!(set.frames(), Some(&[3, 1][..]));
    }

    #[test]
    fn test_point_set_translate() {
        let set = sample().translate(Vector2::new(1.0, -1.0));
        assert_eq!(set.to_coords()[0], [1.0, -1.0]);
    }

    #[test]
    fn test_set_positions_preserves_length() {
        let mut set = sample();
        let device = Default::default();
        let wrong = Tensor::<TestBackend, 2>::zeros([3, 2], &device);
        assert!(set.set_positions(wrong).is_err());

        let right = Tensor::<TestBackend, 2>::ones([4, 2], &device);
        set.set_positions(right).unwrap();
        assert_eq!(set.to_coords()[3], [1.0, 1.0]);
    }

    #[test]
    fn test_empty_point_set() {
        let device = Default::default();
        let set = PointSet::<TestBackend>::from_coords(&[], &device);
        assert!(set.is_empty());
        assert!(matches!(set.bounds(), Err(CoreError::EmptyPointSet(_))));
        assert!(set.mean().is_err());
    }
}
