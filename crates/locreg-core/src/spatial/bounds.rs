//! Axis-aligned bounding boxes of 2-D point clouds.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in physical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    min: Point2<f64>,
    max: Point2<f64>,
}

impl Bounds {
    /// Create bounds from two corners. Corners are reordered per axis.
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Bounding box of a list of coordinates, `None` when the list is empty.
    pub fn from_coords(coords: &[[f64; 2]]) -> Option<Self> {
        let (first, rest) = coords.split_first()?;
        let start = Self::new(Point2::from(*first), Point2::from(*first));
        Some(rest.iter().fold(start, |bounds, c| bounds.include(Point2::from(*c))))
    }

    /// Grow the box so it contains `point`.
    pub fn include(self, point: Point2<f64>) -> Self {
        Self {
            min: Point2::new(self.min.x.min(point.x), self.min.y.min(point.y)),
            max: Point2::new(self.max.x.max(point.x), self.max.y.max(point.y)),
        }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Bounds) -> Self {
        self.include(other.min).include(other.max)
    }

    /// Get the lower corner.
    pub fn min(&self) -> Point2<f64> {
        self.min
    }

    /// Get the upper corner.
    pub fn max(&self) -> Point2<f64> {
        self.max
    }

    /// Side lengths of the box.
    pub fn extent(&self) -> Vector2<f64> {
        self.max - self.min
    }

    /// Center of the box.
    pub fn midpoint(&self) -> Point2<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Whether the midpoint lies within `tolerance` of the origin, relative to
    /// the box diagonal (or absolute for boxes smaller than one unit).
    pub fn is_centered(&self, tolerance: f64) -> bool {
        let scale = self.extent().norm().max(1.0);
        self.midpoint().coords.norm() <= tolerance * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_coords() {
        let bounds = Bounds::from_coords(&[[1.0, -2.0], [-3.0, 4.0], [0.5, 0.5]]).unwrap();
        assert_eq!(bounds.min(), Point2::new(-3.0, -2.0));
        assert_eq!(bounds.max(), Point2::new(1.0, 4.0));
        assert_eq!(bounds.extent(), Vector2::new(4.0, 6.0));
        assert_eq!(bounds.midpoint(), Point2::new(-1.0, 1.0));
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds::from_coords(&[]).is_none());
    }

    #[test]
    fn test_bounds_union() {
        let a = Bounds::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = Bounds::new(Point2::new(2.0, -1.0), Point2::new(3.0, 0.5));
        let u = a.union(&b);
        assert_eq!(u.min(), Point2::new(0.0, -1.0));
        assert_eq!(u.max(), Point2::new(3.0, 1.0));
    }

    #[test]
    fn test_bounds_centered() {
        let centered = Bounds::new(Point2::new(-10.0, -5.0), Point2::new(10.0, 5.0));
        assert!(centered.is_centered(1e-3));

        let shifted = Bounds::new(Point2::new(990.0, 995.0), Point2::new(1010.0, 1005.0));
        assert!(!shifted.is_centered(1e-2));
    }
}
