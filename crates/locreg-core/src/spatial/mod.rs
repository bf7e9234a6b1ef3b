//! Spatial types for 2-D physical coordinates.
//!
//! Host-side geometry is expressed with nalgebra; tensors only carry the
//! point clouds themselves.

pub mod bounds;

pub use bounds::Bounds;

pub type Point2 = nalgebra::Point2<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;
pub type Matrix2 = nalgebra::Matrix2<f64>;
