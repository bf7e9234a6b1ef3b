pub mod error;
pub mod spatial;
pub mod points;
pub mod grid;
pub mod transform;

pub use error::{CoreError, Result};
pub use grid::ControlPointGrid;
pub use points::{index_tensor, PointSet};
pub use spatial::{Bounds, Matrix2, Point2, Vector2};
