//! Geometry primitives for the infill core.
//!
//! All integer types use scaled coordinates (1 unit = 1 micrometer) to avoid
//! floating-point drift in the adjacency decisions; conversions to mm happen
//! only at the volume/density level.

mod bounding_box;
mod line;
mod point;
mod polygon;

pub use bounding_box::{BoundingBox, BoundingBox3};
pub use line::{are_collinear, Line};
pub use point::{Point, Point3};
pub use polygon::Polygon;
