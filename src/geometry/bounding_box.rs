//! Axis-aligned bounding box types for 2D and 3D geometry.

use crate::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Point, Point3};

/// A 2D axis-aligned bounding box with scaled integer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
    defined: bool,
}

impl BoundingBox {
    /// Create a new empty (undefined) bounding box.
    #[inline]
    pub fn new() -> Self {
        Self {
            min: Point::new(Coord::MAX, Coord::MAX),
            max: Point::new(Coord::MIN, Coord::MIN),
            defined: false,
        }
    }

    /// Create a bounding box from min and max points.
    #[inline]
    pub fn from_points_minmax(min: Point, max: Point) -> Self {
        Self {
            min,
            max,
            defined: true,
        }
    }

    /// Check if the bounding box has been merged with at least one point.
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.defined
    }

    /// Merge a point into the bounding box.
    pub fn merge_point(&mut self, p: Point) {
        if self.defined {
            self.min.x = self.min.x.min(p.x);
            self.min.y = self.min.y.min(p.y);
            self.max.x = self.max.x.max(p.x);
            self.max.y = self.max.y.max(p.y);
        } else {
            self.min = p;
            self.max = p;
            self.defined = true;
        }
    }

    /// Get the width of the bounding box.
    #[inline]
    pub fn width(&self) -> Coord {
        if self.defined {
            self.max.x - self.min.x
        } else {
            0
        }
    }

    /// Get the height of the bounding box.
    #[inline]
    pub fn height(&self) -> Coord {
        if self.defined {
            self.max.y - self.min.y
        } else {
            0
        }
    }
}

impl fmt::Debug for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.defined {
            write!(f, "BoundingBox({:?} - {:?})", self.min, self.max)
        } else {
            write!(f, "BoundingBox(undefined)")
        }
    }
}

/// A 3D axis-aligned bounding box with scaled integer coordinates.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox3 {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox3 {
    /// Create a bounding box from min and max points.
    #[inline]
    pub const fn from_points_minmax(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Get the size in x direction.
    #[inline]
    pub fn size_x(&self) -> Coord {
        self.max.x - self.min.x
    }

    /// Get the size in y direction.
    #[inline]
    pub fn size_y(&self) -> Coord {
        self.max.y - self.min.y
    }

    /// Get the size in z direction.
    #[inline]
    pub fn size_z(&self) -> Coord {
        self.max.z - self.min.z
    }

    /// Project to 2D (drop the z axis).
    #[inline]
    pub fn to_2d(&self) -> BoundingBox {
        BoundingBox::from_points_minmax(self.min.to_2d(), self.max.to_2d())
    }
}

impl fmt::Debug for BoundingBox3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundingBox3({:?} - {:?})", self.min, self.max)
    }
}
