//! Triangular prisms: a triangle footprint extruded over a Z interval.

use crate::Coord;
use serde::{Deserialize, Serialize};

use super::triangle::Triangle;

/// Shape classification tolerance, in units.
const SHAPE_TOLERANCE: Coord = 10;

/// A closed interval on the Z axis, in scaled integer units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZRange {
    pub min: Coord,
    pub max: Coord,
}

impl ZRange {
    /// Create a new interval.
    #[inline]
    pub const fn new(min: Coord, max: Coord) -> Self {
        Self { min, max }
    }

    /// The extent of the interval.
    #[inline]
    pub fn size(&self) -> Coord {
        self.max - self.min
    }

    /// The middle of the interval.
    #[inline]
    pub fn middle(&self) -> Coord {
        (self.min + self.max) / 2
    }

    /// Whether the two intervals share at least one point.
    #[inline]
    pub fn overlap(&self, other: &ZRange) -> bool {
        !(other.max < self.min || self.max < other.min)
    }

    /// The interval grown by `amount` on both ends.
    #[inline]
    pub fn expanded(&self, amount: Coord) -> Self {
        Self {
            min: self.min - amount,
            max: self.max + amount,
        }
    }
}

/// A vertical extrusion of a [`Triangle`] between two Z values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prism {
    pub triangle: Triangle,
    pub z_range: ZRange,
    /// Direction tag for the curve's vertical traversal; the upward curve
    /// flows while expanding.
    pub is_expanding: bool,
}

impl Prism {
    /// Create a new prism.
    pub const fn new(triangle: Triangle, z_range: ZRange, is_expanding: bool) -> Self {
        Self {
            triangle,
            z_range,
            is_expanding,
        }
    }

    /// A half cube's vertical extent equals the length of its shorter leg; it
    /// subdivides in XY only, into 2 children.
    pub fn is_half_cube(&self) -> bool {
        let bc = self.triangle.straight_corner - self.triangle.b;
        (bc.length() - self.z_range.size() as f64).abs() < SHAPE_TOLERANCE as f64
    }

    /// A quarter cube's vertical extent equals the length of its hypotenuse;
    /// it subdivides in XY and Z, into 4 children.
    pub fn is_quarter_cube(&self) -> bool {
        let ab = self.triangle.a - self.triangle.b;
        (ab.length() - self.z_range.size() as f64).abs() < SHAPE_TOLERANCE as f64
    }
}
