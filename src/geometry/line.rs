//! Line segments.
//!
//! The space-filling curve enters and exits every triangle through a specific
//! edge; those edges are handled as directed line segments. Collinearity of
//! two segments is the basis of the horizontal adjacency test.

use crate::{Coord, CoordF};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Point;

/// A directed 2D line segment with scaled integer endpoints.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Line {
    pub from: Point,
    pub to: Point,
}

impl Line {
    /// Create a new segment from `from` to `to`.
    #[inline]
    pub const fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    /// The vector from the start to the end of the segment.
    #[inline]
    pub fn vector(&self) -> Point {
        self.to - self.from
    }

    /// The midpoint of the segment.
    #[inline]
    pub fn middle(&self) -> Point {
        (self.from + self.to) / 2
    }

    /// The length of the segment, in units.
    #[inline]
    pub fn length(&self) -> CoordF {
        self.vector().length()
    }

    /// Swap the direction of the segment in place.
    #[inline]
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }

    /// Return the segment with its direction swapped.
    #[inline]
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }

    /// Perpendicular distance from a point to the infinite line through this
    /// segment, in units. The segment must not be degenerate.
    pub fn distance_to_line(&self, p: &Point) -> CoordF {
        let v = self.vector();
        let len = v.length();
        debug_assert!(len > 0.0, "distance to a degenerate line is undefined");
        (v.cross(&(*p - self.from)) as CoordF).abs() / len
    }
}

/// Check whether two segments lie on the same infinite line, within a
/// perpendicular tolerance in units.
///
/// A degenerate `a` has no line direction; that case reports not collinear.
pub fn are_collinear(a: &Line, b: &Line, tolerance: Coord) -> bool {
    if a.vector().length_squared() == 0 {
        return false;
    }
    let tolerance = tolerance as CoordF;
    a.distance_to_line(&b.from) <= tolerance && a.distance_to_line(&b.to) <= tolerance
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({:?} -> {:?})", self.from, self.to)
    }
}
