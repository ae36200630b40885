//! Right triangles threaded by the space-filling curve.
//!
//! Every prism footprint is a right triangle that the curve crosses once,
//! entering through one edge and leaving through another. Subdividing a
//! triangle across its hypotenuse midpoint yields two smaller right triangles
//! whose entry/exit edges are chosen so the curve stays continuous: the
//! parent's entry edge feeds child 0, child 0 hands over to child 1 at the
//! split point, and child 1 leaves through the parent's exit edge.

use crate::geometry::{Line, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Which pair of triangle edges the space-filling curve crosses.
///
/// `Ab` is the hypotenuse `a`–`b`; `Ac` and `Bc` are the legs from `a` and
/// `b` to the straight corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveDirection {
    /// Enter through the hypotenuse, leave through leg `b`–corner.
    #[default]
    AbToBc,
    /// Enter through leg `a`–corner, leave through the hypotenuse.
    AcToAb,
    /// Enter through leg `a`–corner, leave through leg `b`–corner.
    AcToBc,
}

/// A right triangle with the curve's entry and exit edges recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Triangle {
    /// The vertex with the 90° angle.
    pub straight_corner: Point,
    /// First vertex of the hypotenuse.
    pub a: Point,
    /// Second vertex of the hypotenuse.
    pub b: Point,
    /// Which edges the curve enters and exits through.
    pub dir: CurveDirection,
    /// Winding orientation. When false the entry and exit edges run reversed
    /// so consecutive triangles keep a consistent polygon direction.
    pub straight_corner_is_left: bool,
}

impl Triangle {
    /// Create a new triangle.
    pub const fn new(
        straight_corner: Point,
        a: Point,
        b: Point,
        dir: CurveDirection,
        straight_corner_is_left: bool,
    ) -> Self {
        Self {
            straight_corner,
            a,
            b,
            dir,
            straight_corner_is_left,
        }
    }

    /// The edge through which the curve enters this triangle.
    pub fn from_edge(&self) -> Line {
        let mut ret = match self.dir {
            CurveDirection::AbToBc => Line::new(self.a, self.b),
            CurveDirection::AcToAb => Line::new(self.straight_corner, self.a),
            CurveDirection::AcToBc => Line::new(self.straight_corner, self.a),
        };
        if !self.straight_corner_is_left {
            ret.reverse();
        }
        ret
    }

    /// The edge through which the curve leaves this triangle.
    pub fn to_edge(&self) -> Line {
        let mut ret = match self.dir {
            CurveDirection::AbToBc => Line::new(self.straight_corner, self.b),
            CurveDirection::AcToAb => Line::new(self.b, self.a),
            CurveDirection::AcToBc => Line::new(self.straight_corner, self.b),
        };
        if !self.straight_corner_is_left {
            ret.reverse();
        }
        ret
    }

    /// The centroid of the triangle; the curve passes through it.
    #[inline]
    pub fn middle(&self) -> Point {
        (self.straight_corner + self.a + self.b) / 3
    }

    /// The triangle as a positively wound polygon.
    pub fn to_polygon(&self) -> Polygon {
        let (second, third) = if self.straight_corner_is_left {
            (self.a, self.b)
        } else {
            (self.b, self.a)
        };
        let ret = Polygon::from_points(vec![self.straight_corner, second, third]);
        debug_assert!(ret.signed_area() > 0.0);
        ret
    }

    /// Split the triangle across the midpoint of its hypotenuse.
    ///
    /// Both children get the midpoint as their straight corner and flip their
    /// winding. The curve directions follow from the parent's:
    ///
    /// | parent   | child 0  | child 1  |
    /// |----------|----------|----------|
    /// | AbToBc   | AcToBc   | AcToAb   |
    /// | AcToAb   | AbToBc   | AcToBc   |
    /// | AcToBc   | AbToBc   | AcToAb   |
    ///
    /// Child 0 keeps the parent's entry edge (shortened), child 1 keeps the
    /// parent's exit edge, and the hand-over between them happens on the
    /// parent's hypotenuse at the split point.
    pub fn subdivide(&self) -> [Triangle; 2] {
        let middle = (self.a + self.b) / 2;
        let (dir0, dir1) = match self.dir {
            CurveDirection::AbToBc => (CurveDirection::AcToBc, CurveDirection::AcToAb),
            CurveDirection::AcToAb => (CurveDirection::AbToBc, CurveDirection::AcToBc),
            CurveDirection::AcToBc => (CurveDirection::AbToBc, CurveDirection::AcToAb),
        };
        [
            Triangle::new(
                middle,
                self.a,
                self.straight_corner,
                dir0,
                !self.straight_corner_is_left,
            ),
            Triangle::new(
                middle,
                self.straight_corner,
                self.b,
                dir1,
                !self.straight_corner_is_left,
            ),
        ]
    }
}
