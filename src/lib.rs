//! Space-filling cross-pattern 3D infill for fused-deposition printing.
//!
//! Given a bounding box, a spatially varying density target and a maximum
//! refinement depth, this crate builds a hierarchical subdivision of the
//! volume into triangular prisms whose midpoints, walked left to right at any
//! height, form a continuous space-filling curve. The printer extrudes along
//! that curve; how thick the extrusion is relative to each prism footprint
//! realizes the requested local density.
//!
//! The entry point is [`infill::cross3d::Cross3D`]:
//!
//! 1. [`Cross3D::initialize`](infill::cross3d::Cross3D::initialize) builds the
//!    full prism tree and accumulates per-cell volume statistics.
//! 2. [`Cross3D::create_minimal_density_pattern`](infill::cross3d::Cross3D::create_minimal_density_pattern)
//!    selectively refines the tree until every leaf meets its density target.
//! 3. [`Cross3D::get_bottom_sequence`](infill::cross3d::Cross3D::get_bottom_sequence)
//!    and [`Cross3D::advance_sequence`](infill::cross3d::Cross3D::advance_sequence)
//!    walk a horizontal chain of prisms up through the layers, and
//!    [`Cross3D::generate_sierpinski`](infill::cross3d::Cross3D::generate_sierpinski)
//!    emits the per-layer polygon through the chain's triangle midpoints.

pub mod clipper;
pub mod density;
pub mod geometry;
pub mod infill;

/// Integer coordinate type. 1 unit = 1 micrometer.
pub type Coord = i64;

/// Floating-point coordinate type, in mm.
pub type CoordF = f64;

/// Number of coordinate units per millimeter.
pub const SCALING_FACTOR: f64 = 1000.0;

/// Convert a length in mm to scaled integer units.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Convert a length in scaled integer units to mm.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Convert an area in scaled units² to mm².
#[inline]
pub fn unscale_area(v: CoordF) -> CoordF {
    v / (SCALING_FACTOR * SCALING_FACTOR)
}

pub use density::{DensityProvider, UniformDensity};
pub use infill::cross3d::{Cross3D, Cross3DConfig, Cross3DError, SliceWalker};
