//! Infill pattern generators.

pub mod cross3d;
