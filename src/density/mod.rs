//! Density provider seam.
//!
//! The infill core never decides how dense a region should be; it asks a
//! provider for the requested density of an axis-aligned volume and refines
//! until the printed curve meets it. Providers are expected to return values
//! in `[0, 1]`; negative values trip the tree's volume-statistics checker.

use crate::geometry::BoundingBox3;
use crate::CoordF;

/// Source of the locally requested infill density.
pub trait DensityProvider {
    /// Requested density for the given volume, in `[0, 1]`.
    fn density_at(&self, bounds: &BoundingBox3) -> CoordF;
}

impl<F> DensityProvider for F
where
    F: Fn(&BoundingBox3) -> CoordF,
{
    #[inline]
    fn density_at(&self, bounds: &BoundingBox3) -> CoordF {
        self(bounds)
    }
}

/// A provider that requests the same density everywhere.
#[derive(Debug, Clone, Copy)]
pub struct UniformDensity(pub CoordF);

impl DensityProvider for UniformDensity {
    #[inline]
    fn density_at(&self, _bounds: &BoundingBox3) -> CoordF {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;

    fn some_box() -> BoundingBox3 {
        BoundingBox3::from_points_minmax(Point3::new(0, 0, 0), Point3::new(1000, 1000, 1000))
    }

    #[test]
    fn test_uniform_density() {
        let provider = UniformDensity(0.25);
        assert_eq!(provider.density_at(&some_box()), 0.25);
    }

    #[test]
    fn test_closure_provider() {
        let provider = |bounds: &BoundingBox3| {
            if bounds.min.x < 500 {
                1.0
            } else {
                0.0
            }
        };
        assert_eq!(provider.density_at(&some_box()), 1.0);
    }
}
