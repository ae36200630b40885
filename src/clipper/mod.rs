//! Polygon boolean operations via the geo-clipper library.
//!
//! The infill core needs exactly one boolean: the intersection of two
//! triangle footprints, whose area decides vertical adjacency. Coordinates
//! cross into clipper as raw unit values with a clipper scale of 1, so the
//! clipper integer grid coincides with our micrometer units and containment
//! areas survive the round trip exactly.

use crate::geometry::{Point, Polygon};
use crate::{Coord, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::Clipper;

/// Scale factor handed to clipper. Inputs are already integer units.
const CLIPPER_SCALE: f64 = 1.0;

/// Convert our Polygon to geo's Polygon type (coordinates in units).
fn polygon_to_geo(poly: &Polygon) -> GeoPolygon<f64> {
    let mut ring: Vec<GeoCoord<f64>> = poly
        .points()
        .iter()
        .map(|p| GeoCoord {
            x: p.x as CoordF,
            y: p.y as CoordF,
        })
        .collect();

    // Close the ring if needed
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(*first);
        }
    }

    GeoPolygon::new(LineString::new(ring), vec![])
}

/// Convert a geo Polygon exterior back to our Polygon type.
fn geo_to_polygon(poly: &GeoPolygon<f64>) -> Polygon {
    let mut points: Vec<Point> = poly
        .exterior()
        .coords()
        .map(|c| Point::new(c.x.round() as Coord, c.y.round() as Coord))
        .collect();

    // geo keeps rings explicitly closed; we keep them implicitly closed
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    Polygon::from_points(points)
}

/// Convert geo's MultiPolygon to our polygons, dropping any holes.
fn geo_multi_to_polygons(multi: &MultiPolygon<f64>) -> Vec<Polygon> {
    multi.0.iter().map(geo_to_polygon).collect()
}

/// Compute the intersection of two polygons.
pub fn intersection(subject: &Polygon, clip: &Polygon) -> Vec<Polygon> {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }

    let subject_geo = polygon_to_geo(subject);
    let clip_geo = polygon_to_geo(clip);

    let result = subject_geo.intersection(&clip_geo, CLIPPER_SCALE);
    geo_multi_to_polygons(&result)
}

/// Total absolute area of a set of polygons, in units².
pub fn total_area(polygons: &[Polygon]) -> CoordF {
    polygons.iter().map(Polygon::area).sum()
}
