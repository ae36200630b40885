//! SVG dumps of the tree, the adjacency links and the layer chain.
//!
//! Strictly diagnostic output: triangles are drawn gray, the curve crossing
//! of each prism red, and adjacency links as blue arrows offset to the side
//! so antiparallel pairs stay distinguishable.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::density::DensityProvider;
use crate::geometry::{BoundingBox, Point, Polygon};
use crate::{unscale, Coord, CoordF};

use super::cell::{Cell, Direction, LinkId};
use super::triangle::Triangle;
use super::{Cross3D, SliceWalker};

/// Scale a vector to the given length, in units.
fn normal(v: Point, length: CoordF) -> Point {
    let size = v.length();
    if size <= 0.0 {
        return Point::zero();
    }
    Point::new(
        (v.x as CoordF * length / size).round() as Coord,
        (v.y as CoordF * length / size).round() as Coord,
    )
}

/// Rotate a vector 90° counter-clockwise.
fn turn90_ccw(v: Point) -> Point {
    Point::new(-v.y, v.x)
}

/// Minimal SVG assembly for debug drawings.
///
/// Y is flipped so the drawing matches the usual plot orientation.
pub struct SvgWriter {
    out: String,
    origin: Point,
    flip_y: Coord,
    scale: CoordF,
}

impl SvgWriter {
    /// Create a writer covering `bounds`, rendered `canvas_width` px wide.
    pub fn new(bounds: BoundingBox, canvas_width: CoordF) -> Self {
        let scale = canvas_width / bounds.width().max(1) as CoordF;
        let canvas_height = bounds.height() as CoordF * scale;
        let mut out = String::new();
        out.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{canvas_width:.0}\" height=\"{canvas_height:.0}\">\n"
        ));
        Self {
            out,
            origin: bounds.min,
            flip_y: bounds.max.y,
            scale,
        }
    }

    fn transform(&self, p: Point) -> (CoordF, CoordF) {
        (
            (p.x - self.origin.x) as CoordF * self.scale,
            (self.flip_y - p.y) as CoordF * self.scale,
        )
    }

    /// Draw a closed polygon outline.
    pub fn write_polygon(&mut self, polygon: &Polygon, color: &str, stroke_width: CoordF) {
        let mut path = String::new();
        for (i, &p) in polygon.points().iter().enumerate() {
            let (x, y) = self.transform(p);
            path.push_str(if i == 0 { "M" } else { "L" });
            path.push_str(&format!("{x:.1},{y:.1} "));
        }
        self.out.push_str(&format!(
            "<path d=\"{path}Z\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{stroke_width:.1}\"/>\n"
        ));
    }

    /// Draw a line segment.
    pub fn write_line(&mut self, from: Point, to: Point, color: &str, stroke_width: CoordF) {
        let (x1, y1) = self.transform(from);
        let (x2, y2) = self.transform(to);
        self.out.push_str(&format!(
            "<line x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" \
             stroke=\"{color}\" stroke-width=\"{stroke_width:.1}\"/>\n"
        ));
    }

    /// Draw a dot.
    pub fn write_point(&mut self, p: Point, radius: CoordF, color: &str) {
        let (cx, cy) = self.transform(p);
        self.out.push_str(&format!(
            "<circle cx=\"{cx:.1}\" cy=\"{cy:.1}\" r=\"{radius:.1}\" fill=\"{color}\"/>\n"
        ));
    }

    /// Close the document and return the markup.
    pub fn finish(mut self) -> String {
        self.out.push_str("</svg>\n");
        self.out
    }

    /// Close the document and write it to a file.
    pub fn save(self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.finish().as_bytes())
    }
}

impl<D: DensityProvider> Cross3D<D> {
    fn svg_writer(&self) -> SvgWriter {
        SvgWriter::new(self.aabb.to_2d(), 1024.0)
    }

    fn output_triangle(&self, svg: &mut SvgWriter, triangle: &Triangle, drawing_line_width: CoordF) {
        svg.write_polygon(&triangle.to_polygon(), "gray", 1.0);
        svg.write_line(
            triangle.from_edge().middle(),
            triangle.to_edge().middle(),
            "red",
            drawing_line_width,
        );
    }

    fn output_link(&self, svg: &mut SvgWriter, link_id: LinkId) {
        let link = self.links.get(link_id);
        let reverse = self.links.get(link.reverse);
        let a = self.cell_data[reverse.to_index as usize]
            .prism
            .triangle
            .middle();
        let b = self.cell_data[link.to_index as usize]
            .prism
            .triangle
            .middle();
        let ab = b - a;
        let shift = normal(turn90_ccw(-ab), ab.length() / 20.0);
        let shortening = ab.length() / 10.0;
        let c = a + shift + normal(ab, shortening);
        let d = a + shift + normal(ab, ab.length() - shortening);
        svg.write_line(c, d, "blue", 1.0);
        svg.write_point(c, 2.0, "blue");
    }

    fn output_cell(
        &self,
        svg: &mut SvgWriter,
        cell: &Cell,
        drawing_line_width: CoordF,
        horizontal_connections_only: bool,
    ) {
        self.output_triangle(svg, &cell.prism.triangle, drawing_line_width);
        for side in Direction::ALL {
            if horizontal_connections_only && side.index() >= Direction::Up.index() {
                break;
            }
            for link_id in self.links.iter(cell.adjacent[side.index()]) {
                self.output_link(svg, link_id);
            }
        }
    }

    /// Dump every triangle of the arena. Mostly useful at small depths.
    pub fn debug_output_tree(&self, path: &Path) -> io::Result<()> {
        let mut svg = self.svg_writer();
        let drawing_line_width = unscale(self.line_width);
        for cell in self.cell_data.iter().skip(1) {
            self.output_triangle(&mut svg, &cell.prism.triangle, drawing_line_width);
        }
        svg.save(path)
    }

    /// Dump the active leaves of the refined pattern with all their links.
    pub fn debug_output_sequence(&self, path: &Path) -> io::Result<()> {
        let mut svg = self.svg_writer();
        self.output_sequence_cell(&mut svg, 0);
        svg.save(path)
    }

    fn output_sequence_cell(&self, svg: &mut SvgWriter, index: super::CellIndex) {
        let cell = &self.cell_data[index as usize];
        if cell.is_subdivided {
            for &child_index in &cell.children {
                if child_index > 0 {
                    self.output_sequence_cell(svg, child_index);
                }
            }
        } else {
            self.output_cell(svg, cell, unscale(self.line_width), false);
        }
    }

    /// Dump the walker's current chain and its horizontal links.
    pub fn debug_output_walker(&self, walker: &SliceWalker, path: &Path) -> io::Result<()> {
        let mut svg = self.svg_writer();
        let drawing_line_width = unscale(self.line_width);
        for &cell_index in walker.cells() {
            let cell = &self.cell_data[cell_index as usize];
            self.output_cell(&mut svg, cell, drawing_line_width, true);
        }
        svg.save(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_svg_writer_basic_shapes() {
        let bounds =
            BoundingBox::from_points_minmax(Point::new(0, 0), Point::new(10_000, 10_000));
        let mut svg = SvgWriter::new(bounds, 100.0);
        svg.write_line(Point::new(0, 0), Point::new(10_000, 10_000), "red", 1.0);
        svg.write_point(Point::new(5_000, 5_000), 2.0, "blue");
        let polygon = Polygon::from_points(vec![
            Point::new(0, 0),
            Point::new(10_000, 0),
            Point::new(0, 10_000),
        ]);
        svg.write_polygon(&polygon, "gray", 1.0);
        let markup = svg.finish();
        assert!(markup.starts_with("<svg"));
        assert!(markup.ends_with("</svg>\n"));
        assert!(markup.contains("<line"));
        assert!(markup.contains("<circle"));
        assert!(markup.contains("<path"));
    }

    #[test]
    fn test_normal_scales_vectors() {
        let v = Point::new(3000, 4000);
        let n = normal(v, 500.0);
        assert!((n.length() - 500.0).abs() < 2.0);
        assert_eq!(normal(Point::zero(), 500.0), Point::zero());
    }

    #[test]
    fn test_turn90_ccw() {
        assert_eq!(turn90_ccw(Point::new(1, 0)), Point::new(0, 1));
        assert_eq!(turn90_ccw(Point::new(0, 1)), Point::new(-1, 0));
    }
}
