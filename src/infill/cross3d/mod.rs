//! Space-filling cross-pattern 3D infill.
//!
//! The volume is tiled by two mirrored right-triangle prisms which subdivide
//! recursively: half-cube prisms split in two across the footprint, quarter
//! cubes split in four across footprint and height. The midpoints of the
//! prisms at any given height, read left to right along the neighbor graph,
//! form one continuous space-filling curve per layer.
//!
//! # Algorithm Overview
//!
//! 1. [`Cross3D::initialize`] builds the complete subdivision tree down to
//!    the maximum depth and accumulates volume and density allowances
//!    bottom-up.
//! 2. [`Cross3D::create_minimal_density_pattern`] selectively activates
//!    subdivisions until each leaf's printed line fills enough of its prism,
//!    while keeping adjacent leaves within one level of each other.
//! 3. [`Cross3D::get_bottom_sequence`] extracts the bottom chain of leaves
//!    and [`Cross3D::advance_sequence`] lifts it layer by layer;
//!    [`Cross3D::generate_sierpinski`] turns the chain into the output
//!    polygon.
//!
//! # CuraEngine Reference
//!
//! The pattern follows the Cross 3D infill of Ultimaker's CuraEngine
//! (`src/infill/Cross3D.cpp`), the 3D generalization of its 2D cross/
//! Sierpinski infill.

mod cell;
mod prism;
mod svg;
mod triangle;

pub use cell::{Cell, CellIndex, Direction, Link, LinkId, LinkIter, LinkPool, NO_CELL, NO_LINK};
pub use prism::{Prism, ZRange};
pub use triangle::{CurveDirection, Triangle};

use std::collections::VecDeque;
use std::time::Instant;

use thiserror::Error;

use crate::clipper;
use crate::density::DensityProvider;
use crate::geometry::{are_collinear, BoundingBox, BoundingBox3, Point, Point3, Polygon};
use crate::{unscale, unscale_area, Coord, CoordF, SCALING_FACTOR};

/// Linear tolerance for adjacency decisions, in units.
const LINEAR_TOLERANCE: Coord = 10;

/// Area tolerance for the vertical footprint-containment test, in units².
const AREA_TOLERANCE: CoordF = 100.0;

/// Configuration for cross-pattern infill generation.
#[derive(Debug, Clone)]
pub struct Cross3DConfig {
    /// Maximum subdivision depth of the prism tree. Each two levels halve the
    /// prism footprint; practical values are 6 to 20.
    pub max_depth: i32,

    /// Extrusion line width, in units.
    pub line_width: Coord,
}

impl Default for Cross3DConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            line_width: 400, // 0.4 mm
        }
    }
}

impl Cross3DConfig {
    /// Check the configuration for values the generator cannot work with.
    pub fn validate(&self) -> Result<(), Cross3DError> {
        if self.max_depth <= 0 {
            return Err(Cross3DError::InvalidMaxDepth(self.max_depth));
        }
        if self.line_width <= 0 {
            return Err(Cross3DError::InvalidLineWidth(self.line_width));
        }
        Ok(())
    }
}

/// Errors for cross-pattern infill construction.
#[derive(Debug, Error)]
pub enum Cross3DError {
    /// The bounding box has zero or negative extent on some axis.
    #[error("infill bounding box has no volume: {0:?}")]
    EmptyBounds(BoundingBox3),

    /// The maximum depth must be positive.
    #[error("maximum subdivision depth must be positive, got {0}")]
    InvalidMaxDepth(i32),

    /// The line width must be positive.
    #[error("line width must be positive, got {0}")]
    InvalidLineWidth(Coord),
}

/// Result type for cross-pattern infill construction.
pub type Cross3DResult<T> = Result<T, Cross3DError>;

/// The horizontal chain of leaves at the walker's current height, ordered
/// left to right by Right-adjacency. Mutated in place as the height advances.
#[derive(Debug, Clone, Default)]
pub struct SliceWalker {
    layer_sequence: Vec<CellIndex>,
}

impl SliceWalker {
    /// The cells of the chain, left to right.
    #[inline]
    pub fn cells(&self) -> &[CellIndex] {
        &self.layer_sequence
    }

    /// Number of cells in the chain.
    #[inline]
    pub fn len(&self) -> usize {
        self.layer_sequence.len()
    }

    /// Whether the chain is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layer_sequence.is_empty()
    }
}

/// Cross-pattern 3D infill generator.
///
/// All cells live in one append-only arena; cell index 0 is a synthetic
/// placeholder whose only purpose is to hold the two real root prisms as its
/// children. Geometry is never computed on it.
pub struct Cross3D<D: DensityProvider> {
    aabb: BoundingBox3,
    max_depth: i32,
    line_width: Coord,
    density_provider: D,
    cell_data: Vec<Cell>,
    links: LinkPool,
}

impl<D: DensityProvider> Cross3D<D> {
    /// Create a generator for the given volume.
    ///
    /// Call [`initialize`](Self::initialize) exactly once before anything
    /// else.
    pub fn new(
        config: Cross3DConfig,
        aabb: BoundingBox3,
        density_provider: D,
    ) -> Cross3DResult<Self> {
        config.validate()?;
        if aabb.size_x() <= 0 || aabb.size_y() <= 0 || aabb.size_z() <= 0 {
            return Err(Cross3DError::EmptyBounds(aabb));
        }
        Ok(Self {
            aabb,
            max_depth: config.max_depth,
            line_width: config.line_width,
            density_provider,
            cell_data: Vec::new(),
            links: LinkPool::new(),
        })
    }

    /// Build the full subdivision tree and its volume statistics.
    ///
    /// Not idempotent; call once per instance.
    pub fn initialize(&mut self) {
        let start = Instant::now();
        self.create_tree();
        self.debug_check_depths();
        self.debug_check_volume_stats();
        log::debug!(
            "created cross 3D tree with {} cells and max depth {} in {:.2}s",
            self.cell_data.len(),
            self.max_depth,
            start.elapsed().as_secs_f64()
        );
    }

    /// Maximum subdivision depth of this tree.
    #[inline]
    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    /// Number of cells in the arena.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_data.len()
    }

    /// Read a cell of the arena.
    #[inline]
    pub fn cell(&self, index: CellIndex) -> &Cell {
        &self.cell_data[index as usize]
    }

    /// The link records backing the adjacency lists.
    #[inline]
    pub fn links(&self) -> &LinkPool {
        &self.links
    }

    /*
     * Tree creation
     */

    fn create_tree(&mut self) {
        debug_assert!(self.cell_data.is_empty());
        self.cell_data.reserve(2 << (self.max_depth as usize / 2));

        // index 0: synthetic root; its prism is never read
        self.cell_data.push(Cell::new(Prism::default(), 0, 0));
        self.cell_data[0].volume = unscale(self.aabb.size_x())
            * unscale(self.aabb.size_y())
            * unscale(self.aabb.size_z());

        let flat = self.aabb.to_2d();
        let z_range = ZRange::new(self.aabb.min.z, self.aabb.max.z);

        // Two mirrored right triangles tile the rectangular footprint; the
        // exit edge of the first meets the entry edge of the second on the
        // main diagonal.
        let first_triangle = Triangle::new(
            Point::new(flat.min.x, flat.max.y),
            flat.min,
            flat.max,
            CurveDirection::AcToAb,
            true,
        );
        let first_index = self.cell_data.len() as CellIndex;
        self.cell_data[0].children[0] = first_index;
        self.cell_data
            .push(Cell::new(Prism::new(first_triangle, z_range, true), first_index, 1));
        self.create_subtree(first_index);
        self.set_volume(first_index);

        let second_triangle = Triangle::new(
            Point::new(flat.max.x, flat.min.y),
            flat.max,
            flat.min,
            CurveDirection::AbToBc,
            true,
        );
        let second_index = self.cell_data.len() as CellIndex;
        self.cell_data[0].children[1] = second_index;
        self.cell_data.push(Cell::new(
            Prism::new(second_triangle, z_range, true),
            second_index,
            1,
        ));
        self.create_subtree(second_index);
        self.set_volume(second_index);

        self.set_specification_allowance(0);
    }

    /// Pre-build every descendant of `index` down to the maximum depth. The
    /// refinement loop later decides which of them become active.
    fn create_subtree(&mut self, index: CellIndex) {
        let parent_depth = self.cell_data[index as usize].depth;
        if parent_depth >= self.max_depth {
            return; // children stay unset
        }

        let parent_prism = self.cell_data[index as usize].prism;
        let subdivided_triangles = parent_prism.triangle.subdivide();

        let child_count: usize = if parent_prism.is_half_cube() { 2 } else { 4 };
        let mut child_z_min = parent_prism.z_range.min;
        let mut child_z_max = if child_count == 2 {
            parent_prism.z_range.max
        } else {
            parent_prism.z_range.middle()
        };
        for child_z_idx in 0..2usize {
            for child_xy_idx in 0..2usize {
                let child_slot = child_z_idx * 2 + child_xy_idx;
                if child_z_idx == child_count / 2 {
                    self.cell_data[index as usize].children[child_slot] = NO_CELL;
                    continue;
                }
                let mut is_expanding = if parent_prism.triangle.dir != CurveDirection::AcToBc
                    && child_xy_idx == 1
                {
                    // the curve turns around inside these configurations
                    !parent_prism.is_expanding
                } else {
                    parent_prism.is_expanding
                };
                if child_z_idx == 1 {
                    // upper children expand oppositely to lower children
                    is_expanding = !is_expanding;
                }
                let child_index = self.cell_data.len() as CellIndex;
                self.cell_data[index as usize].children[child_slot] = child_index;
                self.cell_data.push(Cell::new(
                    Prism::new(
                        subdivided_triangles[child_xy_idx],
                        ZRange::new(child_z_min, child_z_max),
                        is_expanding,
                    ),
                    child_index,
                    parent_depth + 1,
                ));
                self.create_subtree(child_index);
            }
            // second lap covers the upper half of the parent's z range
            child_z_min = child_z_max;
            child_z_max = parent_prism.z_range.max;
        }
    }

    /// Compute the geometric volume of `index` and every descendant.
    fn set_volume(&mut self, index: CellIndex) {
        let prism = self.cell_data[index as usize].prism;
        let ac = prism.triangle.straight_corner - prism.triangle.a;
        let area = 0.5 * unscale_area(ac.length_squared() as CoordF);
        self.cell_data[index as usize].volume = area * unscale(prism.z_range.size());

        let children = self.cell_data[index as usize].children;
        for &child_index in &children {
            if child_index < 0 {
                break;
            }
            debug_assert!(child_index > 0 && (child_index as usize) < self.cell_data.len());
            self.set_volume(child_index);
        }
    }

    /// Fill `filled_volume_allowance` and `minimally_required_density`
    /// bottom-up: leaves query the density provider, internal cells carry
    /// the sum respectively the maximum over their children.
    fn set_specification_allowance(&mut self, index: CellIndex) {
        let children = self.cell_data[index as usize].children;
        if children[0] >= 0 {
            let mut filled_volume_allowance = 0.0;
            let mut minimally_required_density: CoordF = 0.0;
            for &child_index in &children {
                if child_index < 0 {
                    break;
                }
                self.set_specification_allowance(child_index);
                let child = &self.cell_data[child_index as usize];
                filled_volume_allowance += child.filled_volume_allowance;
                minimally_required_density =
                    minimally_required_density.max(child.minimally_required_density);
            }
            let cell = &mut self.cell_data[index as usize];
            cell.filled_volume_allowance = filled_volume_allowance;
            cell.minimally_required_density = minimally_required_density;
        } else {
            let requested_density = self.density_of(index);
            let cell = &mut self.cell_data[index as usize];
            cell.minimally_required_density = requested_density;
            cell.filled_volume_allowance = cell.volume * requested_density;
        }
    }

    /// Requested density of a cell's bounding volume.
    fn density_of(&self, index: CellIndex) -> CoordF {
        let prism = &self.cell_data[index as usize].prism;
        let mut flat = BoundingBox::new();
        flat.merge_point(prism.triangle.straight_corner);
        flat.merge_point(prism.triangle.a);
        flat.merge_point(prism.triangle.b);
        let bounds = BoundingBox3::from_points_minmax(
            Point3::new(flat.min.x, flat.min.y, prism.z_range.min),
            Point3::new(flat.max.x, flat.max.y, prism.z_range.max),
        );
        self.density_provider.density_at(&bounds)
    }

    /*
     * Refinement
     */

    /// Volume the printed thread fills when the curve crosses this prism once
    /// from entry-edge midpoint to exit-edge midpoint, in mm³.
    pub fn actualized_volume(&self, index: CellIndex) -> CoordF {
        let prism = &self.cell_data[index as usize].prism;
        let from_middle = prism.triangle.from_edge().middle();
        let to_middle = prism.triangle.to_edge().middle();
        unscale(self.line_width)
            * (from_middle.distance(&to_middle) / SCALING_FACTOR)
            * unscale(prism.z_range.size())
    }

    /// Fraction of the cell's volume that one curve crossing fills.
    pub fn actualized_density(&self, index: CellIndex) -> CoordF {
        self.actualized_volume(index) / self.cell_data[index as usize].volume
    }

    fn should_be_subdivided(&self, index: CellIndex) -> bool {
        self.actualized_density(index) < self.cell_data[index as usize].minimally_required_density
    }

    /// Whether a shallower neighbor forbids subdividing this cell for now.
    /// Subdividing would leave leaves more than one level apart.
    pub fn is_constrained(&self, index: CellIndex) -> bool {
        let cell = &self.cell_data[index as usize];
        for head in cell.adjacent {
            for link_id in self.links.iter(head) {
                let neighbor = self.links.get(link_id).to_index;
                if self.is_constrained_by(index, neighbor) {
                    return true;
                }
            }
        }
        false
    }

    fn is_constrained_by(&self, constrainee: CellIndex, constrainer: CellIndex) -> bool {
        self.cell_data[constrainer as usize].depth < self.cell_data[constrainee as usize].depth
    }

    /// Whether the balance constraint and the depth cap currently allow
    /// subdividing this cell.
    pub fn can_subdivide(&self, index: CellIndex) -> bool {
        self.cell_data[index as usize].depth < self.max_depth && !self.is_constrained(index)
    }

    /// Refine the tree until every leaf meets its local density target,
    /// keeping adjacent leaves within one subdivision level of each other.
    ///
    /// Work is drained from the front of a deque: an unconstrained cell is
    /// subdivided and its too-sparse children join at the back; a constrained
    /// cell stays at the front while its shallower neighbors are pushed in
    /// front of it, so they refine first and the balance holds when the cell
    /// finally comes up again.
    pub fn create_minimal_density_pattern(&mut self) {
        let start = Instant::now();
        debug_assert!(!self.cell_data.is_empty());

        let mut to_be_subdivided: VecDeque<CellIndex> = VecDeque::new();
        to_be_subdivided.push_back(0); // the synthetic root always subdivides

        while let Some(&front) = to_be_subdivided.front() {
            let cell = &self.cell_data[front as usize];

            // already handled, or nothing left to subdivide into
            if cell.is_subdivided || !cell.has_children() || cell.depth >= self.max_depth {
                to_be_subdivided.pop_front();
                continue;
            }

            if !self.is_constrained(front) {
                to_be_subdivided.pop_front();
                self.subdivide(front);
                let children = self.cell_data[front as usize].children;
                for &child_index in &children {
                    if child_index >= 0 && self.should_be_subdivided(child_index) {
                        to_be_subdivided.push_back(child_index);
                    }
                }
            } else {
                // keep the cell at the front; its constrainers go first
                let cell = &self.cell_data[front as usize];
                let mut constrainers = Vec::new();
                for head in cell.adjacent {
                    for link_id in self.links.iter(head) {
                        let neighbor = self.links.get(link_id).to_index;
                        if self.is_constrained_by(front, neighbor) {
                            constrainers.push(neighbor);
                        }
                    }
                }
                for constrainer in constrainers {
                    to_be_subdivided.push_front(constrainer);
                }
            }
        }
        log::debug!(
            "cross 3D minimal density pattern finished in {:.2}s",
            start.elapsed().as_secs_f64()
        );
    }

    /// Activate the pre-built children of a cell and hand their parent's
    /// adjacency over to them.
    ///
    /// Every former neighbor link of the cell is replaced by one link per
    /// touching child (one when the neighbor is coarser, two when it matches)
    /// and the matching reverse links are spliced into the neighbor's list in
    /// place of the old one. Afterwards the cell has no adjacency of its own.
    pub fn subdivide(&mut self, index: CellIndex) {
        let children = self.cell_data[index as usize].children;
        debug_assert!(
            children[0] >= 0 && children[1] >= 0,
            "children must be pre-built for subdivision"
        );
        debug_assert!(!self.cell_data[index as usize].is_subdivided);

        self.initial_connection(children[0], children[1], Direction::Right);
        if self.cell_data[index as usize].child_count() == 4 {
            self.initial_connection(children[2], children[3], Direction::Right);
            self.initial_connection(children[0], children[2], Direction::Up);
            self.initial_connection(children[1], children[3], Direction::Up);
        }

        for side_index in 0..Direction::COUNT {
            let side = Direction::from_index(side_index);
            let opposite_index = side.opposite().index();

            let mut link_id = self.cell_data[index as usize].adjacent[side_index];
            while link_id != NO_LINK {
                let next_id = self.links.next(link_id);
                let neighbor_index = self.links.get(link_id).to_index;
                let reverse_id = self.links.get(link_id).reverse;
                debug_assert!(reverse_id != NO_LINK);
                debug_assert!(neighbor_index > 0);

                for &child_index in &children {
                    if child_index < 0 {
                        break;
                    }
                    if self.is_next_to(child_index, neighbor_index, side) {
                        let outgoing = self.links.push_front(
                            &mut self.cell_data[child_index as usize].adjacent[side_index],
                            neighbor_index,
                        );
                        let incoming = self.links.insert_before(
                            &mut self.cell_data[neighbor_index as usize].adjacent[opposite_index],
                            reverse_id,
                            child_index,
                        );
                        self.links.set_reverse_pair(outgoing, incoming);
                    }
                }
                self.links.remove(
                    &mut self.cell_data[neighbor_index as usize].adjacent[opposite_index],
                    reverse_id,
                );
                link_id = next_id;
            }

            self.links
                .clear(&mut self.cell_data[index as usize].adjacent[side_index]);
        }

        self.cell_data[index as usize].is_subdivided = true;
    }

    /// Link two freshly minted sibling cells in the given direction.
    fn initial_connection(&mut self, before: CellIndex, after: CellIndex, dir: Direction) {
        let outgoing = self.links.push_front(
            &mut self.cell_data[before as usize].adjacent[dir.index()],
            after,
        );
        let incoming = self.links.push_front(
            &mut self.cell_data[after as usize].adjacent[dir.opposite().index()],
            before,
        );
        self.links.set_reverse_pair(outgoing, incoming);
    }

    /// The geometric adjacency oracle: do cells `a` and `b` touch on side
    /// `side` of `a`?
    ///
    /// Vertically the z ranges must touch and one footprint must contain the
    /// other; horizontally the corresponding entry/exit edges must be
    /// collinear and overlap.
    pub fn is_next_to(&self, a: CellIndex, b: CellIndex, side: Direction) -> bool {
        let a_prism = &self.cell_data[a as usize].prism;
        let b_prism = &self.cell_data[b as usize].prism;

        let (a_edge, b_edge) = match side {
            Direction::Up | Direction::Down => {
                if !a_prism
                    .z_range
                    .overlap(&b_prism.z_range.expanded(LINEAR_TOLERANCE))
                {
                    return false;
                }
                let a_polygon = a_prism.triangle.to_polygon();
                let b_polygon = b_prism.triangle.to_polygon();
                let intersection = clipper::intersection(&a_polygon, &b_polygon);
                let intersection_area = clipper::total_area(&intersection);
                let smaller_area = a_polygon.area().min(b_polygon.area());
                return (intersection_area - smaller_area).abs() < AREA_TOLERANCE;
            }
            Direction::Left => (a_prism.triangle.from_edge(), b_prism.triangle.to_edge()),
            Direction::Right => (a_prism.triangle.to_edge(), b_prism.triangle.from_edge()),
        };

        if !are_collinear(&a_edge, &b_edge, LINEAR_TOLERANCE) {
            return false;
        }
        let a_vec = a_edge.vector();
        let a_size = a_edge.length() as Coord;
        debug_assert!(a_size > 0, "degenerate curve edge");
        let projected_from = ((b_edge.from - a_edge.from).dot(&a_vec) / a_size as i128) as Coord;
        let projected_to = ((b_edge.to - a_edge.from).dot(&a_vec) / a_size as i128) as Coord;
        let b_low = projected_from.min(projected_to);
        let b_high = projected_from.max(projected_to);
        // overlap of [0, a_size] and the projection of b
        a_size.min(b_high) - b_low.max(0) > LINEAR_TOLERANCE
    }

    /*
     * Output
     */

    /// The bottommost, leftmost chain of active leaves, left to right.
    pub fn get_bottom_sequence(&self) -> SliceWalker {
        // descend to the lower-left leaf of the refined pattern
        let mut last_cell = &self.cell_data[0];
        while last_cell.is_subdivided {
            last_cell = &self.cell_data[last_cell.children[0] as usize];
        }

        let mut layer_sequence = vec![last_cell.index];
        loop {
            let right_head = last_cell.adjacent[Direction::Right.index()];
            if right_head == NO_LINK {
                break;
            }
            last_cell = &self.cell_data[self.links.get(right_head).to_index as usize];
            layer_sequence.push(last_cell.index);
        }
        SliceWalker { layer_sequence }
    }

    /// Lift the walker's chain until every cell reaches at least `new_z`,
    /// replacing each cell that falls below with its upstairs neighbors.
    ///
    /// If a full pass cannot lift the chain far enough the layer stepping is
    /// finer than the deepest prisms; a warning is logged and the best-effort
    /// chain is kept.
    pub fn advance_sequence(&self, walker: &mut SliceWalker, new_z: Coord) {
        let sequence = &mut walker.layer_sequence;
        let mut new_z_is_beyond_current = true;
        while new_z_is_beyond_current {
            let mut position = 0;
            while position < sequence.len() {
                let cell = &self.cell_data[sequence[position] as usize];
                if cell.prism.z_range.max >= new_z {
                    position += 1;
                    continue;
                }

                // replace this cell with its upstairs neighbors
                let cell_before = if position > 0 {
                    sequence[position - 1]
                } else {
                    NO_CELL
                };
                let cell_after = if position + 1 < sequence.len() {
                    sequence[position + 1]
                } else {
                    NO_CELL
                };

                let up_head = cell.adjacent[Direction::Up.index()];
                debug_assert!(up_head != NO_LINK);
                let mut inserted_something = false;
                for link_id in self.links.iter(up_head) {
                    let neighbor_above = self.links.get(link_id).to_index;
                    // the previous cell's advancement may have inserted a
                    // shared upstairs neighbor already
                    if neighbor_above != cell_before && neighbor_above != cell_after {
                        sequence.insert(position, neighbor_above);
                        position += 1;
                        inserted_something = true;
                    } else {
                        log::debug!("upstairs neighbor {neighbor_above} is already in the chain");
                    }
                }
                debug_assert!(inserted_something);
                sequence.remove(position);
            }

            new_z_is_beyond_current = false;
            for &cell_index in sequence.iter() {
                if self.cell_data[cell_index as usize].prism.z_range.max < new_z {
                    new_z_is_beyond_current = true;
                    log::warn!(
                        "layers are higher than the prisms of the cross 3D pattern; \
                         the requested Z stepping is finer than the maximum depth supports"
                    );
                    break;
                }
            }
        }
    }

    /// The output curve of the walker's current layer: a polygon through the
    /// triangle midpoints of the chain, in order.
    pub fn generate_sierpinski(&self, walker: &SliceWalker) -> Polygon {
        let mut poly = Polygon::new();
        for &cell_index in &walker.layer_sequence {
            poly.push(self.cell_data[cell_index as usize].prism.triangle.middle());
        }
        poly
    }

    /*
     * Debug checks
     */

    /// Check that every child is exactly one level deeper than its parent.
    /// Returns the number of violations; fatal in debug builds.
    pub fn debug_check_depths(&self) -> usize {
        let mut problems = 0;
        for cell in &self.cell_data {
            for &child_index in &cell.children {
                if child_index < 0 {
                    break;
                }
                let child_depth = self.cell_data[child_index as usize].depth;
                if child_depth != cell.depth + 1 {
                    problems += 1;
                    log::error!(
                        "cell at depth {} has a child at depth {}",
                        cell.depth,
                        child_depth
                    );
                }
            }
        }
        debug_assert_eq!(problems, 0, "tree depth violations");
        problems
    }

    /// Check volume positivity and allowance conservation. Returns the number
    /// of violations; fatal in debug builds.
    pub fn debug_check_volume_stats(&self) -> usize {
        let mut problems = 0;
        for cell in &self.cell_data {
            if cell.volume <= 0.0 {
                problems += 1;
                log::error!("cell at depth {} has volume {}", cell.depth, cell.volume);
            }
            if cell.filled_volume_allowance < 0.0 {
                problems += 1;
                log::error!(
                    "cell at depth {} has filled volume allowance {}",
                    cell.depth,
                    cell.filled_volume_allowance
                );
            }
            if cell.minimally_required_density < 0.0 {
                problems += 1;
                log::error!(
                    "cell at depth {} has required density {}",
                    cell.depth,
                    cell.minimally_required_density
                );
            }
            let mut child_filled_volume_allowance = 0.0;
            for &child_index in &cell.children {
                if child_index < 0 {
                    break;
                }
                child_filled_volume_allowance +=
                    self.cell_data[child_index as usize].filled_volume_allowance;
            }
            if cell.filled_volume_allowance < child_filled_volume_allowance - 0.1 {
                problems += 1;
                log::error!(
                    "cell at depth {} allows less volume than its children together",
                    cell.depth
                );
            }
        }
        debug_assert_eq!(problems, 0, "volume statistics violations");
        problems
    }

    /// Check that the adjacency graph is a perfectly paired directed
    /// multigraph: every link's reverse lives in the target's opposite list
    /// and points straight back. Returns the number of violations; fatal in
    /// debug builds.
    pub fn debug_check_links(&self) -> usize {
        let mut problems = 0;
        for cell in &self.cell_data {
            for side in Direction::ALL {
                for link_id in self.links.iter(cell.adjacent[side.index()]) {
                    let link = self.links.get(link_id);
                    if link.reverse == NO_LINK {
                        problems += 1;
                        log::error!("link of cell {} has no reverse", cell.index);
                        continue;
                    }
                    let reverse = self.links.get(link.reverse);
                    if reverse.reverse != link_id || reverse.to_index != cell.index {
                        problems += 1;
                        log::error!("link pair of cell {} is asymmetric", cell.index);
                    }
                    let neighbor = &self.cell_data[link.to_index as usize];
                    let in_opposite_list = self
                        .links
                        .iter(neighbor.adjacent[side.opposite().index()])
                        .any(|id| id == link.reverse);
                    if !in_opposite_list {
                        problems += 1;
                        log::error!(
                            "reverse of a link of cell {} is missing from cell {}",
                            cell.index,
                            link.to_index
                        );
                    }
                }
            }
        }
        debug_assert_eq!(problems, 0, "adjacency pairing violations");
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::UniformDensity;

    fn cube_aabb(size_mm: CoordF) -> BoundingBox3 {
        BoundingBox3::from_points_minmax(
            Point3::new(0, 0, 0),
            Point3::new_scale(size_mm, size_mm, size_mm),
        )
    }

    /// 10 mm cube with a 0.4 mm line width.
    fn build(max_depth: i32, density: CoordF) -> Cross3D<UniformDensity> {
        let config = Cross3DConfig {
            max_depth,
            line_width: 400,
        };
        let mut generator =
            Cross3D::new(config, cube_aabb(10.0), UniformDensity(density)).unwrap();
        generator.initialize();
        generator
    }

    #[test]
    fn test_input_validation() {
        let aabb = cube_aabb(10.0);
        assert!(matches!(
            Cross3D::new(
                Cross3DConfig {
                    max_depth: 0,
                    line_width: 400
                },
                aabb,
                UniformDensity(0.2)
            ),
            Err(Cross3DError::InvalidMaxDepth(0))
        ));
        assert!(matches!(
            Cross3D::new(
                Cross3DConfig {
                    max_depth: 4,
                    line_width: 0
                },
                aabb,
                UniformDensity(0.2)
            ),
            Err(Cross3DError::InvalidLineWidth(0))
        ));
        let flat = BoundingBox3::from_points_minmax(
            Point3::new(0, 0, 0),
            Point3::new(10_000, 10_000, 0),
        );
        assert!(matches!(
            Cross3D::new(Cross3DConfig::default(), flat, UniformDensity(0.2)),
            Err(Cross3DError::EmptyBounds(_))
        ));
    }

    #[test]
    fn test_tree_cell_counts() {
        // root + 2 half cubes + 4 quarter cubes
        assert_eq!(build(2, 0.0).cell_count(), 7);
        // ... + 16 half cubes
        assert_eq!(build(3, 0.0).cell_count(), 23);
    }

    #[test]
    fn test_root_cells_tile_the_box() {
        let generator = build(2, 0.0);
        let root = generator.cell(0);
        assert_eq!(root.depth, 0);
        assert_eq!(root.children[2], NO_CELL);
        let first = generator.cell(root.children[0]);
        let second = generator.cell(root.children[1]);
        assert_eq!(first.depth, 1);
        assert!(first.prism.is_half_cube());
        assert!(second.prism.is_half_cube());
        assert!(first.prism.is_expanding);
        // their hypotenuses coincide on the main diagonal: the exit edge of
        // the first meets the entry edge of the second
        assert!(generator.is_next_to(first.index, second.index, Direction::Right));
        // together they fill the footprint
        let total =
            first.prism.triangle.to_polygon().area() + second.prism.triangle.to_polygon().area();
        assert!((total - 100_000_000.0).abs() < 1.0); // (10 mm)² in units²
    }

    #[test]
    fn test_invariant_checkers_pass_after_initialize() {
        let generator = build(3, 0.7);
        assert_eq!(generator.debug_check_depths(), 0);
        assert_eq!(generator.debug_check_volume_stats(), 0);
        assert_eq!(generator.debug_check_links(), 0);
    }

    #[test]
    fn test_volume_accumulation() {
        let generator = build(2, 0.0);
        assert!((generator.cell(0).volume - 1000.0).abs() < 1e-9);
        assert!((generator.cell(1).volume - 500.0).abs() < 1e-9);
        // a quarter-cube child holds a quarter of the volume of its half-cube
        // parent... which is half of the parent's footprint over the full height
        let child = generator.cell(generator.cell(1).children[0]);
        assert!((child.volume - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_allowance_accumulation() {
        let generator = build(2, 0.5);
        let root = generator.cell(0);
        assert!((root.filled_volume_allowance - 500.0).abs() < 1e-6);
        assert!((root.minimally_required_density - 0.5).abs() < 1e-12);
        let first = generator.cell(1);
        assert!((first.filled_volume_allowance - 250.0).abs() < 1e-6);
    }

    #[test]
    fn test_actualized_volume() {
        let generator = build(2, 0.0);
        // one 0.4 mm line crossing 5 mm edge-to-edge over 10 mm of height
        assert!((generator.actualized_volume(1) - 20.0).abs() < 1e-9);
        assert!((generator.actualized_density(1) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_zero_density_refines_root_only() {
        let mut generator = build(4, 0.0);
        generator.create_minimal_density_pattern();
        let subdivided: Vec<CellIndex> = (0..generator.cell_count() as CellIndex)
            .filter(|&i| generator.cell(i).is_subdivided)
            .collect();
        assert_eq!(subdivided, vec![0]);
        let walker = generator.get_bottom_sequence();
        assert_eq!(walker.len(), 2);
        assert_eq!(generator.generate_sierpinski(&walker).len(), 2);
    }

    #[test]
    fn test_subdivide_resplices_neighbor_links() {
        let mut generator = build(2, 0.0);
        generator.create_minimal_density_pattern();
        // arena layout: 0 root, 1 first half cube, 2..=3 its children,
        // 4 second half cube, 5..=6 its children
        assert_eq!(generator.get_bottom_sequence().cells(), &[1, 4]);

        generator.subdivide(1);
        let cell = generator.cell(1);
        assert!(cell.is_subdivided);
        for side in Direction::ALL {
            assert_eq!(generator.links().list_len(cell.adjacent[side.index()]), 0);
        }
        // only the child owning the parent's exit edge touches the neighbor
        assert!(!generator.is_next_to(2, 4, Direction::Right));
        assert!(generator.is_next_to(3, 4, Direction::Right));
        let left_of_second = generator.cell(4).adjacent[Direction::Left.index()];
        assert_eq!(generator.links().list_len(left_of_second), 1);
        assert_eq!(generator.links().get(left_of_second).to_index, 3);

        assert_eq!(generator.get_bottom_sequence().cells(), &[2, 3, 4]);
        assert_eq!(generator.debug_check_links(), 0);
    }

    #[test]
    fn test_is_next_to_vertical() {
        let generator = build(3, 0.0);
        // cell 2 is a quarter cube; children 3, 4 take the lower half of its
        // height and 5, 6 the upper half, with matching footprints
        let quarter = generator.cell(2);
        assert!(quarter.prism.is_quarter_cube());
        assert_eq!(quarter.children, [3, 4, 5, 6]);
        assert!(generator.is_next_to(3, 5, Direction::Up));
        assert!(generator.is_next_to(5, 3, Direction::Down));
        assert!(!generator.is_next_to(3, 6, Direction::Up));
        assert!(generator.is_next_to(3, 4, Direction::Right));
    }

    #[test]
    fn test_expansion_flags_flip_vertically() {
        let generator = build(3, 0.0);
        let quarter = generator.cell(2);
        let lower = generator.cell(quarter.children[0]);
        let upper = generator.cell(quarter.children[2]);
        assert_eq!(lower.prism.is_expanding, !upper.prism.is_expanding);
    }

    #[test]
    fn test_full_density_saturates_at_max_depth() {
        let mut generator = build(3, 1.0);
        generator.create_minimal_density_pattern();
        for index in 0..generator.cell_count() as CellIndex {
            let cell = generator.cell(index);
            if cell.has_children() && cell.depth < 3 {
                assert!(cell.is_subdivided);
            }
            // every linked cell is an active leaf at the maximum depth
            if cell.adjacent.iter().any(|&head| head != NO_LINK) {
                assert_eq!(cell.depth, 3);
            }
        }
        let walker = generator.get_bottom_sequence();
        assert_eq!(walker.len(), 8);
        for pair in walker.cells().windows(2) {
            assert!(generator.is_next_to(pair[0], pair[1], Direction::Right));
        }
        assert_eq!(generator.debug_check_links(), 0);
    }

    #[test]
    fn test_refinement_is_idempotent() {
        let mut generator = build(4, 0.3);
        generator.create_minimal_density_pattern();
        let subdivided_before: Vec<bool> = (0..generator.cell_count() as CellIndex)
            .map(|i| generator.cell(i).is_subdivided)
            .collect();
        generator.create_minimal_density_pattern();
        let subdivided_after: Vec<bool> = (0..generator.cell_count() as CellIndex)
            .map(|i| generator.cell(i).is_subdivided)
            .collect();
        assert_eq!(subdivided_before, subdivided_after);
    }
}
