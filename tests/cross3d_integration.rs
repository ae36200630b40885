//! Cross 3D Infill Integration Tests
//!
//! These tests drive the full pipeline on small volumes: build the prism
//! tree, refine it against a density field, and walk the layer chains that
//! produce the output curve.

use cross_infill::geometry::{BoundingBox3, Point, Point3};
use cross_infill::infill::cross3d::{CellIndex, Direction, NO_LINK};
use cross_infill::{scale, Coord, CoordF, Cross3D, Cross3DConfig, DensityProvider, UniformDensity};

/// Cube of the given edge length with its minimum corner at the origin.
fn cube_aabb(size_mm: CoordF) -> BoundingBox3 {
    BoundingBox3::from_points_minmax(
        Point3::new(0, 0, 0),
        Point3::new_scale(size_mm, size_mm, size_mm),
    )
}

/// Build and initialize a generator over a 10 mm cube with 0.4 mm lines.
fn build<D: DensityProvider>(max_depth: i32, provider: D) -> Cross3D<D> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = Cross3DConfig {
        max_depth,
        line_width: scale(0.4),
    };
    let mut generator = Cross3D::new(config, cube_aabb(10.0), provider).unwrap();
    generator.initialize();
    generator
}

/// Indices of the refined pattern's active leaves: exactly the cells that
/// still carry adjacency links.
fn active_leaves<D: DensityProvider>(generator: &Cross3D<D>) -> Vec<CellIndex> {
    (0..generator.cell_count() as CellIndex)
        .filter(|&index| {
            let cell = generator.cell(index);
            !cell.is_subdivided && cell.adjacent.iter().any(|&head| head != NO_LINK)
        })
        .collect()
}

#[test]
fn zero_density_stops_at_the_roots() {
    let mut generator = build(4, UniformDensity(0.0));
    generator.create_minimal_density_pattern();

    // only the synthetic root subdivides; every leaf already satisfies a
    // density target of zero
    for index in 0..generator.cell_count() as CellIndex {
        let cell = generator.cell(index);
        assert_eq!(cell.is_subdivided, index == 0);
        assert!(cell.depth <= 4);
    }

    let walker = generator.get_bottom_sequence();
    assert_eq!(walker.len(), 2);
    assert_eq!(generator.generate_sierpinski(&walker).len(), 2);
    assert_eq!(active_leaves(&generator).len(), 2);
}

#[test]
fn full_density_saturates_at_max_depth() {
    let mut generator = build(3, UniformDensity(1.0));
    generator.create_minimal_density_pattern();

    // a single 0.4 mm line cannot fill a prism completely, so refinement
    // runs into the depth cap everywhere
    for index in active_leaves(&generator) {
        assert_eq!(generator.cell(index).depth, 3);
    }
    // the balance invariant holds trivially
    assert_balanced(&generator);
    assert_eq!(generator.debug_check_links(), 0);
}

/// Every adjacency link connects leaves within one subdivision level.
fn assert_balanced<D: DensityProvider>(generator: &Cross3D<D>) {
    for index in active_leaves(generator) {
        let cell = generator.cell(index);
        for head in cell.adjacent {
            for link_id in generator.links().iter(head) {
                let neighbor = generator.cell(generator.links().get(link_id).to_index);
                assert!(
                    (cell.depth - neighbor.depth).abs() <= 1,
                    "leaf at depth {} touches leaf at depth {}",
                    cell.depth,
                    neighbor.depth
                );
            }
        }
    }
}

#[test]
fn split_density_field_keeps_depths_balanced() {
    // dense on the left half of the cube, empty on the right
    let provider = |bounds: &BoundingBox3| -> CoordF {
        if (bounds.min.x + bounds.max.x) / 2 < scale(5.0) {
            1.0
        } else {
            0.0
        }
    };
    let mut generator = build(5, provider);
    generator.create_minimal_density_pattern();
    assert_eq!(generator.debug_check_links(), 0);
    assert_balanced(&generator);

    let leaves = active_leaves(&generator);
    let max_leaf_depth = leaves
        .iter()
        .map(|&index| generator.cell(index).depth)
        .max()
        .unwrap();
    let min_leaf_depth = leaves
        .iter()
        .map(|&index| generator.cell(index).depth)
        .min()
        .unwrap();
    // the left half refines to the cap, the right half stays shallow
    assert_eq!(max_leaf_depth, 5);
    assert!(min_leaf_depth < 4);

    // coverage: every leaf is either at the cap, satisfied, or held back by
    // the balance constraint
    for index in leaves {
        let cell = generator.cell(index);
        let satisfied =
            generator.actualized_density(index) >= cell.minimally_required_density;
        assert!(
            cell.depth == 5 || satisfied || generator.is_constrained(index),
            "leaf at depth {} neither satisfied nor blocked",
            cell.depth
        );
    }
}

#[test]
fn advance_sequence_lifts_the_chain() {
    let mut generator = build(3, UniformDensity(1.0));
    generator.create_minimal_density_pattern();

    let mut walker = generator.get_bottom_sequence();
    assert_eq!(walker.len(), 8);
    for &index in walker.cells() {
        assert_eq!(generator.cell(index).prism.z_range.min, 0);
    }

    // exactly at the half height nothing falls below yet
    let z_mid = scale(5.0);
    generator.advance_sequence(&mut walker, z_mid);
    for &index in walker.cells() {
        assert!(generator.cell(index).prism.z_range.max >= z_mid);
    }
    assert_eq!(walker.len(), 8);

    // past the half height the whole chain swaps to the upper prisms
    let z_upper = scale(7.5);
    generator.advance_sequence(&mut walker, z_upper);
    assert_eq!(walker.len(), 8);
    for &index in walker.cells() {
        let cell = generator.cell(index);
        assert!(cell.prism.z_range.max >= z_upper);
        assert_eq!(cell.prism.z_range.min, z_mid);
    }
    // consecutive chain cells stay left/right adjacent
    for pair in walker.cells().windows(2) {
        assert!(generator.is_next_to(pair[0], pair[1], Direction::Right));
    }
}

#[test]
fn link_pairs_stay_symmetric_after_manual_subdivision() {
    let mut generator = build(2, UniformDensity(0.0));
    generator.create_minimal_density_pattern();
    generator.subdivide(1);

    // every link's reverse lives in the target's opposite list and points
    // straight back
    for index in 0..generator.cell_count() as CellIndex {
        let cell = generator.cell(index);
        for side in Direction::ALL {
            for link_id in generator.links().iter(cell.adjacent[side.index()]) {
                let link = generator.links().get(link_id);
                let reverse = generator.links().get(link.reverse);
                assert_eq!(reverse.reverse, link_id);
                assert_eq!(reverse.to_index, index);
                assert!(generator
                    .links()
                    .iter(generator.cell(link.to_index).adjacent[side.opposite().index()])
                    .any(|id| id == link.reverse));
            }
        }
    }
    assert_eq!(generator.debug_check_links(), 0);

    // the subdivided cell handed all of its adjacency to its children
    for side in Direction::ALL {
        assert_eq!(generator.cell(1).adjacent[side.index()], NO_LINK);
    }
}

#[test]
fn depth_one_tree_yields_the_two_root_midpoints() {
    let mut generator = build(1, UniformDensity(1.0));
    generator.create_minimal_density_pattern();

    let walker = generator.get_bottom_sequence();
    let polyline = generator.generate_sierpinski(&walker);
    assert_eq!(polyline.len(), 2);
    // centroids of the two mirrored right triangles tiling the footprint
    let expected_first: Coord = scale(10.0) / 3;
    let expected_second: Coord = 2 * scale(10.0) / 3;
    assert_eq!(
        polyline.points()[0],
        Point::new(expected_first, expected_second)
    );
    assert_eq!(
        polyline.points()[1],
        Point::new(expected_second, expected_first)
    );
}

#[test]
fn refinement_is_idempotent() {
    let mut generator = build(4, UniformDensity(0.4));
    generator.create_minimal_density_pattern();
    let before: Vec<bool> = (0..generator.cell_count() as CellIndex)
        .map(|index| generator.cell(index).is_subdivided)
        .collect();

    generator.create_minimal_density_pattern();
    let after: Vec<bool> = (0..generator.cell_count() as CellIndex)
        .map(|index| generator.cell(index).is_subdivided)
        .collect();
    assert_eq!(before, after);
    assert_eq!(generator.debug_check_links(), 0);
}

#[test]
fn debug_dumps_write_svg_files() {
    let mut generator = build(2, UniformDensity(1.0));
    generator.create_minimal_density_pattern();
    let walker = generator.get_bottom_sequence();

    let dir = std::env::temp_dir();
    let tree_path = dir.join("cross3d_tree.svg");
    let sequence_path = dir.join("cross3d_sequence.svg");
    let walker_path = dir.join("cross3d_walker.svg");
    generator.debug_output_tree(&tree_path).unwrap();
    generator.debug_output_sequence(&sequence_path).unwrap();
    generator.debug_output_walker(&walker, &walker_path).unwrap();

    let markup = std::fs::read_to_string(&tree_path).unwrap();
    assert!(markup.starts_with("<svg"));
    assert!(markup.contains("<path"));
}
