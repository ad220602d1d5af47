//! Tests for grid tile identification.

use scene_common::{GeoTransform, GridDefinition, TileId};
use test_utils::assert_approx_eq;

const CELL: f64 = 150_000.0;

fn conus() -> GridDefinition {
    GridDefinition::CONUS_ARD
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_tile_id_is_deterministic() {
    let gt = GeoTransform([-2_115_585.0, 30.0, 0.0, 2_114_805.0, 0.0, -30.0]);
    let first = TileId::from_geotransform(&gt, &conus());
    let second = TileId::from_geotransform(&gt, &conus());
    assert_eq!(first, second);
}

#[test]
fn test_known_ard_tile() {
    // Upper-left corner of CONUS ARD tile h003v008
    let ul_x = -2_565_585.0 + 3.0 * CELL;
    let ul_y = 3_314_805.0 - 8.0 * CELL;
    let tile = TileId::from_upper_left(ul_x, ul_y, &conus());
    assert_eq!(tile, TileId::new(3, 8));
    assert_eq!(tile.to_string(), "h3v8");
}

// ============================================================================
// Stepping by one cell
// ============================================================================

#[test]
fn test_step_east_increments_h() {
    let ul_x = -2_565_585.0 + 5.0 * CELL + 1234.0;
    let ul_y = 3_314_805.0 - 2.0 * CELL - 77.0;
    let base = TileId::from_upper_left(ul_x, ul_y, &conus());
    let east = TileId::from_upper_left(ul_x + CELL, ul_y, &conus());
    assert_eq!(east.h, base.h + 1);
    assert_eq!(east.v, base.v);
}

#[test]
fn test_step_north_decrements_v() {
    let ul_x = -2_565_585.0 + 10.0 * CELL + 15.0;
    let ul_y = 3_314_805.0 - 6.0 * CELL - 15.0;
    let base = TileId::from_upper_left(ul_x, ul_y, &conus());
    let north = TileId::from_upper_left(ul_x, ul_y + CELL, &conus());
    assert_eq!(north.v, base.v - 1);
    assert_eq!(north.h, base.h);
}

// ============================================================================
// Floor semantics
// ============================================================================

#[test]
fn test_west_of_origin_floors_to_negative() {
    let tile = TileId::from_upper_left(-2_565_585.0 - 1.0, 3_314_805.0, &conus());
    assert_eq!(tile.h, -1);
    assert_eq!(tile.v, 0);
}

#[test]
fn test_interior_point_floors_down() {
    let tile = TileId::from_upper_left(
        -2_565_585.0 + 1.999 * CELL,
        3_314_805.0 - 0.5 * CELL,
        &conus(),
    );
    assert_eq!(tile, TileId::new(1, 0));
}

#[test]
fn test_custom_grid() {
    let grid = GridDefinition::new(0.0, 0.0, 10.0).unwrap();
    assert_eq!(TileId::from_upper_left(25.0, -35.0, &grid), TileId::new(2, 3));
}

// ============================================================================
// Cell corners
// ============================================================================

#[test]
fn test_cell_corner_contains_point() {
    let ul_x = -1_234_567.8;
    let ul_y = 2_345_678.9;
    let tile = TileId::from_upper_left(ul_x, ul_y, &conus());
    let (corner_x, corner_y) = tile.upper_left(&conus());

    assert!(corner_x <= ul_x && ul_x < corner_x + CELL);
    assert!(corner_y >= ul_y && ul_y > corner_y - CELL);
}

#[test]
fn test_cell_corner_maps_back_to_same_tile() {
    let tile = TileId::new(3, 8);
    let (x, y) = tile.upper_left(&conus());
    assert_approx_eq!(x, -2_115_585.0, 1e-6);
    assert_approx_eq!(y, 2_114_805.0, 1e-6);
    assert_eq!(TileId::from_upper_left(x, y, &conus()), tile);
}
