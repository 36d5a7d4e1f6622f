use std::collections::VecDeque;

use hexsite::{
    grid::{synthetic::SyntheticRegion, CellId, HexGrid, InfraKind, UNREACHED},
    propagate::{propagate, recompute},
};

const HOP: f64 = 10.0;

fn region(rows: u32, cols: u32) -> SyntheticRegion {
    let mut region = SyntheticRegion::new(rows, cols, 11);
    region.trunk_road_hop_km = None;
    region
}

/// Plain breadth-first hop counts from a set of seeds.
fn bfs_hops(grid: &HexGrid, seeds: &[CellId]) -> Vec<Option<u32>> {
    let mut hops = vec![None; grid.len()];
    let mut queue = VecDeque::new();
    for &seed in seeds {
        if hops[seed as usize].is_none() {
            hops[seed as usize] = Some(0);
            queue.push_back(seed);
        }
    }
    while let Some(id) = queue.pop_front() {
        let next = hops[id as usize].map(|h| h + 1);
        for neighbor in grid.neighbors_of(id) {
            if hops[neighbor as usize].is_none() {
                hops[neighbor as usize] = next;
                queue.push_back(neighbor);
            }
        }
    }
    hops
}

fn assert_matches_bfs(grid: &HexGrid, seeds: &[CellId], kind: InfraKind) {
    let hops = bfs_hops(grid, seeds);
    for cell in grid.cells() {
        let expected = hops[cell.id() as usize].map_or(UNREACHED, |h| h as f64 * HOP);
        assert_eq!(
            grid.distance(cell.id(), kind),
            expected,
            "cell {} disagrees with breadth-first distance",
            cell.id()
        );
    }
}

#[test]
fn converges_to_hop_distance_from_nearest_seed() {
    let region = region(12, 15);
    let mut grid = region.build().unwrap();
    let seeds = [region.cell_id(0, 0), region.cell_id(7, 9), region.cell_id(11, 14)];
    propagate(&mut grid, &seeds, InfraKind::Grid, 0.0, HOP);
    assert_matches_bfs(&grid, &seeds, InfraKind::Grid);
}

#[test]
fn successive_lines_only_lower_distances() {
    let region = region(10, 10);
    let mut grid = region.build().unwrap();
    let first: Vec<CellId> = (0..10).map(|col| region.cell_id(2, col)).collect();
    propagate(&mut grid, &first, InfraKind::Road, 0.0, HOP);
    let before: Vec<f64> = grid.cells().map(|c| c.distances().road_dist).collect();

    let second: Vec<CellId> = (0..10).map(|row| region.cell_id(row, 8)).collect();
    propagate(&mut grid, &second, InfraKind::Road, 0.0, HOP);
    for (cell, old) in grid.cells().zip(&before) {
        assert!(cell.distances().road_dist <= *old);
    }

    let mut union = first.clone();
    union.extend(&second);
    assert_matches_bfs(&grid, &union, InfraKind::Road);
}

#[test]
fn incremental_result_equals_full_recompute() {
    let region = region(9, 11);
    let mut incremental = region.build().unwrap();
    let a = [region.cell_id(1, 1), region.cell_id(1, 2)];
    let b = [region.cell_id(8, 10)];
    propagate(&mut incremental, &a, InfraKind::Grid, 0.0, HOP);
    propagate(&mut incremental, &b, InfraKind::Grid, 0.0, HOP);

    let mut full = region.build().unwrap();
    recompute(&mut full, &[a[0], a[1], b[0]], InfraKind::Grid, HOP);

    for (x, y) in incremental.cells().zip(full.cells()) {
        assert_eq!(x.distances().grid_dist, y.distances().grid_dist);
    }
}

#[test]
fn rerunning_the_same_seeds_changes_nothing() {
    let region = region(8, 8);
    let mut grid = region.build().unwrap();
    let seeds = [region.cell_id(4, 4)];
    propagate(&mut grid, &seeds, InfraKind::Grid, 0.0, HOP);
    let again = propagate(&mut grid, &seeds, InfraKind::Grid, 0.0, HOP);
    assert_eq!(again.updated, 0);
    assert_matches_bfs(&grid, &seeds, InfraKind::Grid);
}

#[test]
fn kinds_are_independent() {
    let region = region(6, 6);
    let mut grid = region.build().unwrap();
    propagate(&mut grid, &[region.cell_id(3, 3)], InfraKind::Grid, 0.0, HOP);
    assert!(grid.cells().all(|c| c.distances().road_dist == UNREACHED));
}

#[test]
fn trunk_road_covers_the_whole_region() {
    let region = SyntheticRegion::new(7, 5, 2);
    let grid = region.build().unwrap();
    let trunk: Vec<CellId> = (0..5).map(|col| region.cell_id(0, col)).collect();
    assert_matches_bfs(&grid, &trunk, InfraKind::Road);
}
