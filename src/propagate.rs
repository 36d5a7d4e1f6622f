//! Multi-source, uniform-cost relaxation of a distance attribute across the
//! hex adjacency graph.

use crate::grid::{CellId, HexGrid, InfraKind};

/// Default distance added per adjacency hop.
pub const DEFAULT_HOP_KM: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub seeds: usize,
    /// Number of cell relaxations performed.
    pub updated: usize,
    pub rounds: usize,
}

/// Lowers `kind` distances outward from `seeds`, starting at `initial` and
/// adding `hop` per ring. Only cells that actually improve expand their
/// neighbours, so repeated runs with no closer seeds touch nothing.
pub fn propagate(
    grid: &mut HexGrid,
    seeds: &[CellId],
    kind: InfraKind,
    initial: f64,
    hop: f64,
) -> PropagationStats {
    debug_assert!(hop >= 0.0, "hop increment must be non-negative");
    let hop = hop.max(0.0);
    let mut stats = PropagationStats::default();

    // round in which each cell was last queued; deduplicates the next frontier
    let mut queued = vec![usize::MAX; grid.len()];
    let mut frontier = Vec::with_capacity(seeds.len());
    for &seed in seeds {
        debug_assert!(grid.contains_id(seed), "seed {seed} is not a cell");
        if grid.contains_id(seed) && queued[seed as usize] != 0 {
            queued[seed as usize] = 0;
            frontier.push(seed);
        }
    }
    stats.seeds = frontier.len();

    let mut distance = initial;
    let mut round = 0;
    while !frontier.is_empty() {
        round += 1;
        let mut next = Vec::new();
        for &id in &frontier {
            if grid.distance(id, kind) <= distance || distance.is_nan() {
                continue;
            }
            grid.set_distance(id, kind, distance);
            stats.updated += 1;
            let Some(cell) = grid.cell(id) else { continue };
            for neighbor in cell.neighbors() {
                let slot = &mut queued[neighbor as usize];
                if *slot != round {
                    *slot = round;
                    next.push(neighbor);
                }
            }
        }
        distance += hop;
        frontier = next;
    }
    stats.rounds = round;
    stats
}

/// Rebuilds one distance attribute from scratch: every cell is reset to
/// unreached, then the union of `seeds` is propagated from zero.
pub fn recompute(grid: &mut HexGrid, seeds: &[CellId], kind: InfraKind, hop: f64) -> PropagationStats {
    grid.reset_distance(kind);
    propagate(grid, seeds, kind, 0.0, hop)
}
