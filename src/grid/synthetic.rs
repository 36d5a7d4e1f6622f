//! Seeded rectangular hex regions for demos, tests and benchmarks.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{CellId, GridError, HexCell, HexGrid, InfraKind, NeighborSlots, StaticAttrs};
use crate::geometry::{LocalProjection, LonLat};
use crate::propagate::propagate;

/// Odd-r offset neighbour steps as (dcol, drow), starting east and going
/// counter-clockwise.
const EVEN_ROW_STEPS: [(i64, i64); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (-1, -1), (0, -1)];
const ODD_ROW_STEPS: [(i64, i64); 6] = [(1, 0), (1, 1), (0, 1), (-1, 0), (0, -1), (1, -1)];

#[derive(Debug, Clone)]
pub struct SyntheticRegion {
    /// South-west cell centre.
    pub origin: LonLat,
    pub rows: u32,
    pub cols: u32,
    /// Centre-to-centre spacing of neighbouring cells.
    pub cell_km: f64,
    pub seed: u64,
    /// Width of the lake strip along the western edge.
    pub lake_km: f64,
    /// Seeds an existing road along the southern row, spread with this hop.
    pub trunk_road_hop_km: Option<f64>,
}

impl Default for SyntheticRegion {
    fn default() -> Self {
        Self {
            origin: LonLat::new(33.0, -2.0),
            rows: 40,
            cols: 40,
            cell_km: 6.0,
            seed: 7,
            lake_km: 15.0,
            trunk_road_hop_km: Some(10.0),
        }
    }
}

impl SyntheticRegion {
    pub fn new(rows: u32, cols: u32, seed: u64) -> Self {
        Self {
            rows,
            cols,
            seed,
            ..Self::default()
        }
    }

    /// Row-major id; only meaningful for regions that [`build`](Self::build).
    pub fn cell_id(&self, row: u32, col: u32) -> CellId {
        row * self.cols + col
    }

    /// Centre of a cell in local kilometres east/north of the origin.
    pub fn centre_km(&self, row: u32, col: u32) -> (f64, f64) {
        let radius = self.cell_km / 3f64.sqrt();
        let shift = if row % 2 == 1 { 0.5 } else { 0.0 };
        (self.cell_km * (col as f64 + shift), row as f64 * 1.5 * radius)
    }

    pub fn centre(&self, row: u32, col: u32) -> LonLat {
        let (x, y) = self.centre_km(row, col);
        LocalProjection::new(self.origin).to_lonlat(x, y)
    }

    pub fn neighbors(&self, row: u32, col: u32) -> NeighborSlots {
        let steps = if row % 2 == 1 {
            &ODD_ROW_STEPS
        } else {
            &EVEN_ROW_STEPS
        };
        let mut slots = [None; 6];
        for (slot, (dc, dr)) in slots.iter_mut().zip(steps) {
            let c = col as i64 + dc;
            let r = row as i64 + dr;
            if c >= 0 && r >= 0 && c < self.cols as i64 && r < self.rows as i64 {
                *slot = Some(self.cell_id(r as u32, c as u32));
            }
        }
        slots
    }

    pub fn build(&self) -> Result<HexGrid, GridError> {
        let projection = LocalProjection::new(self.origin);
        let radius = self.cell_km / 3f64.sqrt();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let count = self
            .rows
            .checked_mul(self.cols)
            .ok_or(GridError::RegionTooLarge {
                rows: self.rows,
                cols: self.cols,
            })?;
        let mut cells = Vec::with_capacity(count as usize);
        for row in 0..self.rows {
            for col in 0..self.cols {
                let (x, y) = self.centre_km(row, col);
                let attrs = StaticAttrs {
                    adm1: format!("District {}", row / 10 + 1),
                    pop: rng.gen_range(0.0..120_000.0_f64).round(),
                    precip: rng.gen_range(300.0..1_300.0_f64).round(),
                    lake_dist: (x - self.lake_km).max(0.0),
                    water_dist: rng.gen_range(0.0..40.0_f64),
                };
                cells.push(HexCell::new(
                    self.cell_id(row, col),
                    projection.hexagon(x, y, radius),
                    self.neighbors(row, col),
                    attrs,
                ));
            }
        }
        let mut grid = HexGrid::from_cells(cells)?;
        if let Some(hop) = self.trunk_road_hop_km {
            let trunk: Vec<CellId> = (0..self.cols).map(|col| self.cell_id(0, col)).collect();
            propagate(&mut grid, &trunk, InfraKind::Road, 0.0, hop);
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_symmetric_adjacency() {
        let region = SyntheticRegion::new(6, 5, 1);
        let grid = region.build().unwrap();
        assert_eq!(grid.len(), 30);
        // interior cell has all six neighbours
        assert_eq!(grid.neighbors_of(region.cell_id(2, 2)).len(), 6);
        // corner cell at the origin
        assert_eq!(grid.neighbors_of(0).len(), 2);
    }

    #[test]
    fn oversized_region_is_an_error() {
        let region = SyntheticRegion::new(u32::MAX, 2, 1);
        assert_eq!(
            region.build().unwrap_err(),
            GridError::RegionTooLarge {
                rows: u32::MAX,
                cols: 2
            }
        );
    }

    #[test]
    fn cell_centres_locate_to_their_own_cell() {
        let region = SyntheticRegion::new(5, 5, 3);
        let grid = region.build().unwrap();
        for row in 0..5 {
            for col in 0..5 {
                assert_eq!(
                    grid.locate(region.centre(row, col)),
                    Some(region.cell_id(row, col))
                );
            }
        }
    }

    #[test]
    fn same_seed_same_attributes() {
        let a = SyntheticRegion::new(4, 4, 11).build().unwrap();
        let b = SyntheticRegion::new(4, 4, 11).build().unwrap();
        for (x, y) in a.cells().zip(b.cells()) {
            assert_eq!(x.static_attrs(), y.static_attrs());
        }
    }

    #[test]
    fn trunk_road_spreads_north() {
        let region = SyntheticRegion::new(4, 3, 2);
        let grid = region.build().unwrap();
        assert_eq!(grid.distance(region.cell_id(0, 1), InfraKind::Road), 0.0);
        assert_eq!(grid.distance(region.cell_id(3, 1), InfraKind::Road), 30.0);
        assert!(grid.distance(0, InfraKind::Grid).is_infinite());
    }
}
