//! Hex grid: cells, their geometry and the fixed 6-neighbour adjacency.

mod index;
pub mod loader;
pub mod synthetic;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attrs::{AttrValue, Attribute};
use crate::geometry::{BoundingBox, LonLat, Polygon};

pub use index::SpatialIndex;

pub type CellId = u32;

pub const NEIGHBOR_SLOTS: usize = 6;

/// Distance value of a cell no infrastructure has reached.
pub const UNREACHED: f64 = f64::INFINITY;

pub type NeighborSlots = [Option<CellId>; NEIGHBOR_SLOTS];

/// Kind of drawable infrastructure; each owns one distance attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfraKind {
    #[serde(alias = "grid_dist")]
    Grid,
    #[serde(alias = "road_dist")]
    Road,
}

impl InfraKind {
    pub const ALL: [InfraKind; 2] = [InfraKind::Grid, InfraKind::Road];

    pub fn as_str(self) -> &'static str {
        match self {
            InfraKind::Grid => "grid",
            InfraKind::Road => "road",
        }
    }

    pub fn attribute(self) -> Attribute {
        match self {
            InfraKind::Grid => Attribute::GridDist,
            InfraKind::Road => Attribute::RoadDist,
        }
    }
}

impl fmt::Display for InfraKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InfraKind {
    type Err = crate::config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "grid" | "grid_dist" => Ok(InfraKind::Grid),
            "road" | "road_dist" => Ok(InfraKind::Road),
            other => Err(crate::config::ConfigError::UnknownInfra(other.to_string())),
        }
    }
}

/// Inputs fixed by the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticAttrs {
    #[serde(default)]
    pub adm1: String,
    #[serde(default)]
    pub pop: f64,
    #[serde(default)]
    pub precip: f64,
    #[serde(default)]
    pub lake_dist: f64,
    #[serde(default)]
    pub water_dist: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceAttrs {
    pub grid_dist: f64,
    pub road_dist: f64,
}

impl DistanceAttrs {
    pub fn get(&self, kind: InfraKind) -> f64 {
        match kind {
            InfraKind::Grid => self.grid_dist,
            InfraKind::Road => self.road_dist,
        }
    }

    fn set(&mut self, kind: InfraKind, value: f64) {
        match kind {
            InfraKind::Grid => self.grid_dist = value,
            InfraKind::Road => self.road_dist = value,
        }
    }
}

impl Default for DistanceAttrs {
    fn default() -> Self {
        Self {
            grid_dist: UNREACHED,
            road_dist: UNREACHED,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FarmType {
    Cage,
    Pond,
    #[default]
    None,
}

impl FarmType {
    pub fn as_str(self) -> &'static str {
        match self {
            FarmType::Cage => "cage",
            FarmType::Pond => "pond",
            FarmType::None => "none",
        }
    }
}

/// Economic outputs, recomputed wholesale on every pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedAttrs {
    pub tech: FarmType,
    pub fish_output: f64,
    pub revenue: f64,
    pub profit: f64,
    pub gov_costs: f64,
    pub gov_annual: f64,
    pub social: f64,
}

#[derive(Debug, Clone)]
pub struct HexCell {
    id: CellId,
    polygon: Arc<Polygon>,
    bbox: Option<BoundingBox>,
    neighbors: NeighborSlots,
    static_attrs: StaticAttrs,
    distances: DistanceAttrs,
    derived: DerivedAttrs,
}

impl HexCell {
    pub fn new(id: CellId, polygon: Polygon, neighbors: NeighborSlots, static_attrs: StaticAttrs) -> Self {
        let bbox = polygon.bbox();
        Self {
            id,
            polygon: Arc::new(polygon),
            bbox,
            neighbors,
            static_attrs,
            distances: DistanceAttrs::default(),
            derived: DerivedAttrs::default(),
        }
    }

    pub fn with_distances(mut self, distances: DistanceAttrs) -> Self {
        self.distances = distances;
        self
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    pub fn neighbor_slots(&self) -> &NeighborSlots {
        &self.neighbors
    }

    pub fn neighbors(&self) -> impl Iterator<Item = CellId> + '_ {
        self.neighbors.iter().flatten().copied()
    }

    pub fn static_attrs(&self) -> &StaticAttrs {
        &self.static_attrs
    }

    pub fn distances(&self) -> &DistanceAttrs {
        &self.distances
    }

    pub fn derived(&self) -> &DerivedAttrs {
        &self.derived
    }

    pub fn attr(&self, attribute: Attribute) -> AttrValue<'_> {
        attribute.value(self)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("grid has no cells")]
    Empty,
    #[error("cell id {0} appears more than once")]
    DuplicateId(CellId),
    #[error("cell ids must be contiguous from 0; id {id} is out of range for {len} cells")]
    NonContiguousId { id: CellId, len: usize },
    #[error("cell {cell} lists itself as a neighbour")]
    SelfNeighbor { cell: CellId },
    #[error("cell {cell} lists neighbour {neighbor} which does not exist")]
    NeighborOutOfRange { cell: CellId, neighbor: CellId },
    #[error("cell {cell} lists neighbour {neighbor} more than once")]
    DuplicateNeighbor { cell: CellId, neighbor: CellId },
    #[error("cell {cell} lists neighbour {neighbor} but not the other way round")]
    AsymmetricAdjacency { cell: CellId, neighbor: CellId },
    #[error("feature {feature}: {reason}")]
    InvalidFeature { feature: usize, reason: String },
    #[error("a {rows}x{cols} region has more cells than ids")]
    RegionTooLarge { rows: u32, cols: u32 },
    #[error("dataset is not valid GeoJSON: {0}")]
    Json(String),
}

/// All cells of a study region. Adjacency and geometry are fixed at
/// construction; only distance and derived attributes change afterwards.
#[derive(Debug, Clone)]
pub struct HexGrid {
    cells: Vec<HexCell>,
    index: Arc<SpatialIndex>,
}

impl HexGrid {
    /// Validates ids and adjacency; cells may be passed in any order.
    pub fn from_cells(mut cells: Vec<HexCell>) -> Result<Self, GridError> {
        if cells.is_empty() {
            return Err(GridError::Empty);
        }
        let len = cells.len();
        let mut seen = vec![false; len];
        for cell in &cells {
            let slot = cell.id as usize;
            if slot >= len {
                return Err(GridError::NonContiguousId { id: cell.id, len });
            }
            if seen[slot] {
                return Err(GridError::DuplicateId(cell.id));
            }
            seen[slot] = true;
        }
        cells.sort_by_key(|cell| cell.id);

        for cell in &cells {
            let mut listed: Vec<CellId> = Vec::with_capacity(NEIGHBOR_SLOTS);
            for neighbor in cell.neighbors() {
                if neighbor == cell.id {
                    return Err(GridError::SelfNeighbor { cell: cell.id });
                }
                if neighbor as usize >= len {
                    return Err(GridError::NeighborOutOfRange {
                        cell: cell.id,
                        neighbor,
                    });
                }
                if listed.contains(&neighbor) {
                    return Err(GridError::DuplicateNeighbor {
                        cell: cell.id,
                        neighbor,
                    });
                }
                listed.push(neighbor);
                if !cells[neighbor as usize].neighbors().any(|back| back == cell.id) {
                    return Err(GridError::AsymmetricAdjacency {
                        cell: cell.id,
                        neighbor,
                    });
                }
            }
        }

        let index = SpatialIndex::build(&cells);
        Ok(Self {
            cells,
            index: Arc::new(index),
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, id: CellId) -> Option<&HexCell> {
        self.cells.get(id as usize)
    }

    pub fn cells(&self) -> impl Iterator<Item = &HexCell> + '_ {
        self.cells.iter()
    }

    pub fn for_each(&self, f: impl FnMut(&HexCell)) {
        self.cells.iter().for_each(f);
    }

    pub fn contains_id(&self, id: CellId) -> bool {
        (id as usize) < self.cells.len()
    }

    /// Neighbours of `id`; empty for unknown ids.
    pub fn neighbors_of(&self, id: CellId) -> Vec<CellId> {
        self.cell(id)
            .map(|cell| cell.neighbors().collect())
            .unwrap_or_default()
    }

    /// Cell whose polygon contains `point`, if any.
    pub fn locate(&self, point: LonLat) -> Option<CellId> {
        if !point.is_finite() {
            return None;
        }
        self.index.locate(&self.cells, point)
    }

    pub fn distance(&self, id: CellId, kind: InfraKind) -> f64 {
        self.cells[id as usize].distances.get(kind)
    }

    pub fn set_distance(&mut self, id: CellId, kind: InfraKind, value: f64) {
        self.cells[id as usize].distances.set(kind, value);
    }

    /// Resets one distance attribute on every cell to [`UNREACHED`].
    pub fn reset_distance(&mut self, kind: InfraKind) {
        for cell in &mut self.cells {
            cell.distances.set(kind, UNREACHED);
        }
    }

    /// Recomputes every cell's derived attributes from `f`.
    pub fn update_derived(&mut self, f: impl Fn(&HexCell) -> DerivedAttrs) {
        for cell in &mut self.cells {
            cell.derived = f(cell);
        }
    }
}
