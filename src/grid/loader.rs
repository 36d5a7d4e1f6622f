//! Reads the precomputed hex dataset (a GeoJSON feature collection).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::{CellId, DistanceAttrs, GridError, HexCell, HexGrid, NeighborSlots, StaticAttrs, UNREACHED};
use crate::geometry::{LonLat, Polygon};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    index: Option<f64>,
    n0: Option<f64>,
    n1: Option<f64>,
    n2: Option<f64>,
    n3: Option<f64>,
    n4: Option<f64>,
    n5: Option<f64>,
    adm1: Option<String>,
    #[serde(alias = "Pop")]
    pop: Option<f64>,
    precip: Option<f64>,
    lake_dist: Option<f64>,
    water_dist: Option<f64>,
    grid_dist: Option<f64>,
    road_dist: Option<f64>,
}

pub fn load(path: impl AsRef<Path>) -> Result<HexGrid> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hex dataset {}", path.display()))?;
    let grid = from_geojson_str(&data)
        .with_context(|| format!("Failed to build grid from {}", path.display()))?;
    tracing::info!(
        target: "hexsite::grid",
        path = %path.display(),
        cells = grid.len(),
        "grid.loaded"
    );
    Ok(grid)
}

pub fn from_geojson_str(data: &str) -> Result<HexGrid, GridError> {
    let collection: FeatureCollection =
        serde_json::from_str(data).map_err(|err| GridError::Json(err.to_string()))?;
    let cells = collection
        .features
        .into_iter()
        .enumerate()
        .map(|(position, feature)| feature_to_cell(position, feature))
        .collect::<Result<Vec<_>, _>>()?;
    HexGrid::from_cells(cells)
}

fn feature_to_cell(position: usize, feature: Feature) -> Result<HexCell, GridError> {
    let invalid = |reason: String| GridError::InvalidFeature {
        feature: position,
        reason,
    };
    let props = feature.properties;

    let id = match props.index {
        Some(index) => cell_id(index).ok_or_else(|| invalid(format!("invalid index {index}")))?,
        None => CellId::try_from(position).map_err(|_| invalid("too many features".into()))?,
    };

    let slots = [props.n0, props.n1, props.n2, props.n3, props.n4, props.n5];
    let mut neighbors: NeighborSlots = [None; 6];
    for (n, (slot, raw)) in neighbors.iter_mut().zip(slots).enumerate() {
        *slot = match raw {
            // null or negative marks an empty slot
            None => None,
            Some(value) if value < 0.0 => None,
            Some(value) => Some(
                cell_id(value).ok_or_else(|| invalid(format!("invalid neighbour n{n} = {value}")))?,
            ),
        };
    }

    let require = |value: Option<f64>, name: &str| {
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(format!("missing numeric attribute '{name}'")))
    };
    let static_attrs = StaticAttrs {
        adm1: props.adm1.unwrap_or_default(),
        pop: require(props.pop, "pop")?,
        precip: require(props.precip, "precip")?,
        lake_dist: require(props.lake_dist, "lake_dist")?,
        water_dist: require(props.water_dist, "water_dist")?,
    };
    let distances = DistanceAttrs {
        grid_dist: props.grid_dist.unwrap_or(UNREACHED),
        road_dist: props.road_dist.unwrap_or(UNREACHED),
    };

    let polygon = match feature.geometry {
        Some(Geometry::Polygon { coordinates }) => outer_ring(coordinates.into_iter().next()),
        Some(Geometry::MultiPolygon { coordinates }) => {
            outer_ring(coordinates.into_iter().next().and_then(|rings| rings.into_iter().next()))
        }
        None => Polygon::default(),
    };

    Ok(HexCell::new(id, polygon, neighbors, static_attrs).with_distances(distances))
}

fn outer_ring(ring: Option<Vec<Vec<f64>>>) -> Polygon {
    let points = ring
        .unwrap_or_default()
        .into_iter()
        .filter(|coord| coord.len() >= 2)
        .map(|coord| LonLat::new(coord[0], coord[1]))
        .collect();
    Polygon::new(points)
}

/// Whole, non-negative ids that fit a [`CellId`].
fn cell_id(raw: f64) -> Option<CellId> {
    if raw.is_finite() && raw >= 0.0 && raw.fract() == 0.0 && raw <= CellId::MAX as f64 {
        Some(raw as CellId)
    } else {
        None
    }
}
