use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::attrs::{AttrValue, Attribute};
use crate::filter::Filter;
use crate::grid::{HexCell, HexGrid};

/// Read-only copy of the grid as it stood after a completed pass.
#[derive(Debug, Clone)]
pub struct GridSnapshot {
    pass: u64,
    grid: HexGrid,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub id: u32,
    pub geometry: Option<Geometry>,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    kind: &'static str,
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

impl GridSnapshot {
    pub(crate) fn new(pass: u64, grid: HexGrid) -> Self {
        Self { pass, grid }
    }

    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn grid(&self) -> &HexGrid {
        &self.grid
    }

    pub fn visible<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a HexCell> + 'a {
        self.grid.cells().filter(move |cell| filter.matches(cell))
    }

    pub fn feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            kind: "FeatureCollection",
            features: self.grid.cells().map(feature).collect(),
        }
    }

    pub fn to_geojson(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(&self.feature_collection())?)
    }
}

fn feature(cell: &HexCell) -> Feature {
    let mut properties = Map::new();
    properties.insert("index".to_string(), Value::from(cell.id()));
    for attribute in Attribute::ALL {
        let value = match cell.attr(attribute) {
            // non-finite distances (unreached) become null
            AttrValue::Number(n) => Number::from_f64(n).map_or(Value::Null, Value::Number),
            AttrValue::Category(text) => Value::String(text.to_string()),
        };
        properties.insert(attribute.name().to_string(), value);
    }
    let polygon = cell.polygon();
    let geometry = (!polygon.is_empty()).then(|| Geometry {
        kind: "Polygon",
        coordinates: vec![polygon.to_coordinates()],
    });
    Feature {
        kind: "Feature",
        id: cell.id(),
        geometry,
        properties,
    }
}

/// Writes snapshots as `pass_NNNNNN.geojson` files.
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn write(&self, snapshot: &GridSnapshot) -> Result<PathBuf, SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("pass_{:06}.geojson", snapshot.pass()));
        fs::write(&path, snapshot.to_geojson()?)?;
        tracing::info!(
            target: "hexsite::snapshot",
            path = %path.display(),
            cells = snapshot.grid().len(),
            "snapshot.written"
        );
        Ok(path)
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
