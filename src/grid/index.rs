use std::collections::HashMap;

use super::{CellId, HexCell};
use crate::geometry::LonLat;

/// Uniform lon/lat bucketing of cell bounding boxes. Bucket size tracks the
/// largest cell so each cell lands in a handful of buckets.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    bucket_deg: f64,
    buckets: HashMap<(i64, i64), Vec<CellId>>,
}

impl SpatialIndex {
    pub fn build(cells: &[HexCell]) -> Self {
        let bucket_deg = cells
            .iter()
            .filter_map(|cell| cell.bbox())
            .map(|bbox| bbox.width().max(bbox.height()))
            .fold(0.0_f64, f64::max);
        if !(bucket_deg > 0.0) || !bucket_deg.is_finite() {
            return Self::default();
        }

        let mut index = Self {
            bucket_deg,
            buckets: HashMap::new(),
        };
        for cell in cells {
            if cell.polygon().is_empty() {
                continue;
            }
            let Some(bbox) = cell.bbox() else { continue };
            let (x0, y0) = index.key(LonLat::new(bbox.min_lon, bbox.min_lat));
            let (x1, y1) = index.key(LonLat::new(bbox.max_lon, bbox.max_lat));
            for x in x0..=x1 {
                for y in y0..=y1 {
                    index.buckets.entry((x, y)).or_default().push(cell.id());
                }
            }
        }
        index
    }

    fn key(&self, p: LonLat) -> (i64, i64) {
        (
            (p.lon / self.bucket_deg).floor() as i64,
            (p.lat / self.bucket_deg).floor() as i64,
        )
    }

    /// Lowest-id cell containing `point`. `cells` must be the slice the index
    /// was built from.
    pub fn locate(&self, cells: &[HexCell], point: LonLat) -> Option<CellId> {
        if self.buckets.is_empty() {
            return None;
        }
        self.buckets.get(&self.key(point))?.iter().copied().find(|&id| {
            let cell = &cells[id as usize];
            cell.bbox().is_some_and(|bbox| bbox.contains(point)) && cell.polygon().contains(point)
        })
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
