//! Maps a drawn polyline onto the hex cells it passes through.

use crate::geometry::{along, line_length_km, LonLat};
use crate::grid::{CellId, HexGrid};

/// Default arc-length step between samples.
pub const DEFAULT_INTERVAL_KM: f64 = 5.0;

/// Smallest usable step; finer intervals are raised to this.
pub const MIN_INTERVAL_KM: f64 = 0.01;

/// Extra sampling past the rounded-down line length, in intervals.
pub const OVERSHOOT_INTERVALS: f64 = 6.0;

/// Arc-length offsets to sample: `0, interval, 2*interval, ...` up to at
/// least `floor(length) + 6 * interval`.
pub fn sample_offsets(length_km: f64, interval_km: f64) -> Vec<f64> {
    if !(interval_km > 0.0) || !interval_km.is_finite() {
        return vec![0.0];
    }
    let interval_km = interval_km.max(MIN_INTERVAL_KM);
    let length = if length_km.is_finite() { length_km.max(0.0) } else { 0.0 };
    let limit = length.floor() + OVERSHOOT_INTERVALS * interval_km;
    let steps = (limit / interval_km).ceil() as usize;
    (0..=steps).map(|k| k as f64 * interval_km).collect()
}

/// Distinct ids of the cells under the line, in first-touched order. Samples
/// outside every cell are dropped.
pub fn sample_line(grid: &HexGrid, points: &[LonLat], interval_km: f64) -> Vec<CellId> {
    let points: Vec<LonLat> = points.iter().copied().filter(LonLat::is_finite).collect();
    if points.is_empty() {
        return Vec::new();
    }
    let length = line_length_km(&points);
    let offsets = sample_offsets(length, interval_km);

    let mut seen = vec![false; grid.len()];
    let mut ids = Vec::new();
    let mut dropped = 0usize;
    for offset in &offsets {
        let Some(point) = along(&points, *offset) else {
            continue;
        };
        match grid.locate(point) {
            Some(id) => {
                if !seen[id as usize] {
                    seen[id as usize] = true;
                    ids.push(id);
                }
            }
            None => dropped += 1,
        }
    }
    tracing::debug!(
        target: "hexsite::sampler",
        length_km = length,
        samples = offsets.len(),
        dropped,
        cells = ids.len(),
        "line.sampled"
    );
    ids
}
