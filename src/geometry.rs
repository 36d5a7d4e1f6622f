//! Geographic primitives: lon/lat points, polylines and cell polygons.

use serde::{Deserialize, Serialize};

/// Mean earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

const KM_PER_DEG_LAT: f64 = 110.574;
const KM_PER_DEG_LON_EQUATOR: f64 = 111.320;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }
}

impl From<[f64; 2]> for LonLat {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(value: LonLat) -> Self {
        [value.lon, value.lat]
    }
}

/// Great-circle distance between two points.
pub fn haversine_km(a: LonLat, b: LonLat) -> f64 {
    let phi_a = a.lat.to_radians();
    let phi_b = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();
    let h = (d_phi / 2.0).sin().powi(2) + phi_a.cos() * phi_b.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Total arc length of a polyline.
pub fn line_length_km(points: &[LonLat]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}

/// Point at `distance_km` along the polyline. Distances past the end yield the
/// final vertex; an empty line yields `None`.
pub fn along(points: &[LonLat], distance_km: f64) -> Option<LonLat> {
    let first = *points.first()?;
    if distance_km <= 0.0 {
        return Some(first);
    }
    let mut travelled = 0.0;
    for pair in points.windows(2) {
        let segment = haversine_km(pair[0], pair[1]);
        if segment > 0.0 && travelled + segment >= distance_km {
            let t = (distance_km - travelled) / segment;
            return Some(LonLat::new(
                pair[0].lon + (pair[1].lon - pair[0].lon) * t,
                pair[0].lat + (pair[1].lat - pair[0].lat) * t,
            ));
        }
        travelled += segment;
    }
    points.last().copied()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn contains(&self, p: LonLat) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// A single closed ring; the closing vertex may be repeated or omitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    ring: Vec<LonLat>,
}

impl Polygon {
    pub fn new(ring: Vec<LonLat>) -> Self {
        Self { ring }
    }

    pub fn ring(&self) -> &[LonLat] {
        &self.ring
    }

    pub fn is_empty(&self) -> bool {
        self.ring.len() < 3
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        let first = self.ring.first()?;
        let mut bbox = BoundingBox {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        for p in &self.ring[1..] {
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lon = bbox.max_lon.max(p.lon);
            bbox.max_lat = bbox.max_lat.max(p.lat);
        }
        Some(bbox)
    }

    /// Ray-casting containment test.
    pub fn contains(&self, p: LonLat) -> bool {
        let n = self.ring.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.ring[i].lon, self.ring[i].lat);
            let (xj, yj) = (self.ring[j].lon, self.ring[j].lat);
            if ((yi > p.lat) != (yj > p.lat)) && (p.lon < (xj - xi) * (p.lat - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Closed ring in GeoJSON coordinate order.
    pub fn to_coordinates(&self) -> Vec<[f64; 2]> {
        let mut coords: Vec<[f64; 2]> = self.ring.iter().map(|p| (*p).into()).collect();
        if let (Some(first), Some(last)) = (coords.first().copied(), coords.last().copied()) {
            if first != last {
                coords.push(first);
            }
        }
        coords
    }
}

/// Equirectangular projection around an origin, good enough at the scale of a
/// single study region.
#[derive(Debug, Clone, Copy)]
pub struct LocalProjection {
    origin: LonLat,
    km_per_deg_lon: f64,
}

impl LocalProjection {
    pub fn new(origin: LonLat) -> Self {
        let km_per_deg_lon = (KM_PER_DEG_LON_EQUATOR * origin.lat.to_radians().cos()).max(1e-6);
        Self {
            origin,
            km_per_deg_lon,
        }
    }

    pub fn to_lonlat(&self, x_km: f64, y_km: f64) -> LonLat {
        LonLat::new(
            self.origin.lon + x_km / self.km_per_deg_lon,
            self.origin.lat + y_km / KM_PER_DEG_LAT,
        )
    }

    /// Pointy-top hexagon with the given circumradius centred at `(x_km, y_km)`.
    pub fn hexagon(&self, x_km: f64, y_km: f64, radius_km: f64) -> Polygon {
        let ring = (0..6)
            .map(|i| {
                let angle = (30.0 + 60.0 * i as f64).to_radians();
                self.to_lonlat(x_km + radius_km * angle.cos(), y_km + radius_km * angle.sin())
            })
            .collect();
        Polygon::new(ring)
    }
}

/// Pointy-top hexagon around a geographic centre.
pub fn hexagon(center: LonLat, radius_km: f64) -> Polygon {
    LocalProjection::new(center).hexagon(0.0, 0.0, radius_km)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_km(LonLat::new(30.0, 0.0), LonLat::new(30.0, 1.0));
        assert!((d - 111.19).abs() < 0.1, "got {d}");
    }

    #[test]
    fn along_clamps_to_line_ends() {
        let line = [LonLat::new(30.0, 0.0), LonLat::new(30.0, 1.0)];
        assert_eq!(along(&line, -3.0), Some(line[0]));
        assert_eq!(along(&line, 500.0), Some(line[1]));
        let mid = along(&line, line_length_km(&line) / 2.0).unwrap();
        assert!((mid.lat - 0.5).abs() < 1e-9);
        assert!(along(&[], 1.0).is_none());
    }

    #[test]
    fn hexagon_contains_its_centre_but_not_far_points() {
        let centre = LonLat::new(32.5, -1.0);
        let hex = hexagon(centre, 3.0);
        assert!(hex.contains(centre));
        assert!(!hex.contains(LonLat::new(32.6, -1.0)));
        let bbox = hex.bbox().unwrap();
        assert!(bbox.contains(centre));
        assert_eq!(hex.to_coordinates().len(), 7);
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let poly = Polygon::new(vec![LonLat::new(0.0, 0.0), LonLat::new(1.0, 1.0)]);
        assert!(poly.is_empty());
        assert!(!poly.contains(LonLat::new(0.5, 0.5)));
    }
}
