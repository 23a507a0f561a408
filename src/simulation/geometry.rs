//! Geometry helpers on raw lat/lon pairs
//!
//! Angles are computed on the planar lat/lon vectors, distances on the
//! sphere.

use anyhow::{anyhow, Result};
use geo_types::Coord;

use super::types::Coordinate;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Precision used by OSRM's encoded polylines
pub const POLYLINE_PRECISION: u32 = 5;

/// Guards the angle computation against zero-length vectors
const NORM_EPSILON: f64 = 1e-6;

/// Great-circle distance between two coordinates in kilometres
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Angle in degrees between the planar vectors `prev -> curr` and `curr -> next`
///
/// A degenerate (zero-length) vector yields 90 degrees rather than NaN.
pub fn turn_angle_degrees(prev: &Coordinate, curr: &Coordinate, next: &Coordinate) -> f64 {
    let v1 = (curr.latitude - prev.latitude, curr.longitude - prev.longitude);
    let v2 = (next.latitude - curr.latitude, next.longitude - curr.longitude);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let norms = v1.0.hypot(v1.1) * v2.0.hypot(v2.1);
    let cos_angle = (dot / (norms + NORM_EPSILON)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Decode an encoded polyline into route order
pub fn decode_polyline(encoded: &str) -> Result<Vec<Coordinate>> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| anyhow!("invalid polyline: {}", e))?;
    // geo-types stores x = longitude, y = latitude
    Ok(line
        .0
        .into_iter()
        .map(|c| Coordinate::new(c.y, c.x))
        .collect())
}

pub fn encode_polyline(points: &[Coordinate]) -> Result<String> {
    let coords = points.iter().map(|c| Coord {
        x: c.longitude,
        y: c.latitude,
    });
    polyline::encode_coordinates(coords, POLYLINE_PRECISION)
        .map_err(|e| anyhow!("cannot encode polyline: {}", e))
}
