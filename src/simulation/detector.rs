//! Curvature-based junction detection
//!
//! Samples roughly `DETECTOR_SAMPLES` points along a route and flags those
//! where the route turns sharply. The first sample is always flagged, and so
//! is the sample whose step lands on or past the route's final point.

use log::debug;

use super::geometry::turn_angle_degrees;
use super::types::{Coordinate, Intersection, CORNER_ANGLE_DEGREES, DETECTOR_SAMPLES};

/// Distance in route indices between consecutive samples
pub fn sample_step(route_len: usize) -> usize {
    (route_len / DETECTOR_SAMPLES).max(1)
}

/// Detect probable intersections along `route`, preserving route order
///
/// Routes with fewer than two points produce no intersections. Points are
/// not deduplicated.
pub fn detect_intersections(route: &[Coordinate]) -> Vec<Intersection> {
    let len = route.len();
    let step = sample_step(len);
    let mut intersections = Vec::new();

    let mut i = 0;
    while i + step < len {
        let prev = if i >= step { &route[i - step] } else { &route[0] };
        let curr = &route[i];
        let next = &route[i + step];

        let angle = turn_angle_degrees(prev, curr, next);
        let is_start = i == 0;
        let is_end = i + step >= len - 1;

        if angle > CORNER_ANGLE_DEGREES || is_start || is_end {
            debug!(
                "Flagged route point {} at {} (angle {:.1}, start={}, end={})",
                i, curr, angle, is_start, is_end
            );
            intersections.push(Intersection::new(i, *curr));
        }

        i += step;
    }

    intersections
}
