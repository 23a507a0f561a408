//! Core types for the route simulation
//!
//! These types carry no I/O and are shared by the detector, the simulator
//! and the HTTP surface.

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A WGS-84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a coordinate, rejecting values outside the WGS-84 ranges
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            bail!("coordinate ({}, {}) is not finite", latitude, longitude);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            bail!("latitude {} is outside [-90, 90]", latitude);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            bail!("longitude {} is outside [-180, 180]", longitude);
        }
        Ok(Self::new(latitude, longitude))
    }

    /// `[lat, lon]` pair, the shape route points take on the wire
    pub fn as_pair(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }

    /// Move `fraction` of the remaining lat/lon delta toward `target`
    pub fn step_toward(&self, target: &Coordinate, fraction: f64) -> Coordinate {
        Coordinate {
            latitude: self.latitude + (target.latitude - self.latitude) * fraction,
            longitude: self.longitude + (target.longitude - self.longitude) * fraction,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// An immutable, shareable route. Always holds at least two points once
/// produced by the planner.
pub type Route = Arc<[Coordinate]>;

/// A route point flagged by the detector as a probable signalised junction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Index of the point in the route it was detected on
    pub route_index: usize,
    pub position: Coordinate,
}

impl Intersection {
    pub fn new(route_index: usize, position: Coordinate) -> Self {
        Self {
            route_index,
            position,
        }
    }
}

/// What the downstream consumer answered for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestReport {
    pub nearest_signal: Option<Coordinate>,
    pub distance_to_nearest: Option<f64>,
}

impl NearestReport {
    pub fn empty() -> Self {
        Self {
            nearest_signal: None,
            distance_to_nearest: None,
        }
    }
}

/// The vehicle's last known position and proximity to the next signal
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleState {
    pub location: Option<Coordinate>,
    pub nearest_intersection: Option<Coordinate>,
    pub distance_to_nearest: Option<f64>,
}

/// Fraction of the remaining distance covered on each tick
pub const STEP_FRACTION: f64 = 0.05;

/// Distance (km) at which the vehicle counts as having reached a route point
pub const ARRIVAL_THRESHOLD_KM: f64 = 0.01;

/// Turn angle (degrees) above which a route point is flagged as a junction
pub const CORNER_ANGLE_DEGREES: f64 = 30.0;

/// Roughly how many points the detector samples along a route
pub const DETECTOR_SAMPLES: usize = 10;
