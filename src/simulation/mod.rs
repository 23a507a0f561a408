//! Route analysis and vehicle movement simulation
//!
//! This module contains all the core logic: junction detection on a decoded
//! route, the shared vehicle state and the background movement loop. None of
//! it depends on the HTTP surface.

mod detector;
mod geometry;
mod planner;
mod state;
mod types;
mod vehicle;

pub use detector::{detect_intersections, sample_step};
pub use geometry::{decode_polyline, encode_polyline, haversine_km, turn_angle_degrees};
pub use planner::{PlannedRoute, RoutePlanner};
pub use state::{RouteGeneration, SharedState, StatusSnapshot};
pub use types::{
    Coordinate, Intersection, NearestReport, Route, VehicleState, ARRIVAL_THRESHOLD_KM,
    CORNER_ANGLE_DEGREES, DETECTOR_SAMPLES, STEP_FRACTION,
};
pub use vehicle::{
    SegmentWalk, SimulationConfig, SimulationHandle, SimulationSummary, VehicleSimulator,
};
