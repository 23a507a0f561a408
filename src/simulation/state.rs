//! Process-wide route and vehicle state
//!
//! One `SharedState` is created at startup and cloned into the planner, the
//! simulator and the HTTP handlers. All fields sit behind a single lock so a
//! reader never sees a location from one tick paired with a nearest signal
//! from another.

use std::sync::Arc;

use parking_lot::RwLock;

use super::types::{Coordinate, Intersection, NearestReport, Route, VehicleState};

/// Identifies one installed route. Writers holding an older generation are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteGeneration(pub u64);

#[derive(Debug, Default)]
struct StoreContents {
    generation: u64,
    route: Option<Route>,
    intersections: Vec<Intersection>,
    vehicle: VehicleState,
}

/// A consistent copy of the store taken under one read lock
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub route: Option<Route>,
    pub intersections: Vec<Intersection>,
    pub vehicle: VehicleState,
}

#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<StoreContents>>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active route and reset the vehicle. Returns the generation
    /// the new route's simulator must write under.
    pub fn install_route(&self, route: Route, intersections: Vec<Intersection>) -> RouteGeneration {
        let mut store = self.inner.write();
        store.generation += 1;
        store.route = Some(route);
        store.intersections = intersections;
        store.vehicle = VehicleState::default();
        RouteGeneration(store.generation)
    }

    pub fn current_generation(&self) -> RouteGeneration {
        RouteGeneration(self.inner.read().generation)
    }

    /// Place the vehicle without touching the nearest-signal fields.
    /// Returns false if `generation` has been superseded.
    pub fn set_location(&self, generation: RouteGeneration, location: Coordinate) -> bool {
        let mut store = self.inner.write();
        if store.generation != generation.0 {
            return false;
        }
        store.vehicle.location = Some(location);
        true
    }

    /// Record one tick: location and nearest-signal info in a single write.
    /// Returns false if `generation` has been superseded.
    pub fn record_tick(
        &self,
        generation: RouteGeneration,
        location: Coordinate,
        report: NearestReport,
    ) -> bool {
        let mut store = self.inner.write();
        if store.generation != generation.0 {
            return false;
        }
        store.vehicle = VehicleState {
            location: Some(location),
            nearest_intersection: report.nearest_signal,
            distance_to_nearest: report.distance_to_nearest,
        };
        true
    }

    pub fn vehicle(&self) -> VehicleState {
        self.inner.read().vehicle
    }

    pub fn intersections(&self) -> Vec<Intersection> {
        self.inner.read().intersections.clone()
    }

    pub fn route(&self) -> Option<Route> {
        self.inner.read().route.clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let store = self.inner.read();
        StatusSnapshot {
            route: store.route.clone(),
            intersections: store.intersections.clone(),
            vehicle: store.vehicle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route() -> Route {
        vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.01)].into()
    }

    #[test]
    fn empty_before_any_route() {
        let state = SharedState::new();
        let snapshot = state.snapshot();
        assert!(snapshot.route.is_none());
        assert!(snapshot.intersections.is_empty());
        assert_eq!(snapshot.vehicle, VehicleState::default());
    }

    #[test]
    fn install_resets_vehicle_and_bumps_generation() {
        let state = SharedState::new();
        let first = state.install_route(route(), Vec::new());
        assert!(state.set_location(first, Coordinate::new(0.0, 0.005)));

        let second = state.install_route(route(), Vec::new());
        assert!(second > first);
        assert_eq!(state.vehicle(), VehicleState::default());
    }

    #[test]
    fn stale_generation_cannot_write() {
        let state = SharedState::new();
        let stale = state.install_route(route(), Vec::new());
        let current = state.install_route(route(), Vec::new());

        let report = NearestReport {
            nearest_signal: Some(Coordinate::new(1.0, 1.0)),
            distance_to_nearest: Some(42.0),
        };
        assert!(!state.record_tick(stale, Coordinate::new(9.0, 9.0), report));
        assert!(!state.set_location(stale, Coordinate::new(9.0, 9.0)));
        assert_eq!(state.vehicle().location, None);

        assert!(state.record_tick(current, Coordinate::new(0.0, 0.001), report));
        let vehicle = state.vehicle();
        assert_eq!(vehicle.location, Some(Coordinate::new(0.0, 0.001)));
        assert_eq!(vehicle.distance_to_nearest, Some(42.0));
    }

    #[test]
    fn empty_report_clears_nearest_fields() {
        let state = SharedState::new();
        let generation = state.install_route(route(), Vec::new());
        let report = NearestReport {
            nearest_signal: Some(Coordinate::new(1.0, 1.0)),
            distance_to_nearest: Some(42.0),
        };
        state.record_tick(generation, Coordinate::new(0.0, 0.001), report);
        state.record_tick(generation, Coordinate::new(0.0, 0.002), NearestReport::empty());

        let vehicle = state.vehicle();
        assert_eq!(vehicle.location, Some(Coordinate::new(0.0, 0.002)));
        assert_eq!(vehicle.nearest_intersection, None);
        assert_eq!(vehicle.distance_to_nearest, None);
    }
}
