//! Route planning: addresses in, a running simulation out
//!
//! The planner owns the only handle to the active simulation. Planning a new
//! route cancels the previous run before the new route is installed.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::{error, info, warn};
use parking_lot::Mutex;

use super::detector::detect_intersections;
use super::geometry::decode_polyline;
use super::state::{RouteGeneration, SharedState};
use super::types::{Coordinate, Intersection, Route};
use super::vehicle::{SimulationConfig, SimulationHandle, SimulationSummary, VehicleSimulator};
use crate::error::{GeocodeError, PlanError, RouteError, TripEnd};
use crate::services::{Geocoder, Notifier, RouteProvider};

/// Result of a successful plan request
#[derive(Debug, Clone)]
pub struct PlannedRoute {
    pub start: Coordinate,
    pub end: Coordinate,
    pub route: Route,
    pub intersections: Vec<Intersection>,
    pub generation: RouteGeneration,
}

pub struct RoutePlanner {
    geocoder: Arc<dyn Geocoder>,
    router: Arc<dyn RouteProvider>,
    notifier: Arc<dyn Notifier>,
    state: SharedState,
    config: SimulationConfig,
    active: Mutex<Option<SimulationHandle>>,
}

impl RoutePlanner {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        router: Arc<dyn RouteProvider>,
        notifier: Arc<dyn Notifier>,
        state: SharedState,
        config: SimulationConfig,
    ) -> Self {
        Self {
            geocoder,
            router,
            notifier,
            state,
            config,
            active: Mutex::new(None),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Geocode both addresses, fetch and analyse the route, then start the
    /// simulation in the background. Nothing in the shared state changes
    /// unless the whole request succeeds.
    pub fn plan(&self, start_text: &str, end_text: &str) -> Result<PlannedRoute, PlanError> {
        info!("Route planning requested: {} to {}", start_text, end_text);

        let start = self.resolve(start_text, TripEnd::Start)?;
        let end = self.resolve(end_text, TripEnd::End)?;

        let encoded = self.router.fetch_route(&start, &end)?;
        let points = decode_polyline(&encoded).map_err(RouteError::Malformed)?;
        if points.len() < 2 {
            return Err(RouteError::Malformed(anyhow!(
                "route has {} point(s), need at least 2",
                points.len()
            ))
            .into());
        }
        let route: Route = points.into();

        let intersections = detect_intersections(&route);
        info!(
            "Detected {} intersections along {} route points",
            intersections.len(),
            route.len()
        );
        self.publish_intersections(&intersections);

        let generation = self.start_simulation(route.clone(), intersections.clone());

        Ok(PlannedRoute {
            start,
            end,
            route,
            intersections,
            generation,
        })
    }

    fn resolve(&self, query: &str, end: TripEnd) -> Result<Coordinate, PlanError> {
        let error = match self.geocoder.geocode(query) {
            Ok(Some(coordinate)) => return Ok(coordinate),
            Ok(None) => GeocodeError::NoResult {
                query: query.to_string(),
            },
            Err(source) => GeocodeError::Failed {
                query: query.to_string(),
                source,
            },
        };
        error!("Failed to geocode {} location: {}", end, error);
        Err(PlanError::Geocode { end, error })
    }

    /// Best effort: failures are logged and the plan carries on
    fn publish_intersections(&self, intersections: &[Intersection]) {
        for intersection in intersections {
            if let Err(e) = self.notifier.publish_intersection(intersection) {
                warn!("Failed to send traffic signal data: {}", e);
            }
        }
    }

    fn start_simulation(&self, route: Route, intersections: Vec<Intersection>) -> RouteGeneration {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            previous.cancel();
            info!("Cancelling simulation {} for superseded route", previous.generation().0);
        }

        let generation = self.state.install_route(route.clone(), intersections);
        let simulator = VehicleSimulator::new(
            route,
            generation,
            self.state.clone(),
            Arc::clone(&self.notifier),
            self.config.clone(),
        );
        match SimulationHandle::spawn(simulator) {
            Ok(handle) => *active = Some(handle),
            Err(e) => error!("Route {} installed without a simulation: {:#}", generation.0, e),
        }
        generation
    }

    /// Whether a simulation thread is still walking a route
    pub fn is_simulating(&self) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Block until the active simulation finishes. `None` if nothing was
    /// started.
    pub fn wait_for_simulation(&self) -> Option<Result<SimulationSummary>> {
        let handle = self.active.lock().take()?;
        Some(handle.join())
    }
}
