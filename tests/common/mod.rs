//! In-process collaborators for driving the planner and simulator in tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;

use ambulance_sim::error::{NotificationError, RouteError};
use ambulance_sim::services::{Geocoder, Notifier, RouteProvider};
use ambulance_sim::simulation::{
    encode_polyline, Coordinate, Intersection, NearestReport, RoutePlanner, SharedState,
    SimulationConfig, VehicleState,
};

pub fn fast_config() -> SimulationConfig {
    SimulationConfig {
        tick_interval: Duration::ZERO,
        ..SimulationConfig::default()
    }
}

/// A route heading east, then turning north, with points ~1.1 km apart
pub fn l_shaped_route(origin: Coordinate, points_per_leg: usize) -> Vec<Coordinate> {
    let mut route: Vec<Coordinate> = (0..points_per_leg)
        .map(|i| Coordinate::new(origin.latitude, origin.longitude + i as f64 * 0.01))
        .collect();
    let corner_lon = origin.longitude + (points_per_leg - 1) as f64 * 0.01;
    route.extend(
        (1..=points_per_leg)
            .map(|i| Coordinate::new(origin.latitude + i as f64 * 0.01, corner_lon)),
    );
    route
}

pub struct FakeGeocoder {
    places: HashMap<String, Coordinate>,
    pub calls: AtomicUsize,
}

impl FakeGeocoder {
    pub fn new(places: &[(&str, Coordinate)]) -> Self {
        Self {
            places: places
                .iter()
                .map(|(name, coordinate)| (name.to_string(), *coordinate))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Geocoder for FakeGeocoder {
    fn geocode(&self, query: &str) -> anyhow::Result<Option<Coordinate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query == "Timeoutville" {
            return Err(anyhow!("operation timed out"));
        }
        Ok(self.places.get(query).copied())
    }
}

pub enum RouterBehaviour {
    /// Serve routes keyed by their start coordinate's latitude
    Routes(Vec<Vec<Coordinate>>),
    Geometry(String),
    Rejected,
    Unreachable,
}

pub struct FakeRouter {
    behaviour: RouterBehaviour,
    pub calls: AtomicUsize,
}

impl FakeRouter {
    pub fn new(behaviour: RouterBehaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }
}

impl RouteProvider for FakeRouter {
    fn fetch_route(&self, from: &Coordinate, _to: &Coordinate) -> Result<String, RouteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            RouterBehaviour::Routes(routes) => {
                let route = routes
                    .iter()
                    .find(|r| (r[0].latitude - from.latitude).abs() < 1e-6)
                    .ok_or_else(|| RouteError::Rejected {
                        code: "NoRoute".to_string(),
                        message: None,
                    })?;
                encode_polyline(route).map_err(RouteError::Malformed)
            }
            RouterBehaviour::Geometry(geometry) => Ok(geometry.clone()),
            RouterBehaviour::Rejected => Err(RouteError::Rejected {
                code: "NoRoute".to_string(),
                message: Some("Impossible route between points".to_string()),
            }),
            RouterBehaviour::Unreachable => {
                Err(RouteError::Unreachable(anyhow!("connection refused")))
            }
        }
    }
}

/// One call to `report_position` and what the status query saw at that moment
#[derive(Debug, Clone)]
pub struct ReportCall {
    pub tick: usize,
    pub position: Coordinate,
    pub state_at_call: Option<VehicleState>,
}

pub struct RecordingNotifier {
    pub published: Mutex<Vec<Intersection>>,
    pub reports: Mutex<Vec<ReportCall>>,
    fail_publish: bool,
    fail_ticks: Vec<usize>,
    nearest: Coordinate,
    observed: Mutex<Option<SharedState>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            reports: Mutex::new(Vec::new()),
            fail_publish: false,
            fail_ticks: Vec::new(),
            nearest: Coordinate::new(45.0, 45.0),
            observed: Mutex::new(None),
        }
    }

    pub fn failing_publish(mut self) -> Self {
        self.fail_publish = true;
        self
    }

    /// Fail the position report on these 1-based ticks
    pub fn failing_ticks(mut self, ticks: &[usize]) -> Self {
        self.fail_ticks = ticks.to_vec();
        self
    }

    pub fn nearest(&self) -> Coordinate {
        self.nearest
    }

    /// Record the shared state as seen at each report
    pub fn observe(&self, state: SharedState) {
        *self.observed.lock() = Some(state);
    }

    pub fn report_count(&self) -> usize {
        self.reports.lock().len()
    }
}

impl Notifier for RecordingNotifier {
    fn publish_intersection(&self, intersection: &Intersection) -> Result<(), NotificationError> {
        if self.fail_publish {
            return Err(NotificationError::new("gps-data", anyhow!("connection refused")));
        }
        self.published.lock().push(*intersection);
        Ok(())
    }

    fn report_position(
        &self,
        position: &Coordinate,
        route: &[Coordinate],
    ) -> Result<NearestReport, NotificationError> {
        assert!(route.len() >= 2);
        let state_at_call = self.observed.lock().as_ref().map(|s| s.vehicle());
        let tick = {
            let mut reports = self.reports.lock();
            let tick = reports.len() + 1;
            reports.push(ReportCall {
                tick,
                position: *position,
                state_at_call,
            });
            tick
        };

        if self.fail_ticks.contains(&tick) {
            return Err(NotificationError::new(
                "update-ambulance",
                anyhow!("connection refused"),
            ));
        }
        Ok(NearestReport {
            nearest_signal: Some(self.nearest),
            distance_to_nearest: Some(100.0 + tick as f64),
        })
    }
}

pub struct Fixture {
    pub planner: Arc<RoutePlanner>,
    pub geocoder: Arc<FakeGeocoder>,
    pub router: Arc<FakeRouter>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: SharedState,
}

pub fn fixture(
    places: &[(&str, Coordinate)],
    router: RouterBehaviour,
    notifier: RecordingNotifier,
    config: SimulationConfig,
) -> Fixture {
    let state = SharedState::new();
    let geocoder = Arc::new(FakeGeocoder::new(places));
    let router = Arc::new(FakeRouter::new(router));
    let notifier = Arc::new(notifier);
    let planner = Arc::new(RoutePlanner::new(
        geocoder.clone(),
        router.clone(),
        notifier.clone(),
        state.clone(),
        config,
    ));
    Fixture {
        planner,
        geocoder,
        router,
        notifier,
        state,
    }
}
