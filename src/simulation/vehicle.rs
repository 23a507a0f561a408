//! Vehicle movement along a planned route
//!
//! The simulator walks each route segment by repeatedly closing a fixed
//! fraction of the remaining gap, reporting every intermediate position to
//! the downstream consumer. It runs on its own thread because every tick
//! blocks on a network call and a sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use super::geometry::haversine_km;
use super::state::{RouteGeneration, SharedState};
use super::types::{Coordinate, NearestReport, Route, ARRIVAL_THRESHOLD_KM, STEP_FRACTION};
use crate::services::Notifier;

/// Tuning for the movement loop
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Fraction of the remaining lat/lon delta covered per tick, in (0, 1]
    pub step_fraction: f64,
    /// Distance (km) at which a route point counts as reached
    pub arrival_threshold_km: f64,
    /// Sleep between ticks
    pub tick_interval: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step_fraction: STEP_FRACTION,
            arrival_threshold_km: ARRIVAL_THRESHOLD_KM,
            tick_interval: Duration::from_millis(100),
        }
    }
}

/// Successive positions from `start` toward `target`, ending once the
/// position is within the arrival threshold
#[derive(Debug, Clone)]
pub struct SegmentWalk {
    position: Coordinate,
    target: Coordinate,
    step_fraction: f64,
    arrival_threshold_km: f64,
}

impl SegmentWalk {
    pub fn new(start: Coordinate, target: Coordinate, config: &SimulationConfig) -> Self {
        Self {
            position: start,
            target,
            step_fraction: config.step_fraction,
            arrival_threshold_km: config.arrival_threshold_km,
        }
    }

    pub fn remaining_km(&self) -> f64 {
        haversine_km(&self.position, &self.target)
    }
}

impl Iterator for SegmentWalk {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Coordinate> {
        if self.remaining_km() <= self.arrival_threshold_km {
            return None;
        }
        self.position = self.position.step_toward(&self.target, self.step_fraction);
        Some(self.position)
    }
}

/// Outcome of one simulation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    pub ticks: u64,
    pub failed_reports: u64,
    pub segments_completed: usize,
    /// The run stopped early because a newer route replaced it
    pub cancelled: bool,
}

pub struct VehicleSimulator {
    route: Route,
    generation: RouteGeneration,
    state: SharedState,
    notifier: Arc<dyn Notifier>,
    config: SimulationConfig,
    cancelled: Arc<AtomicBool>,
}

impl VehicleSimulator {
    pub fn new(
        route: Route,
        generation: RouteGeneration,
        state: SharedState,
        notifier: Arc<dyn Notifier>,
        config: SimulationConfig,
    ) -> Self {
        Self {
            route,
            generation,
            state,
            notifier,
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared with the `SimulationHandle` that stops the run
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Walk the whole route, blocking until the last point is reached or the
    /// run is cancelled
    pub fn run(&self) -> SimulationSummary {
        let mut summary = SimulationSummary::default();

        let Some(first) = self.route.first() else {
            return summary;
        };
        if !self.state.set_location(self.generation, *first) {
            summary.cancelled = true;
            return summary;
        }
        info!(
            "Simulation {} started at {} ({} route points)",
            self.generation.0,
            first,
            self.route.len()
        );

        for (index, segment) in self.route.windows(2).enumerate() {
            for position in SegmentWalk::new(segment[0], segment[1], &self.config) {
                if self.is_cancelled() || !self.tick(position, &mut summary) {
                    info!(
                        "Simulation {} superseded after {} ticks",
                        self.generation.0, summary.ticks
                    );
                    summary.cancelled = true;
                    return summary;
                }
                if !self.config.tick_interval.is_zero() {
                    thread::sleep(self.config.tick_interval);
                }
            }
            summary.segments_completed += 1;
            debug!("Reached route point {} of {}", index + 1, self.route.len() - 1);
        }

        info!(
            "Simulation {} finished: {} ticks, {} failed reports",
            self.generation.0, summary.ticks, summary.failed_reports
        );
        summary
    }

    /// One movement step. Returns false once this run's route has been
    /// replaced in the shared state.
    fn tick(&self, position: Coordinate, summary: &mut SimulationSummary) -> bool {
        summary.ticks += 1;

        if !self.state.set_location(self.generation, position) {
            return false;
        }

        let report = match self.notifier.report_position(&position, &self.route) {
            Ok(report) => report,
            Err(e) => {
                warn!("Failed to update vehicle position: {}", e);
                summary.failed_reports += 1;
                NearestReport::empty()
            }
        };

        self.state.record_tick(self.generation, position, report)
    }
}

/// A running simulation thread
pub struct SimulationHandle {
    generation: RouteGeneration,
    cancelled: Arc<AtomicBool>,
    thread: JoinHandle<SimulationSummary>,
}

impl SimulationHandle {
    pub fn spawn(simulator: VehicleSimulator) -> Result<Self> {
        let generation = simulator.generation;
        let cancelled = simulator.cancel_flag();
        let thread = thread::Builder::new()
            .name(format!("vehicle-sim-{}", generation.0))
            .spawn(move || simulator.run())
            .context("Failed to spawn simulation thread")?;

        Ok(Self {
            generation,
            cancelled,
            thread,
        })
    }

    pub fn generation(&self) -> RouteGeneration {
        self.generation
    }

    /// Ask the run to stop at its next tick boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> Result<SimulationSummary> {
        self.thread
            .join()
            .map_err(|_| anyhow!("simulation thread {} panicked", self.generation.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_strictly_approaches_target() {
        let config = SimulationConfig::default();
        let start = Coordinate::new(12.93, 77.58);
        let target = Coordinate::new(12.94, 77.59);

        let mut previous = haversine_km(&start, &target);
        let mut ticks = 0;
        for position in SegmentWalk::new(start, target, &config) {
            let remaining = haversine_km(&position, &target);
            assert!(remaining < previous);
            previous = remaining;
            ticks += 1;
        }

        // ~1.5 km closes to 10 m after ln(0.01 / 1.5) / ln(0.95) ~ 98 ticks
        assert!(previous <= config.arrival_threshold_km);
        assert!((90..=110).contains(&ticks), "took {} ticks", ticks);
    }

    #[test]
    fn walk_is_empty_when_already_within_threshold() {
        let config = SimulationConfig::default();
        let point = Coordinate::new(1.0, 1.0);
        assert_eq!(SegmentWalk::new(point, point, &config).count(), 0);

        let near = Coordinate::new(1.0, 1.00005);
        assert_eq!(SegmentWalk::new(point, near, &config).count(), 0);
    }
}
