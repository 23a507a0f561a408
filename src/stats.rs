use std::time::Duration;

use log::info;

use crate::simulation::{PlannedRoute, SimulationSummary};

/// Statistics for one headless plan-and-simulate run
#[derive(Debug, Clone)]
pub struct RunStats {
    pub elapsed: Duration,
    pub route_points: usize,
    pub intersections: usize,
    pub summary: SimulationSummary,
}

impl RunStats {
    pub fn new(planned: &PlannedRoute, summary: SimulationSummary, elapsed: Duration) -> Self {
        Self {
            elapsed,
            route_points: planned.route.len(),
            intersections: planned.intersections.len(),
            summary,
        }
    }

    /// Share of ticks whose position report was answered
    pub fn report_success_rate(&self) -> f64 {
        if self.summary.ticks == 0 {
            return 0.0;
        }
        let answered = self.summary.ticks - self.summary.failed_reports;
        answered as f64 / self.summary.ticks as f64 * 100.0
    }

    pub fn log(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Elapsed time: {:.2}s", self.elapsed.as_secs_f64());
        info!("Route points: {}", self.route_points);
        info!("Intersections: {}", self.intersections);
        info!("Segments completed: {}", self.summary.segments_completed);
        info!("Total ticks: {}", self.summary.ticks);
        info!("Failed reports: {}", self.summary.failed_reports);
        info!("Report success rate: {:.1}%", self.report_success_rate());
        if self.summary.cancelled {
            info!("Run was cancelled before reaching the destination");
        }
    }
}
