//! Runtime configuration
//!
//! Collaborator addresses, timeouts and simulation pacing. `main` fills this
//! from command-line flags and environment variables.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::info;

use crate::services::{DetachedNotifier, HttpNotifier, Nominatim, Notifier, Osrm};
use crate::simulation::{RoutePlanner, SharedState, SimulationConfig};

pub const DEFAULT_BIND: &str = "0.0.0.0:5000";
pub const DEFAULT_OSRM_URL: &str = "http://router.project-osrm.org";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
/// Nominatim's usage policy requires an identifying User-Agent
pub const DEFAULT_USER_AGENT: &str = "EmergencyVehicleNavigation/1.0";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub osrm_url: String,
    pub nominatim_url: String,
    /// Downstream signal server. `None` runs without notifications.
    pub notify_url: Option<String>,
    pub user_agent: String,
    /// Timeout for every outbound HTTP call
    pub http_timeout: Duration,
    pub simulation: SimulationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            notify_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            simulation: SimulationConfig::default(),
        }
    }
}

impl Config {
    /// Wire the HTTP collaborators into a planner over `state`
    pub fn build_planner(&self, state: SharedState) -> Result<RoutePlanner> {
        let geocoder = Nominatim::new(
            self.nominatim_url.clone(),
            &self.user_agent,
            self.http_timeout,
        )?;
        let router = Osrm::new(self.osrm_url.clone(), self.http_timeout)?;
        let notifier: Arc<dyn Notifier> = match &self.notify_url {
            Some(url) => {
                info!("Publishing signals and positions to {}", url);
                Arc::new(HttpNotifier::new(url.clone(), self.http_timeout)?)
            }
            None => {
                info!("No downstream signal server configured");
                Arc::new(DetachedNotifier)
            }
        };

        Ok(RoutePlanner::new(
            Arc::new(geocoder),
            Arc::new(router),
            notifier,
            state,
            self.simulation.clone(),
        ))
    }
}
