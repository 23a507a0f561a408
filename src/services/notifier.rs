use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::Notifier;
use crate::error::NotificationError;
use crate::simulation::{Coordinate, Intersection, NearestReport};

const SIGNAL_ENDPOINT: &str = "gps-data";
const POSITION_ENDPOINT: &str = "update-ambulance";

/// Posts signals and vehicle positions to the downstream signal server
pub struct HttpNotifier {
    client: Client,
    address: String,
}

impl HttpNotifier {
    pub fn new(address: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build notification client")?;
        Ok(Self {
            client,
            address: address.trim_end_matches('/').to_string(),
        })
    }

    fn post<T: Serialize>(&self, endpoint: &'static str, payload: &T) -> Result<String, NotificationError> {
        let url = format!("{}/{}", self.address, endpoint);
        self.client
            .post(&url)
            .json(payload)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| NotificationError::new(endpoint, e.into()))
    }
}

#[derive(Debug, Serialize)]
struct PositionUpdate {
    latitude: f64,
    longitude: f64,
    route: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(rename = "nearestSignal", default)]
    nearest_signal: Option<Coordinate>,
    #[serde(rename = "distanceToNearest", default)]
    distance_to_nearest: Option<f64>,
}

/// Nearest-signal answer from the position endpoint
pub fn parse_update_response(body: &str) -> Result<NearestReport> {
    let resp: UpdateResponse =
        serde_json::from_str(body).context("Position update response is not valid JSON")?;
    Ok(NearestReport {
        nearest_signal: resp.nearest_signal,
        distance_to_nearest: resp.distance_to_nearest,
    })
}

impl Notifier for HttpNotifier {
    fn publish_intersection(&self, intersection: &Intersection) -> Result<(), NotificationError> {
        self.post(SIGNAL_ENDPOINT, &intersection.position)?;
        info!("Traffic signal sent: {}", intersection.position);
        Ok(())
    }

    fn report_position(
        &self,
        position: &Coordinate,
        route: &[Coordinate],
    ) -> Result<NearestReport, NotificationError> {
        let payload = PositionUpdate {
            latitude: position.latitude,
            longitude: position.longitude,
            route: route.iter().map(Coordinate::as_pair).collect(),
        };
        let body = self.post(POSITION_ENDPOINT, &payload)?;
        parse_update_response(&body).map_err(|e| NotificationError::new(POSITION_ENDPOINT, e))
    }
}

/// Used when no downstream server is configured: nothing is sent and every
/// tick reports no nearby signal
#[derive(Debug, Default)]
pub struct DetachedNotifier;

impl Notifier for DetachedNotifier {
    fn publish_intersection(&self, intersection: &Intersection) -> Result<(), NotificationError> {
        debug!("No downstream configured, dropping signal {}", intersection.position);
        Ok(())
    }

    fn report_position(
        &self,
        _position: &Coordinate,
        _route: &[Coordinate],
    ) -> Result<NearestReport, NotificationError> {
        Ok(NearestReport::empty())
    }
}
