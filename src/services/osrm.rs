use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::error;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::RouteProvider;
use crate::error::RouteError;
use crate::simulation::Coordinate;

/// Driving routes from an OSRM server
pub struct Osrm {
    client: Client,
    address: String,
}

impl Osrm {
    pub fn new(address: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build routing client")?;
        Ok(Self {
            client,
            address: address.trim_end_matches('/').to_string(),
        })
    }

    pub fn route_url(&self, from: &Coordinate, to: &Coordinate) -> String {
        // OSRM wants lon,lat
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full",
            self.address, from.longitude, from.latitude, to.longitude, to.latitude
        )
    }
}

impl RouteProvider for Osrm {
    fn fetch_route(&self, from: &Coordinate, to: &Coordinate) -> Result<String, RouteError> {
        let url = self.route_url(from, to);
        let resp = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("requesting {}", url))
            .map_err(RouteError::Unreachable)?;
        let status = resp.status();
        let body = resp
            .text()
            .with_context(|| format!("reading response from {}", url))
            .map_err(RouteError::Unreachable)?;

        // OSRM reports NoRoute and friends with a 4xx and a JSON body, so only
        // treat the status as fatal when the body can't be read
        match parse_route_response(&body) {
            Err(RouteError::Malformed(e)) if !status.is_success() => {
                Err(RouteError::Unreachable(e.context(format!("HTTP {}", status))))
            }
            Err(RouteError::Rejected { code, message }) => {
                error!("OSRM route error: {} {:?}", code, message);
                Err(RouteError::Rejected { code, message })
            }
            other => other,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteGeometry>,
}

#[derive(Debug, Deserialize)]
struct RouteGeometry {
    geometry: String,
}

/// Encoded geometry of the first route in an OSRM route response
pub fn parse_route_response(body: &str) -> Result<String, RouteError> {
    let resp: Response = serde_json::from_str(body)
        .context("Routing response is not an OSRM route object")
        .map_err(RouteError::Malformed)?;
    if resp.code != "Ok" {
        return Err(RouteError::Rejected {
            code: resp.code,
            message: resp.message,
        });
    }
    resp.routes
        .into_iter()
        .next()
        .map(|route| route.geometry)
        .ok_or_else(|| RouteError::Malformed(anyhow!("response contains no routes")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_lon_lat_url() {
        let osrm = Osrm::new(
            "http://router.project-osrm.org/".to_string(),
            Duration::from_secs(10),
        )
        .unwrap();
        let url = osrm.route_url(&Coordinate::new(12.5, 77.25), &Coordinate::new(13.0, 77.75));
        assert_eq!(
            url,
            "http://router.project-osrm.org/route/v1/driving/77.25,12.5;77.75,13?overview=full"
        );
    }

    #[test]
    fn extracts_first_geometry() {
        let body = r#"{"code": "Ok", "routes": [{"geometry": "_p~iF~ps|U", "distance": 10.0}], "waypoints": []}"#;
        assert_eq!(parse_route_response(body).unwrap(), "_p~iF~ps|U");
    }

    #[test]
    fn non_ok_code_is_rejected() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        match parse_route_response(body) {
            Err(RouteError::Rejected { code, message }) => {
                assert_eq!(code, "NoRoute");
                assert_eq!(message.as_deref(), Some("Impossible route between points"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn missing_routes_are_malformed() {
        assert!(matches!(
            parse_route_response(r#"{"code": "Ok", "routes": []}"#),
            Err(RouteError::Malformed(_))
        ));
        assert!(matches!(
            parse_route_response("<html>bad gateway</html>"),
            Err(RouteError::Malformed(_))
        ));
    }
}
