use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::Geocoder;
use crate::simulation::Coordinate;

/// Geocoding against a Nominatim search endpoint
pub struct Nominatim {
    client: Client,
    address: String,
}

impl Nominatim {
    pub fn new(address: String, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build geocoding client")?;
        Ok(Self {
            client,
            address: address.trim_end_matches('/').to_string(),
        })
    }
}

impl Geocoder for Nominatim {
    fn geocode(&self, query: &str) -> Result<Option<Coordinate>> {
        let url = format!("{}/search", self.address);
        let body = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .with_context(|| format!("geocoding request for {:?}", query))?;

        let found = parse_search_response(&body)?;
        match found {
            Some(coordinate) => info!("Geocoded {} to {}", query, coordinate),
            None => error!("No geocoding results for: {}", query),
        }
        Ok(found)
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// First result of a Nominatim JSON search, if any
pub fn parse_search_response(body: &str) -> Result<Option<Coordinate>> {
    let places: Vec<Place> =
        serde_json::from_str(body).context("Geocoding response is not a result list")?;
    let Some(place) = places.first() else {
        return Ok(None);
    };

    let latitude: f64 = place
        .lat
        .parse()
        .with_context(|| format!("Bad latitude {:?}", place.lat))?;
    let longitude: f64 = place
        .lon
        .parse()
        .with_context(|| format!("Bad longitude {:?}", place.lon))?;
    Coordinate::checked(latitude, longitude).map(Some)
}
