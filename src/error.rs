//! Error taxonomy for route planning and downstream notification
//!
//! Geocoding and routing failures end a plan request and are reported to
//! the caller. Notification failures are logged and dropped by whoever
//! receives them.

use std::fmt;

use thiserror::Error;

/// Why an address could not be turned into a coordinate
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no geocoding result for {query:?}")]
    NoResult { query: String },
    #[error("geocoding {query:?} failed: {source:#}")]
    Failed {
        query: String,
        #[source]
        source: anyhow::Error,
    },
}

impl GeocodeError {
    pub fn query(&self) -> &str {
        match self {
            GeocodeError::NoResult { query } | GeocodeError::Failed { query, .. } => query,
        }
    }
}

/// Why no usable route came back from the routing provider
#[derive(Debug, Error)]
pub enum RouteError {
    /// The provider answered with a non-Ok code
    #[error("routing provider returned {code}{}", detail(.message))]
    Rejected {
        code: String,
        message: Option<String>,
    },
    /// The provider answered Ok but the geometry is unusable
    #[error("route geometry unusable: {0:#}")]
    Malformed(#[source] anyhow::Error),
    /// The provider could not be reached or answered garbage
    #[error("routing provider unreachable: {0:#}")]
    Unreachable(#[source] anyhow::Error),
}

fn detail(message: &Option<String>) -> String {
    message
        .as_ref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// A failed call to the downstream consumer. Never fatal.
#[derive(Debug, Error)]
#[error("posting to {endpoint} failed: {source:#}")]
pub struct NotificationError {
    pub endpoint: &'static str,
    #[source]
    pub source: anyhow::Error,
}

impl NotificationError {
    pub fn new(endpoint: &'static str, source: anyhow::Error) -> Self {
        Self { endpoint, source }
    }
}

/// Which end of the trip an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripEnd {
    Start,
    End,
}

impl fmt::Display for TripEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripEnd::Start => write!(f, "start"),
            TripEnd::End => write!(f, "end"),
        }
    }
}

/// A plan request that could not be completed
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("{end} location: {error}")]
    Geocode {
        end: TripEnd,
        #[source]
        error: GeocodeError,
    },
    #[error("{0}")]
    Route(#[from] RouteError),
}

impl PlanError {
    /// HTTP status the plan-route surface answers with
    pub fn status_code(&self) -> u16 {
        match self {
            PlanError::Geocode { .. } => 400,
            PlanError::Route(RouteError::Rejected { .. }) => 400,
            PlanError::Route(RouteError::Malformed(_)) => 400,
            PlanError::Route(RouteError::Unreachable(_)) => 500,
        }
    }

    /// Short message for the HTTP error body
    pub fn public_message(&self) -> String {
        match self {
            PlanError::Geocode { end, error } => {
                format!("Failed to geocode {} location: {}", end, error.query())
            }
            PlanError::Route(RouteError::Unreachable(_)) => {
                "Failed to get route from routing provider".to_string()
            }
            PlanError::Route(_) => "Failed to calculate route".to_string(),
        }
    }
}
