//! External collaborators the planner and simulator talk to
//!
//! Each collaborator is a trait so the core can run against in-process
//! fakes. The HTTP implementations live in the submodules.

mod nominatim;
mod notifier;
mod osrm;

use anyhow::Result;

use crate::error::{NotificationError, RouteError};
use crate::simulation::{Coordinate, Intersection, NearestReport};

pub use nominatim::{parse_search_response, Nominatim};
pub use notifier::{parse_update_response, DetachedNotifier, HttpNotifier};
pub use osrm::{parse_route_response, Osrm};

/// Turns free text into a coordinate
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the provider has no match for `query`
    fn geocode(&self, query: &str) -> Result<Option<Coordinate>>;
}

/// Fetches a driving route between two coordinates
pub trait RouteProvider: Send + Sync {
    /// Returns the encoded polyline geometry of the fastest route
    fn fetch_route(&self, from: &Coordinate, to: &Coordinate) -> Result<String, RouteError>;
}

/// Downstream consumer of detected signals and vehicle positions
pub trait Notifier: Send + Sync {
    fn publish_intersection(&self, intersection: &Intersection) -> Result<(), NotificationError>;

    /// Report the vehicle's position and receive the nearest upcoming signal
    fn report_position(
        &self,
        position: &Coordinate,
        route: &[Coordinate],
    ) -> Result<NearestReport, NotificationError>;
}
