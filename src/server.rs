//! HTTP surface: plan a route and poll the vehicle
//!
//! Planning blocks on the collaborators, so it runs on tokio's blocking
//! pool. The status query only takes a read lock on the shared state.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{error, info};
use serde::Serialize;

use crate::simulation::{Coordinate, PlannedRoute, RoutePlanner};

/// Colour the map page draws the vehicle with
const VEHICLE_COLOR: &str = "black";

pub async fn serve(addr: SocketAddr, planner: Arc<RoutePlanner>) -> Result<()> {
    let make_svc = make_service_fn(move |_conn| {
        let planner = Arc::clone(&planner);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| handle(Arc::clone(&planner), req)))
        }
    });

    let server = Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind {}", addr))?
        .serve(make_svc);
    info!("Listening on http://{}", addr);

    server
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
        .context("HTTP server failed")?;
    info!("Server stopped");
    Ok(())
}

/// Route one request. Never fails; errors become JSON error bodies.
pub async fn handle(
    planner: Arc<RoutePlanner>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let resp = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => text_response(StatusCode::OK, "Emergency vehicle route simulator\n"),
        (&Method::POST, "/plan_route") => plan_route(planner, req).await,
        (&Method::GET, "/get_vehicle_location") => vehicle_location(&planner),
        _ => error_response(StatusCode::NOT_FOUND, "Not found"),
    };
    Ok(resp)
}

#[derive(Debug, Serialize)]
struct PlanResponse {
    start: [f64; 2],
    route: Vec<[f64; 2]>,
    signals: Vec<Coordinate>,
}

impl From<&PlannedRoute> for PlanResponse {
    fn from(planned: &PlannedRoute) -> Self {
        Self {
            start: planned.start.as_pair(),
            route: planned.route.iter().map(Coordinate::as_pair).collect(),
            signals: planned.intersections.iter().map(|i| i.position).collect(),
        }
    }
}

async fn plan_route(planner: Arc<RoutePlanner>, req: Request<Body>) -> Response<Body> {
    let body = match hyper::body::to_bytes(req.into_body()).await {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to read plan request: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Unreadable request body");
        }
    };

    let mut start = None;
    let mut end = None;
    for (key, value) in url::form_urlencoded::parse(&body) {
        match key.as_ref() {
            "start" => start = Some(value.into_owned()),
            "end" => end = Some(value.into_owned()),
            _ => {}
        }
    }
    let (Some(start), Some(end)) = (start, end) else {
        return error_response(StatusCode::BAD_REQUEST, "Both start and end are required");
    };

    let result = tokio::task::spawn_blocking(move || planner.plan(&start, &end)).await;
    match result {
        Ok(Ok(planned)) => json_response(StatusCode::OK, &PlanResponse::from(&planned)),
        Ok(Err(e)) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            error_response(status, &e.public_message())
        }
        Err(e) => {
            error!("Planning task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Route planning failed")
        }
    }
}

#[derive(Debug, Serialize)]
struct Location {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    location: Location,
    #[serde(rename = "nearestSignal")]
    nearest_signal: Option<Coordinate>,
    #[serde(rename = "distanceToNearest")]
    distance_to_nearest: Option<f64>,
    intersections: Vec<Coordinate>,
    #[serde(rename = "ambulanceColor")]
    vehicle_color: &'static str,
}

fn vehicle_location(planner: &RoutePlanner) -> Response<Body> {
    let snapshot = planner.state().snapshot();
    let vehicle = snapshot.vehicle;
    let status = StatusResponse {
        location: Location {
            latitude: vehicle.location.map(|c| c.latitude),
            longitude: vehicle.location.map(|c| c.longitude),
        },
        nearest_signal: vehicle.nearest_intersection,
        distance_to_nearest: vehicle.distance_to_nearest,
        intersections: snapshot.intersections.iter().map(|i| i.position).collect(),
        vehicle_color: VEHICLE_COLOR,
    };
    json_response(StatusCode::OK, &status)
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut resp = Response::new(Body::from(bytes));
            *resp.status_mut() = status;
            resp.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            resp
        }
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error\n")
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &serde_json::json!({ "error": message }))
}

fn text_response(status: StatusCode, text: &'static str) -> Response<Body> {
    let mut resp = Response::new(Body::from(text));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    resp
}
