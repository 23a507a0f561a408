//! Emergency Vehicle Route Simulator Library
//!
//! Plans a driving route between two addresses, flags probable signalised
//! junctions along it and walks a simulated vehicle down the route while
//! reporting its position downstream.

pub mod config;
pub mod error;
pub mod server;
pub mod services;
pub mod simulation;
pub mod stats;
