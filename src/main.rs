use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info};

use ambulance_sim::config::{
    Config, DEFAULT_BIND, DEFAULT_NOMINATIM_URL, DEFAULT_OSRM_URL, DEFAULT_USER_AGENT,
};
use ambulance_sim::server;
use ambulance_sim::simulation::{RoutePlanner, SharedState, SimulationConfig};
use ambulance_sim::stats::RunStats;

#[derive(Parser)]
#[command(name = "ambulance_sim")]
#[command(about = "Emergency vehicle route simulator")]
struct Cli {
    /// Start address. With --end, plans one route and runs it headless
    /// instead of serving HTTP.
    #[arg(long, requires = "end")]
    start: Option<String>,

    /// Destination address for a headless run
    #[arg(long, requires = "start")]
    end: Option<String>,

    /// Address the HTTP surface listens on
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND)]
    bind: SocketAddr,

    /// OSRM server used for driving routes
    #[arg(long, env = "OSRM_URL", default_value = DEFAULT_OSRM_URL)]
    osrm_url: String,

    /// Nominatim server used for geocoding
    #[arg(long, env = "NOMINATIM_URL", default_value = DEFAULT_NOMINATIM_URL)]
    nominatim_url: String,

    /// Downstream signal server receiving signals and vehicle positions
    #[arg(long, env = "NOTIFY_URL")]
    notify_url: Option<String>,

    /// User-Agent sent to the geocoder
    #[arg(long, env = "GEOCODER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Timeout in seconds for each outbound HTTP call
    #[arg(long, env = "HTTP_TIMEOUT", default_value = "10")]
    timeout: f64,

    /// Seconds between simulation ticks
    #[arg(long, env = "TICK_INTERVAL", default_value = "0.1")]
    tick: f64,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let http_timeout = Duration::try_from_secs_f64(self.timeout)
            .map_err(|e| anyhow!("invalid --timeout {}: {}", self.timeout, e))?;
        let tick_interval = Duration::try_from_secs_f64(self.tick)
            .map_err(|e| anyhow!("invalid --tick {}: {}", self.tick, e))?;

        Ok(Config {
            bind: self.bind,
            osrm_url: self.osrm_url,
            nominatim_url: self.nominatim_url,
            notify_url: self.notify_url,
            user_agent: self.user_agent,
            http_timeout,
            simulation: SimulationConfig {
                tick_interval,
                ..SimulationConfig::default()
            },
        })
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = try_main() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let trip = cli.start.clone().zip(cli.end.clone());
    let config = cli.into_config()?;

    let planner = Arc::new(config.build_planner(SharedState::new())?);

    match trip {
        Some((start, end)) => run_headless(&planner, &start, &end),
        None => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(server::serve(config.bind, planner))
        }
    }
}

/// Plan one route and block until the vehicle reaches the destination
fn run_headless(planner: &RoutePlanner, start: &str, end: &str) -> Result<()> {
    info!("Running route simulation in headless mode...");
    let started = Instant::now();

    let planned = planner.plan(start, end)?;
    info!(
        "Route from {} to {}: {} points, {} intersections",
        planned.start,
        planned.end,
        planned.route.len(),
        planned.intersections.len()
    );
    for intersection in &planned.intersections {
        info!(
            "  Signal at route point {}: {}",
            intersection.route_index, intersection.position
        );
    }

    let summary = planner
        .wait_for_simulation()
        .context("Simulation was not started")??;

    RunStats::new(&planned, summary, started.elapsed()).log();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_flags_fall_back_to_environment() {
        std::env::set_var("HTTP_TIMEOUT", "2.5");
        std::env::set_var("TICK_INTERVAL", "0.02");
        let config = Cli::try_parse_from(["ambulance_sim"])
            .unwrap()
            .into_config()
            .unwrap();
        assert_eq!(config.http_timeout, Duration::from_millis(2500));
        assert_eq!(config.simulation.tick_interval, Duration::from_millis(20));

        // Flags still win over the environment
        let config = Cli::try_parse_from(["ambulance_sim", "--tick", "0"])
            .unwrap()
            .into_config()
            .unwrap();
        assert!(config.simulation.tick_interval.is_zero());

        std::env::remove_var("HTTP_TIMEOUT");
        std::env::remove_var("TICK_INTERVAL");
    }
}
