//! Location Resolver - fills a Thai address from the current location
//!
//! Prints JSON on stdout; logs go to stderr (or to stdout as Stackdriver JSON
//! when `LOG_FORMAT=json`).

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use location_resolver::filler::shared_form;
use location_resolver::{
    Config, Coordinate, LocationError, LocationWorkflow, PositionSample, ReportedPositionSource,
    Resolution, Result,
};

/// Coordinates closer than this (in degrees) count as the same fix
const SAME_FIX_TOLERANCE_DEG: f64 = 1e-6;

#[derive(Debug, Parser)]
#[command(name = "location-resolver", version, about = "Resolve a Thai postal address from a location")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Locate (device fix, then IP), reverse geocode and fill the address form
    Resolve {
        /// Latitude of the device fix; omit to fall through to IP lookup
        #[arg(long, requires = "lon")]
        lat: Option<f64>,
        /// Longitude of the device fix
        #[arg(long, requires = "lat")]
        lon: Option<f64>,
        /// Accuracy radius of the device fix in meters
        #[arg(long, default_value_t = 20.0)]
        accuracy: f64,
        /// Allow the device watch 45 s instead of 15 s
        #[arg(long)]
        extended_accuracy: bool,
        /// Forget the cached location before resolving
        #[arg(long)]
        fresh: bool,
    },
    /// Locate by IP address only
    Ip,
    /// Reverse geocode a coordinate without locating
    Reverse {
        #[arg(long)]
        lat: f64,
        #[arg(long)]
        lon: f64,
    },
    /// Forget the cached location
    Forget,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("location_resolver=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let cli = Cli::parse();
    let config = Config::from_env();
    info!(
        primary = %config.primary_geocoder_url,
        secondary = %config.secondary_geocoder_url,
        cache_dir = ?config.cache_dir,
        "Starting location resolver"
    );

    let reported = match &cli.command {
        Command::Resolve {
            lat: Some(lat),
            lon: Some(lon),
            accuracy,
            ..
        } => Some(PositionSample::new(*lat, *lon, *accuracy)),
        _ => None,
    };
    let source = Arc::new(ReportedPositionSource::new(reported));
    let workflow = LocationWorkflow::from_config(&config, source, shared_form()).await?;

    match cli.command {
        Command::Resolve {
            extended_accuracy,
            fresh,
            ..
        } => {
            if fresh {
                workflow.end_session().await?;
            }
            match workflow.resolve_and_fill(extended_accuracy).await {
                Ok(resolution) => {
                    if cached_fix_differs(reported.as_ref(), &resolution) {
                        warn!(
                            cached_lat = resolution.location.coordinate.latitude,
                            cached_lon = resolution.location.coordinate.longitude,
                            "Reported fix ignored in favour of the cached location; pass --fresh to re-resolve"
                        );
                    }

                    let form = workflow.form().read().await.clone();
                    print_json(&json!({
                        "resolution": resolution,
                        "form": form,
                        "debugLog": workflow.debug_log().entries(),
                    }))?;
                }
                Err(e) => {
                    report_failure(&e, &workflow)?;
                    return Err(e);
                }
            }
        }
        Command::Ip => {
            let location = workflow.ip_locator().locate().await?;
            print_json(&json!({ "location": location }))?;
        }
        Command::Reverse { lat, lon } => {
            let coordinate = Coordinate::new(lat, lon, 0.0);
            let address = workflow
                .geocoder()
                .reverse_geocode(&coordinate, workflow.debug_log())
                .await;
            print_json(&json!({
                "address": address,
                "debugLog": workflow.debug_log().entries(),
            }))?;
        }
        Command::Forget => {
            workflow.end_session().await?;
            info!("Cached location cleared");
        }
    }

    Ok(())
}

/// Whether a cached location stood in for a different reported fix
fn cached_fix_differs(reported: Option<&PositionSample>, resolution: &Resolution) -> bool {
    let Some(sample) = reported else {
        return false;
    };
    let cached = &resolution.location.coordinate;
    resolution.from_cache
        && ((cached.latitude - sample.latitude).abs() > SAME_FIX_TOLERANCE_DEG
            || (cached.longitude - sample.longitude).abs() > SAME_FIX_TOLERANCE_DEG)
}

fn report_failure(err: &LocationError, workflow: &LocationWorkflow) -> Result<()> {
    error!(error = %err, "Location resolution failed");
    let remediation = err.remediation().map(|r| {
        json!({
            "title": r.title,
            "steps": r.steps,
        })
    });
    print_json(&json!({
        "status": err.status_message(),
        "error": err.to_string(),
        "remediation": remediation,
        "debugLog": workflow.debug_log().entries(),
    }))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| LocationError::Config(format!("Failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}
