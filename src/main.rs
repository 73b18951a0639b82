//! This file defines the weather-stats binary entry point.

use weather_stats::app;
use weather_stats::cli;
use weather_stats::metrics;
use weather_stats::server;
use weather_stats::tracing;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    ::tracing::debug!(?args, "parsed command line arguments");
    metrics::register_metrics();
    app::init(&args);
    let service = match app::service(&args) {
        Ok(service) => service,
        Err(err) => {
            ::tracing::error!("failed to initialise service: {}", err);
            tracing::shutdown_tracing();
            std::process::exit(1)
        }
    };
    server::serve(&args, service).await;
    tracing::shutdown_tracing();
}
