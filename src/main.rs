// src/main.rs
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

mod checker;
mod config;
mod platform;
mod probe;
mod report;

use crate::checker::{ambient_overrides, ServiceChecker};
use crate::platform::{CommandRunner, SystemRunner, VariableFetcher};
use crate::probe::ConnectivityProber;

/// Health-check runner for deployed services: HTTP liveness, required
/// environment variables, and optional database connectivity per service.
#[derive(Debug, Parser)]
#[command(name = "service-doctor", version, about)]
struct Args {
    /// Path to the service configuration file (YAML or JSON)
    #[arg(long, default_value = "services.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("service_doctor=info".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Loading configuration from: {}", args.config);
    let config = config::load_config(&args.config).await?;

    // Ambient overrides are read exactly once; everything downstream gets
    // this map injected.
    let overrides = ambient_overrides();

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let fetcher = VariableFetcher::new(runner.clone(), &config.platform);
    let prober = ConnectivityProber::new(runner, &config.platform);
    let checker = ServiceChecker::new(fetcher, prober, config.platform.clone(), overrides);

    let mut results = Vec::with_capacity(config.services.len());
    for service in &config.services {
        results.push(checker.check(service).await);
    }

    report::print_report(&results)?;

    if results.iter().any(|r| !r.ok) {
        std::process::exit(2);
    }
    Ok(())
}
