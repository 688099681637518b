//! Gridpost Binary Entry Point
//!
//! Runs the collect/export pipeline against an in-memory data source.
//! Core functionality is provided by the `gridpost` library crate.

use std::sync::Arc;

use clap::Parser;
use gridpost::{
    config::AppConfig,
    export::Sink,
    pipeline::{Collector, Scheduler},
    telemetry::MemorySource,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gridpost - Telemetry Export Pipeline
#[derive(Parser, Debug)]
#[command(name = "gridpost", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/gridpost.yaml",
        env = "GRIDPOST_CONFIG"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gridpost=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let config = AppConfig::load(&cli.config)?;
    let period = config.period()?;

    // The object registry normally belongs to the host system; seeding
    // zero-valued records lets the daemon run standalone.
    let source = Arc::new(MemorySource::new());
    for object in config.objects.values() {
        source.register_default(&object.reference, object.kind);
    }

    let collector = Collector::new(
        Arc::clone(&source),
        config.site_id,
        config.objects.values().cloned().collect(),
    );
    collector.validate()?;

    let sink = Sink::from_config(&config.sink)?;
    tracing::info!(
        site = config.site_id,
        objects = config.objects.len(),
        period = %config.period,
        "pipeline configured"
    );

    let scheduler = Scheduler::new(collector, sink, period, config.max_pending);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    scheduler.run(shutdown_rx).await;
    Ok(())
}
