#![warn(unused_extern_crates)]

use anyhow::{Result, anyhow};
use biodetect_core::detect::Detectors;
use biodetect_core::draw;
use biodetect_core::pipeline::load_estimators;
use biodetect_core::presence::PresenceTracker;
use clap::Parser;
use image::ImageReader;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::api::AppState;
use crate::config::{Cli, Command, DetectArgs, ServeArgs};
use crate::queue::DetectionQueue;

mod api;
mod config;
mod queue;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Detect(args) => detect_file(args),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.server_config()?;
    let pipeline_config = args.models.pipeline_config();
    debug!("{pipeline_config:?}");

    let estimators = load_estimators(&pipeline_config)?;
    let detectors = Detectors::new(estimators, args.tracker.tracker());
    let (queue, worker) = DetectionQueue::spawn(detectors)?;

    let app = api::router(AppState::new(queue), &config);
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue handle, so the worker drains and stops
    worker
        .join()
        .map_err(|_| anyhow!("Detection worker panicked"))?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e:?}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

fn detect_file(args: DetectArgs) -> Result<()> {
    let estimators = load_estimators(&args.models.pipeline_config())?;
    let mut detectors = Detectors::new(estimators, PresenceTracker::default());

    let mut img = ImageReader::open(&args.input)?.decode()?.into_rgb8();
    let start = Instant::now();
    let report = detectors.run(args.kind, &img)?;
    debug!("Took {:?}", start.elapsed());

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(output) = args.output {
        draw::annotate(&mut img, &report);
        img.save(&output)?;
        info!("Annotated result at {output:?}");
    }

    Ok(())
}
