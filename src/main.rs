//! Postalizer Worker - schedule normalization and compliance engine
//!
//! Reads extracted plate documents, merges their columns into whole
//! schedules, reworks each to postal operating rules, and writes the
//! results for the staffing optimizer.

mod cli;
mod config;
mod services;
mod types;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,postalizer_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        ) // file
        .init();

    info!("Starting Postalizer Worker...");

    let args = cli::Cli::parse();

    let postal = config::PostalConfig::from_env()?;
    let worker = config::WorkerConfig::from_env()?;
    info!("Configuration loaded");

    let lookup = services::lookup::ReferenceLookup::open(&worker.tables_dir)?;

    match args.command.unwrap_or(cli::Command::Run) {
        cli::Command::Tables => {
            info!("Reference tables loaded cleanly");
            Ok(())
        }
        cli::Command::Run => {
            let cancel = CancellationToken::new();
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupt received, finishing current document");
                    signal_token.cancel();
                }
            });

            let summary =
                services::pipeline::run_batch(&postal, &worker, &lookup, cancel).await?;

            if summary.failed_documents > 0 {
                error!(
                    failed = summary.failed_documents,
                    "some documents failed, see log for details"
                );
            }
            info!(
                documents = summary.documents,
                schedules = summary.schedules,
                postalized = summary.postalized,
                spotters = summary.spotters,
                "Postalizer Worker finished"
            );
            Ok(())
        }
    }
}
