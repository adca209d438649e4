//! AutoCut worker binary.
//!
//! Reads a job envelope from the file given as the first argument, or from
//! stdin, and prints the JSON response.

use std::io::Read;

use anyhow::{anyhow, Context};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autocut_models::JobRequest;
use autocut_worker::{metrics, GeminiConfig, JobHandler, ProgressReporter, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = &config.metrics_addr {
        metrics::install_exporter(addr).context("Failed to start metrics exporter")?;
        info!(addr = %addr, "Metrics exporter listening");
    }

    let gemini = GeminiConfig::from_env();
    if gemini.is_none() {
        warn!("GEMINI_API_KEY not set; proposals fall back to even tiling and titles to keywords");
    }

    let raw = read_envelope().context("Failed to read job envelope")?;
    let request: JobRequest =
        serde_json::from_str(&raw).context("Job envelope is not valid JSON")?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let (reporter, mut events) = ProgressReporter::channel(256);
    let handler = JobHandler::from_config(config, gemini)
        .context("Failed to create job handler")?
        .with_progress(reporter)
        .with_cancel(cancel_rx);

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!(?event, "Progress");
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cancelling job");
            let _ = cancel_tx.send(true);
        }
    });

    let response = handler.handle(request).await;
    if let Some(message) = response.get("error").and_then(|e| e.as_str()) {
        error!("Job failed: {}", message);
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("autocut=info".parse()?);

    // Logs go to stderr; stdout carries the response
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn read_envelope() -> anyhow::Result<String> {
    match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))
        }
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}
