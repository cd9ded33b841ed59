//! Scalarm Monitor
//!
//! Keeps simulation manager records of a Scalarm experiment manager in step
//! with what happens on the local infrastructure.
//!
//! Architecture:
//! - Configuration: JSON config file plus command-line overrides
//! - Client: HTTP communication with the information service and experiment manager
//! - Services: per-record monitoring logic behind the `RecordHandler` trait
//! - Scheduler: the polling loop that fetches, downloads and pushes updates
//!
//! Everything runs on a single thread and requests are issued sequentially.

mod config;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::scheduler::RecordPoller;
use crate::service::LoggingHandler;
use scalarm_client::{Credentials, ExperimentManagerClient, tls};

#[derive(Parser)]
#[command(name = "scalarm-monitor")]
#[command(about = "Scalarm simulation manager monitoring daemon", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(long, env = "SCALARM_MONITOR_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Seconds between poll passes
    #[arg(long, env = "SCALARM_MONITOR_POLL_INTERVAL", default_value_t = 10)]
    poll_interval: u64,

    /// Directory code archives are written to
    #[arg(long, default_value = ".")]
    sources_dir: PathBuf,

    /// Skip TLS certificate verification (overrides the config file)
    #[arg(long)]
    insecure: bool,

    /// Run a single poll pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scalarm_monitor=info,scalarm_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Starting Scalarm Monitor");

    // Configuration errors are fatal
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    info!("Loaded configuration: {:?}", config);

    if cli.poll_interval == 0 {
        anyhow::bail!("poll interval must be greater than 0");
    }

    let insecure = cli.insecure || config.insecure;
    let http_client = tls::build_http_client(config.certificate_path(), insecure)
        .context("Failed to build HTTP client")?;
    let client = ExperimentManagerClient::with_client(
        Credentials::new(config.login.clone(), config.password.clone()),
        config.scalarm_scheme.clone(),
        http_client,
    )
    .with_sources_dir(cli.sources_dir);

    let mut poller = RecordPoller::new(
        config,
        client,
        Arc::new(LoggingHandler),
        Duration::from_secs(cli.poll_interval),
    );

    if cli.once {
        let summary = poller.poll_once().await?;
        info!("Poll finished: {:?}", summary);
        return Ok(());
    }

    poller.run().await
}
