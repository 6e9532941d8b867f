//! NATS check exporter.
//!
//! Runs the configured cluster health checks on every Prometheus scrape
//! and exposes their outcomes as gauges.
//!
//! # Architecture Overview
//!
//! ```text
//!   Prometheus ── GET /metrics ──▶ http ──▶ collector ──▶ checks registry
//!                                              │               │
//!                                              │               ▼
//!                                          context ──▶    monitor ──▶ NATS
//!                                              │               │
//!                                              ▼               ▼
//!                                   SampleBuffer ◀── CheckResult (result)
//!
//!   cross-cutting: config (+watch), observability, resilience, lifecycle
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use nats_check_exporter::config::namespace_or_default;
use nats_check_exporter::lifecycle::{self, Settings, DEFAULT_LISTEN};
use nats_check_exporter::observability::{init_tracing, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "nats-check-exporter", version, about = "Prometheus exporter for NATS health checks")]
struct Cli {
    /// Check document (YAML)
    #[arg(long, short = 'c')]
    config: PathBuf,

    /// Prefix of every exported series
    #[arg(long, default_value = "natscli")]
    namespace: String,

    /// Address the scrape endpoint listens on
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: SocketAddr,

    /// Directory holding named connection contexts
    #[arg(long)]
    context_dir: Option<PathBuf>,

    /// Seconds a whole scrape may take
    #[arg(long, default_value_t = 10)]
    scrape_timeout: u64,

    /// Seconds a single check may take
    #[arg(long, default_value_t = 5)]
    check_timeout: u64,

    /// Log filter, e.g. `debug` or `nats_check_exporter=trace`
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Reload the check document when it changes
    #[arg(long)]
    watch: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            config_path: self.config.clone(),
            namespace: namespace_or_default(Some(&self.namespace)),
            listen: self.listen,
            context_dir: self.context_dir.clone(),
            scrape_timeout: Duration::from_secs(self.scrape_timeout.max(1)),
            check_timeout: Duration::from_secs(self.check_timeout.max(1)),
            watch: self.watch,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.log_format)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "nats-check-exporter starting");

    let settings = cli.settings();
    tracing::info!(
        listen = %settings.listen,
        namespace = %settings.namespace,
        scrape_timeout_secs = settings.scrape_timeout.as_secs(),
        check_timeout_secs = settings.check_timeout.as_secs(),
        watch = settings.watch,
        "Settings resolved"
    );

    lifecycle::run(settings).await?;
    Ok(())
}
