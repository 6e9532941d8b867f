//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate the check document
//! - Initialize subsystems in dependency order
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: an unreadable or invalid check document is fatal
//! - Self-metrics are best effort; a recorder failure only loses them
//! - The listener binds last (scrapes only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::checks::Registry;
use crate::collector::{Collector, DEFAULT_CHECK_TIMEOUT};
use crate::config::watcher::ConfigWatcher;
use crate::config::{load_config, ConfigError, DEFAULT_NAMESPACE};
use crate::context::ContextResolver;
use crate::http::{AppState, HttpServer, DEFAULT_SCRAPE_TIMEOUT};
use crate::lifecycle::{signals, Shutdown};
use crate::monitor::NatsMonitor;
use crate::observability::{init_metrics, TracingResultLog};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:7777";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("failed to watch config: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Runtime settings assembled from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub namespace: String,
    pub listen: SocketAddr,
    pub context_dir: Option<PathBuf>,
    pub scrape_timeout: Duration,
    pub check_timeout: Duration,
    pub watch: bool,
}

impl Settings {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            listen: SocketAddr::from(([0, 0, 0, 0], 7777)),
            context_dir: None,
            scrape_timeout: DEFAULT_SCRAPE_TIMEOUT,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            watch: false,
        }
    }
}

/// Start the exporter and serve until SIGINT/SIGTERM.
pub async fn run(settings: Settings) -> Result<(), StartupError> {
    let config = load_config(&settings.config_path).map_err(|source| StartupError::Config {
        path: settings.config_path.clone(),
        source,
    })?;
    tracing::info!(
        path = ?settings.config_path,
        checks = config.checks.len(),
        context = %config.context,
        "Configuration loaded"
    );

    let current = Arc::new(ArcSwap::from_pointee(config));
    let _watcher = if settings.watch {
        Some(ConfigWatcher::new(&settings.config_path, current.clone()).run()?)
    } else {
        None
    };

    let handle = match init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Self-metrics disabled");
            None
        }
    };

    let resolver = ContextResolver::with_dir(settings.context_dir.clone());
    tracing::info!(dir = ?resolver.dir(), "Context directory");

    let collector = Collector::new(
        settings.namespace.clone(),
        current,
        resolver,
        Registry::standard(),
        Arc::new(NatsMonitor::new(settings.check_timeout)),
        Arc::new(TracingResultLog),
    )
    .with_check_timeout(settings.check_timeout);

    let listener = TcpListener::bind(settings.listen)
        .await
        .map_err(|source| StartupError::Bind {
            addr: settings.listen,
            source,
        })?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(AppState {
        collector: Arc::new(collector),
        handle,
        scrape_timeout: settings.scrape_timeout,
    });
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
