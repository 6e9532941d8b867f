//! Check document watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::loader::load_config;
use crate::config::schema::ExporterConfig;

/// Monitors the check document and swaps in every valid revision.
pub struct ConfigWatcher {
    path: PathBuf,
    current: Arc<ArcSwap<ExporterConfig>>,
}

impl ConfigWatcher {
    pub fn new(path: &Path, current: Arc<ArcSwap<ExporterConfig>>) -> Self {
        Self {
            path: path.to_path_buf(),
            current,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let current = self.current.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        reload(&path, &current);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and publish it; keep the previous document on failure.
pub fn reload(path: &Path, current: &ArcSwap<ExporterConfig>) -> bool {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(checks = config.checks.len(), "Check configuration reloaded");
            current.store(Arc::new(config));
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_reload_swaps_valid_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checks.yaml");
        fs::write(&path, "checks:\n  - {name: a, kind: connection}\n").unwrap();

        let current = ArcSwap::from_pointee(ExporterConfig::default());
        assert!(reload(&path, &current));
        assert_eq!(current.load().checks.len(), 1);
    }

    #[test]
    fn test_reload_keeps_previous_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checks.yaml");
        fs::write(&path, "checks:\n  - {name: a, kind: connection}\n").unwrap();

        let current = ArcSwap::from_pointee(ExporterConfig::default());
        assert!(reload(&path, &current));

        fs::write(&path, "checks: [oops").unwrap();
        assert!(!reload(&path, &current));
        assert_eq!(current.load().checks[0].name, "a");
    }
}
