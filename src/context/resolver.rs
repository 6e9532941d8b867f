//! Context name → connection profile resolution.

use std::path::{Path, PathBuf};

use crate::context::profile::Profile;
use crate::context::{ContextError, DEFAULT_CONTEXT};

/// Resolves context names to profiles.
///
/// A name that points at an existing file is parsed directly; anything
/// else is looked up as `<dir>/<name>.json`. Named lookups never leave
/// `dir`.
#[derive(Debug, Clone)]
pub struct ContextResolver {
    dir: PathBuf,
}

impl ContextResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Use `dir` when given, otherwise the standard discovery location.
    pub fn with_dir(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) => Self::new(dir),
            None => Self::discover(),
        }
    }

    /// `$XDG_CONFIG_HOME/nats/context`, else the platform config dir.
    pub fn discover() -> Self {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("nats").join("context"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve `name`; an empty name means [`DEFAULT_CONTEXT`].
    ///
    /// Unknown names yield a deferred profile; the failure surfaces when
    /// connection options are derived.
    pub fn resolve(&self, name: &str) -> Result<Profile, ContextError> {
        let name = if name.trim().is_empty() { DEFAULT_CONTEXT } else { name.trim() };

        let as_path = Path::new(name);
        if as_path.is_file() {
            return Profile::from_file(name, as_path);
        }

        if name.contains(['/', '\\']) || Path::new(name).components().count() != 1 {
            return Err(ContextError::InvalidName(name.to_string()));
        }

        let named = self.dir.join(format!("{}.json", name));
        if named.is_file() {
            tracing::debug!(context = %name, path = ?named, "Loading named context");
            return Profile::from_file(name, &named);
        }

        tracing::debug!(context = %name, dir = ?self.dir, "Context not found, deferring");
        Ok(Profile::deferred(name))
    }
}
