//! Configuration schema definitions.
//!
//! The check document is YAML:
//!
//! ```yaml
//! context: production
//! checks:
//!   - name: local_connection
//!     kind: connection
//!     properties:
//!       connect_time_warning: 500ms
//! ```

use serde::{Deserialize, Serialize};

/// Namespace used as the series prefix when none is configured.
pub const DEFAULT_NAMESPACE: &str = "natscli";

/// Root of the check document.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    /// Default connection profile for checks that do not set one.
    pub context: String,

    /// Checks in scrape order.
    pub checks: Vec<CheckConfig>,
}

/// One configured health check.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CheckConfig {
    /// Unique label, used as the `item` label of emitted series.
    pub name: String,

    /// Handler selector (`connection`, `stream`, `kv`, ...).
    pub kind: String,

    /// Connection profile override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Kind-specific payload, decoded by the handler.
    #[serde(default)]
    pub properties: serde_yaml::Value,
}

impl CheckConfig {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            context: None,
            properties: serde_yaml::Value::Null,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_properties(mut self, properties: serde_yaml::Value) -> Self {
        self.properties = properties;
        self
    }

    /// The profile to resolve: the check override, else `default`.
    pub fn context_name<'a>(&'a self, default: &'a str) -> &'a str {
        match self.context.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => default,
        }
    }
}

/// Pick the namespace label, falling back to [`DEFAULT_NAMESPACE`].
pub fn namespace_or_default(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.trim().is_empty() => ns.trim().to_string(),
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}
