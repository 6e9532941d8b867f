//! Numeric observations attached to a check result.

use serde::{Deserialize, Serialize};

/// A named numeric observation, rendered as Nagios performance data and
/// exported as an additional series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfData {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl PerfData {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit: None,
            warn: None,
            crit: None,
            help: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Record the thresholds the value was compared against.
    /// Negative thresholds mean "disabled" and are not rendered.
    pub fn with_thresholds(mut self, warn: f64, crit: f64) -> Self {
        self.warn = (warn >= 0.0).then_some(warn);
        self.crit = (crit >= 0.0).then_some(crit);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl std::fmt::Display for PerfData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}{}", self.name, self.value, self.unit.as_deref().unwrap_or(""))?;
        write!(f, ";")?;
        if let Some(warn) = self.warn {
            write!(f, "{}", warn)?;
        }
        write!(f, ";")?;
        if let Some(crit) = self.crit {
            write!(f, "{}", crit)?;
        }
        Ok(())
    }
}
