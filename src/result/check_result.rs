//! Per-check outcome builder.

use serde::Serialize;

use crate::collector::sink::{MetricSink, Sample};
use crate::result::perfdata::PerfData;
use crate::result::severity::Severity;

/// Textual rendering used for result log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderFormat {
    /// `STATUS name Crit:.. Warn:.. OK:.. | perfdata`
    #[default]
    Nagios,
    Json,
}

/// Mutable outcome accumulator for one check invocation.
///
/// Created by the collector right before the handler runs and consumed
/// once by [`CheckResult::snapshot`]. Severity only ever escalates.
#[derive(Debug, Clone)]
pub struct CheckResult {
    name: String,
    check: String,
    namespace: String,
    render_format: RenderFormat,
    severity: Severity,
    criticals: Vec<String>,
    warnings: Vec<String>,
    oks: Vec<String>,
    output: Option<String>,
    perf_data: Vec<PerfData>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, check: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            check: check.into(),
            namespace: namespace.into(),
            render_format: RenderFormat::Nagios,
            severity: Severity::Ok,
            criticals: Vec::new(),
            warnings: Vec::new(),
            oks: Vec::new(),
            output: None,
            perf_data: Vec::new(),
        }
    }

    pub fn with_render_format(mut self, format: RenderFormat) -> Self {
        self.render_format = format;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self) -> &str {
        &self.check
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Escalate to at least `level` when `condition` holds.
    ///
    /// Returns `condition` so callers can short-circuit the current step.
    /// Once the result is CRITICAL, raises below CRITICAL are ignored.
    pub fn raise(&mut self, level: Severity, condition: bool, message: impl Into<String>) -> bool {
        if !condition {
            return false;
        }
        if self.severity == Severity::Critical && level < Severity::Critical {
            return true;
        }

        let message = message.into();
        match level {
            Severity::Critical => self.criticals.push(message),
            Severity::Warning => self.warnings.push(message),
            Severity::Ok => self.oks.push(message),
        }
        self.severity = self.severity.max(level);
        true
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.raise(Severity::Critical, true, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.raise(Severity::Warning, true, message);
    }

    pub fn ok(&mut self, message: impl Into<String>) {
        self.raise(Severity::Ok, true, message);
    }

    /// Record `"<prefix>: <err>"` as CRITICAL when `res` is an error.
    pub fn critical_if_err<T, E: std::fmt::Display>(&mut self, res: &Result<T, E>, prefix: &str) -> bool {
        match res {
            Ok(_) => false,
            Err(e) => self.raise(Severity::Critical, true, format!("{}: {}", prefix, e)),
        }
    }

    /// Replace the summary portion of the rendered line.
    pub fn set_output(&mut self, output: impl Into<String>) {
        self.output = Some(output.into());
    }

    /// Attach a numeric observation; a later value with the same name wins.
    pub fn attach_metric(&mut self, perf: PerfData) {
        match self.perf_data.iter_mut().find(|p| p.name == perf.name) {
            Some(existing) => *existing = perf,
            None => self.perf_data.push(perf),
        }
    }

    pub fn attach(&mut self, name: &str, value: f64, unit: &str) {
        let mut perf = PerfData::new(name, value);
        if !unit.is_empty() {
            perf = perf.with_unit(unit);
        }
        self.attach_metric(perf);
    }

    /// Immutable copy of the accumulated state.
    pub fn snapshot(&self) -> ResultSnapshot {
        ResultSnapshot {
            name: self.name.clone(),
            check: self.check.clone(),
            namespace: self.namespace.clone(),
            status: self.severity,
            criticals: self.criticals.clone(),
            warnings: self.warnings.clone(),
            oks: self.oks.clone(),
            output: self.output.clone(),
            perf_data: self.perf_data.clone(),
        }
    }

    pub fn render(&self) -> String {
        self.snapshot().render(self.render_format)
    }

    pub fn emit(&self, sink: &mut dyn MetricSink) {
        self.snapshot().emit(sink);
    }
}

impl std::fmt::Display for CheckResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Frozen view of a [`CheckResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSnapshot {
    pub name: String,
    pub check: String,
    pub namespace: String,
    pub status: Severity,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub criticals: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub oks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub perf_data: Vec<PerfData>,
}

impl ResultSnapshot {
    pub fn render(&self, format: RenderFormat) -> String {
        match format {
            RenderFormat::Nagios => self.render_nagios(),
            RenderFormat::Json => serde_json::to_string(self)
                .unwrap_or_else(|e| format!("{} {} render failed: {}", self.status, self.name, e)),
        }
    }

    fn render_nagios(&self) -> String {
        let mut parts = vec![self.name.clone()];
        parts.extend(self.criticals.iter().map(|c| format!("Crit:{}", c)));
        parts.extend(self.warnings.iter().map(|w| format!("Warn:{}", w)));

        if let Some(output) = &self.output {
            parts.push(output.clone());
        } else if !self.oks.is_empty() {
            parts.push(format!("OK:{}", self.oks.join(", ")));
        }

        let line = format!("{} {}", self.status, parts.join(" "));
        if self.perf_data.is_empty() {
            return line;
        }

        let perf: Vec<String> = self.perf_data.iter().map(|p| p.to_string()).collect();
        format!("{} | {}", line, perf.join(" "))
    }

    /// Write the status series and one series per perf item.
    pub fn emit(&self, sink: &mut dyn MetricSink) {
        let labels = vec![("item".to_string(), self.name.clone())];

        sink.record(Sample {
            name: series_name(&self.namespace, &self.check, "status_code"),
            help: "Nagios compatible status code".to_string(),
            labels: labels.clone(),
            value: self.status.as_metric_value(),
        });

        for perf in &self.perf_data {
            sink.record(Sample {
                name: series_name(&self.namespace, &self.check, &perf.name),
                help: perf.help.clone().unwrap_or_else(|| format!("Data about {}", perf.name)),
                labels: labels.clone(),
                value: perf.value,
            });
        }
    }
}

/// `<namespace>_<check>_<metric>` restricted to `[a-zA-Z0-9_:]`.
pub fn series_name(namespace: &str, check: &str, metric: &str) -> String {
    let raw = [namespace, check, metric]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_");

    let mut name: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == ':' { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}
