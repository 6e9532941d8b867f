//! Metric samples and Prometheus text exposition.

use std::collections::BTreeMap;

/// One gauge sample produced by a check result.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub help: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// Destination for samples emitted during a scrape.
pub trait MetricSink: Send {
    fn record(&mut self, sample: Sample);
}

/// Per-scrape sample collection.
///
/// A fresh buffer is used for every scrape so series from earlier cycles
/// never linger.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples whose `item` label equals `item`.
    pub fn for_item<'a>(&'a self, item: &'a str) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples
            .iter()
            .filter(move |s| s.labels.iter().any(|(k, v)| k == "item" && v == item))
    }

    /// Render in the Prometheus text exposition format (0.0.4).
    ///
    /// Families keep first-seen order; HELP and TYPE appear once per family.
    pub fn render_prometheus(&self) -> String {
        let mut order: Vec<&str> = Vec::new();
        let mut families: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
        for sample in &self.samples {
            let family = families.entry(sample.name.as_str()).or_default();
            if family.is_empty() {
                order.push(sample.name.as_str());
            }
            family.push(sample);
        }

        let mut out = String::new();
        for name in order {
            let Some(samples) = families.get(name) else {
                continue;
            };
            out.push_str(&format!("# HELP {} {}\n", name, escape_help(&samples[0].help)));
            out.push_str(&format!("# TYPE {} gauge\n", name));
            for sample in samples {
                out.push_str(name);
                if !sample.labels.is_empty() {
                    let labels: Vec<String> = sample
                        .labels
                        .iter()
                        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                        .collect();
                    out.push_str(&format!("{{{}}}", labels.join(",")));
                }
                out.push_str(&format!(" {}\n", format_value(sample.value)));
            }
        }
        out
    }
}

impl MetricSink for SampleBuffer {
    fn record(&mut self, sample: Sample) {
        self.samples.push(sample);
    }
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}
