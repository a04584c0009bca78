//! In-process metrics registry with Prometheus text rendering.

use crate::labels::{sanitize_labels, LabelMap};
use crate::policy::current_policy;
use hdrhistogram::Histogram;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub const TICKS_TOTAL: &str = "playguard_ticks_total";
pub const RECOVERIES_TOTAL: &str = "playguard_recoveries_total";
pub const OVERLAYS_HANDLED_TOTAL: &str = "playguard_overlays_handled_total";
pub const TICK_LATENCY_US: &str = "playguard_tick_latency_us";
pub const STALLED_FOR_MS: &str = "playguard_stalled_for_ms";

#[derive(Hash, Eq, PartialEq, Ord, PartialOrd, Clone, Debug)]
struct MetricKey {
    name: &'static str,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &'static str, labels: LabelMap) -> Self {
        // BTreeMap iteration keeps labels sorted by key.
        Self {
            name,
            labels: sanitize_labels(labels).into_iter().collect(),
        }
    }

    fn fmt_labels_with(&self, extra: Option<(&str, String)>) -> String {
        let mut parts: Vec<String> = self
            .labels
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, v))
            .collect();
        if let Some((k, v)) = extra {
            parts.push(format!("{}=\"{}\"", k, v));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", parts.join(","))
        }
    }

    fn fmt_labels(&self) -> String {
        self.fmt_labels_with(None)
    }
}

struct HistEntry {
    histogram: Option<Histogram<u64>>,
    sum: u128,
}

impl HistEntry {
    fn new() -> Self {
        Self {
            histogram: Histogram::<u64>::new(3).ok(),
            sum: 0,
        }
    }
}

static COUNTERS: OnceCell<Mutex<BTreeMap<MetricKey, u64>>> = OnceCell::new();
static GAUGES: OnceCell<Mutex<BTreeMap<MetricKey, f64>>> = OnceCell::new();
static HISTOGRAMS: OnceCell<Mutex<BTreeMap<MetricKey, HistEntry>>> = OnceCell::new();

fn counters() -> &'static Mutex<BTreeMap<MetricKey, u64>> {
    COUNTERS.get_or_init(|| Mutex::new(BTreeMap::new()))
}

fn gauges() -> &'static Mutex<BTreeMap<MetricKey, f64>> {
    GAUGES.get_or_init(|| Mutex::new(BTreeMap::new()))
}

fn histograms() -> &'static Mutex<BTreeMap<MetricKey, HistEntry>> {
    HISTOGRAMS.get_or_init(|| Mutex::new(BTreeMap::new()))
}

pub fn ensure_metrics() {
    let _ = counters();
    let _ = gauges();
    let _ = histograms();
}

/// Drop every recorded series.
pub fn reset() {
    counters().lock().clear();
    gauges().lock().clear();
    histograms().lock().clear();
}

pub fn inc(name: &'static str, labels: LabelMap) {
    if !current_policy().enable_metrics {
        return;
    }
    let key = MetricKey::new(name, labels);
    let mut map = counters().lock();
    *map.entry(key).or_insert(0) += 1;
}

pub fn set(name: &'static str, value: f64, labels: LabelMap) {
    if !current_policy().enable_metrics {
        return;
    }
    let key = MetricKey::new(name, labels);
    gauges().lock().insert(key, value);
}

pub fn observe(name: &'static str, value: u64, labels: LabelMap) {
    if !current_policy().enable_metrics {
        return;
    }
    let key = MetricKey::new(name, labels);
    let mut map = histograms().lock();
    let entry = map.entry(key).or_insert_with(HistEntry::new);
    if let Some(histogram) = entry.histogram.as_mut() {
        let _ = histogram.record(value);
    }
    entry.sum += value as u128;
}

pub fn counter_value(name: &'static str, labels: LabelMap) -> u64 {
    let key = MetricKey::new(name, labels);
    counters().lock().get(&key).copied().unwrap_or(0)
}

pub fn render_prometheus() -> String {
    let mut output = String::new();

    for (key, value) in counters().lock().iter() {
        output.push_str(&format!("{}{} {}\n", key.name, key.fmt_labels(), value));
    }

    for (key, value) in gauges().lock().iter() {
        output.push_str(&format!("{}{} {:.6}\n", key.name, key.fmt_labels(), value));
    }

    // Histograms -> quantiles plus count/sum
    for (key, entry) in histograms().lock().iter() {
        let Some(histogram) = entry.histogram.as_ref() else {
            continue;
        };
        if histogram.len() == 0 {
            continue;
        }
        for q in [0.5, 0.9, 0.99] {
            output.push_str(&format!(
                "{}{} {}\n",
                key.name,
                key.fmt_labels_with(Some(("quantile", format!("{:.2}", q)))),
                histogram.value_at_quantile(q)
            ));
        }
        output.push_str(&format!(
            "{}_count{} {}\n",
            key.name,
            key.fmt_labels(),
            histogram.len()
        ));
        output.push_str(&format!(
            "{}_sum{} {}\n",
            key.name,
            key.fmt_labels(),
            entry.sum
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::labels;

    #[test]
    fn registry_renders_all_kinds() {
        ensure_metrics();
        inc("unit_counter", labels([("trigger", "timer")]));
        inc("unit_counter", labels([("trigger", "timer")]));
        set("unit_gauge", 1.5, LabelMap::new());
        observe("unit_histogram", 120, LabelMap::new());
        observe("unit_histogram", 80, LabelMap::new());

        assert_eq!(counter_value("unit_counter", labels([("trigger", "timer")])), 2);
        let rendered = render_prometheus();
        assert!(rendered.contains("unit_counter{trigger=\"timer\"} 2"));
        assert!(rendered.contains("unit_gauge 1.500000"));
        assert!(rendered.contains("unit_histogram_count 2"));
        assert!(rendered.contains("unit_histogram_sum 200"));
    }
}
