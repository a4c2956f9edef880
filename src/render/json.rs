use crate::model::{MetricsSummary, TimerSummaryMap};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Render the timer summaries as an indented JSON object keyed by operation.
///
/// Keys are sorted at every level, so the same summaries always produce the
/// same bytes.
pub fn render_summary_json(timers: &TimerSummaryMap) -> anyhow::Result<String> {
    to_sorted_pretty(timers)
}

/// Render the whole run: timers, clock delta, per-section line counts and any
/// retained Counters/Gauges bodies.
pub fn render_metrics_json(summary: &MetricsSummary) -> anyhow::Result<String> {
    to_sorted_pretty(summary)
}

/// Serialize with lexicographically sorted object keys and 4-space indent.
pub(crate) fn to_sorted_pretty<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<String> {
    // Round-trip through Value: its map type orders keys.
    let value = serde_json::to_value(data)?;

    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    out.push(b'\n');

    Ok(String::from_utf8(out)?)
}
