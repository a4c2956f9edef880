//! Report emitters. Both consume a finished [`MetricsSummary`](crate::model::MetricsSummary)
//! and never re-aggregate.

pub mod json;
pub mod perf_json;

pub use json::{render_metrics_json, render_summary_json};
pub use perf_json::{PerfReport, render_perf_json, translate};
