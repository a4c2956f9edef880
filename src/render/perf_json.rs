//! Legacy `perf.json` report.
//!
//! JSON shape:
//! {
//!   "results": [
//!     {
//!       "name": "InsertTest.output",
//!       "workload": "InsertTest.output",
//!       "start": 15378141410.61109,      // started / 1e5
//!       "end": 15378141436.8726,         // ended / 1e5
//!       "results": {
//!         "2": {                         // distinct thread count
//!           "ops_per_sec": 1523.14,
//!           "ops_per_sec_values": [1523.14]
//!         }
//!       }
//!     }
//!   ]
//! }

use crate::model::{TimerSummary, TimerSummaryMap};
use crate::render::json::to_sorted_pretty;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Divisor applied to epoch-nanosecond timestamps for `start`/`end`.
const TIMESTAMP_SCALE: f64 = 1e5;
const NANOS_PER_SEC: f64 = 1e9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfReport {
    pub results: Vec<PerfEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfEntry {
    pub name: String,
    pub workload: String,
    pub start: f64,
    pub end: f64,
    /// Keyed by thread count.
    pub results: BTreeMap<String, PerfResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfResult {
    pub ops_per_sec: f64,
    pub ops_per_sec_values: Vec<f64>,
}

/// Throughput over the operation's wall-clock span: the inverse of the mean
/// interval between events.
pub fn ops_per_sec(summary: &TimerSummary) -> f64 {
    let span = summary.span();
    if span <= 0 {
        return 0.0;
    }
    summary.n as f64 / span as f64 * NANOS_PER_SEC
}

/// Build the legacy report, one entry per operation in key order.
pub fn translate(timers: &TimerSummaryMap) -> PerfReport {
    let results = timers
        .iter()
        .map(|(name, summary)| {
            if summary.span() <= 0 {
                warn!(operation = %name, n = summary.n, "zero time span, reporting 0 ops/sec");
            }
            let rate = ops_per_sec(summary);

            let mut results = BTreeMap::new();
            results.insert(
                summary.threads.len().to_string(),
                PerfResult {
                    ops_per_sec: rate,
                    ops_per_sec_values: vec![rate],
                },
            );

            PerfEntry {
                name: name.clone(),
                workload: name.clone(),
                start: summary.started as f64 / TIMESTAMP_SCALE,
                end: summary.ended as f64 / TIMESTAMP_SCALE,
                results,
            }
        })
        .collect();

    PerfReport { results }
}

pub fn render_perf_json(report: &PerfReport) -> anyhow::Result<String> {
    to_sorted_pretty(report)
}
