//! Summary model: the finished result of one parse run, handed to the
//! report emitters in `render`.

use crate::metrics::Section;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Final statistics for one operation.
///
/// `started` and `ended` are epoch nanoseconds; `mean` is the average
/// duration in the export's duration unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSummary {
    pub started: i64,
    pub ended: i64,
    pub mean: f64,
    pub n: u64,
    pub threads: BTreeSet<String>,
}

impl TimerSummary {
    /// Wall-clock span covered by this operation, in nanoseconds.
    pub fn span(&self) -> i64 {
        self.ended.saturating_sub(self.started)
    }
}

/// Summaries keyed by `Actor.Operation`.
pub type TimerSummaryMap = BTreeMap<String, TimerSummary>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub timers: TimerSummaryMap,

    /// `SystemTime - MetricsTime`, once any timer needed it.
    pub clock_delta: Option<i64>,

    /// Data lines seen per section.
    pub section_lines: BTreeMap<Section, u64>,

    /// Verbatim Counters/Gauges bodies, only when retention was requested.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub raw_sections: BTreeMap<Section, Vec<Vec<String>>>,
}

impl MetricsSummary {
    pub fn timer(&self, key: &str) -> Option<&TimerSummary> {
        self.timers.get(key)
    }
}
