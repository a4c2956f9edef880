//! Correlation between the benchmark's metrics clock and wall-clock time.
//!
//! The `Clocks` section samples both clocks at roughly the same instant:
//!
//! ```text
//! Clocks
//! SystemTime,1537814143804295
//! MetricsTime,12137713413174
//! ```
//!
//! The difference between the two is a single additive offset that maps any
//! metrics timestamp onto epoch nanoseconds. It is computed once, on first
//! use, and cached for the rest of the run. Drift between the two clocks over
//! a run is assumed negligible.

use crate::metrics::error::ParseErrorKind;
use crate::metrics::section::Section;
use std::collections::BTreeMap;
use tracing::debug;

const SYSTEM_TIME: &str = "SystemTime";
const METRICS_TIME: &str = "MetricsTime";

#[derive(Debug, Default)]
pub struct ClockReconciler {
    /// Raw `Clocks` body, present once that section has closed.
    lines: Option<Vec<Vec<String>>>,
    delta: Option<i64>,
}

impl ClockReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the body of the closed `Clocks` section.
    pub fn record_section(&mut self, lines: Vec<Vec<String>>) {
        self.lines = Some(lines);
    }

    /// Cached `SystemTime - MetricsTime`, if it has been resolved.
    pub fn delta(&self) -> Option<i64> {
        self.delta
    }

    /// Convert a metrics-clock timestamp to epoch nanoseconds.
    ///
    /// `seen` lists the sections closed so far and is only used to explain a
    /// [`ParseErrorKind::ClockNotResolved`] failure.
    pub fn resolve_system_time(
        &mut self,
        metrics_time: i64,
        seen: &[Section],
    ) -> Result<i64, ParseErrorKind> {
        if let Some(delta) = self.delta {
            return metrics_time
                .checked_add(delta)
                .ok_or(ParseErrorKind::TimestampOverflow);
        }

        let lines = self.lines.as_ref().ok_or_else(|| ParseErrorKind::ClockNotResolved {
            seen: seen.to_vec(),
        })?;

        let mut clocks: BTreeMap<&str, i64> = BTreeMap::new();
        for fields in lines {
            let [name, value] = fields.as_slice() else {
                return Err(ParseErrorKind::MalformedLine {
                    section: Section::Clocks,
                    expected: 2,
                    got: fields.len(),
                });
            };
            let time = value.parse::<i64>().map_err(|_| ParseErrorKind::InvalidInteger {
                field: "clock value",
                value: value.to_string(),
            })?;
            clocks.insert(name.as_str(), time);
        }

        let (Some(system), Some(metrics)) = (clocks.get(SYSTEM_TIME), clocks.get(METRICS_TIME))
        else {
            return Err(ParseErrorKind::MissingClockField);
        };

        let delta = system
            .checked_sub(*metrics)
            .ok_or(ParseErrorKind::TimestampOverflow)?;
        debug!(system, metrics, delta, "resolved clock delta");
        self.delta = Some(delta);

        self.resolve_system_time(metrics_time, seen)
    }
}
