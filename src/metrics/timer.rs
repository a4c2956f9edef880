//! Streaming aggregation of the `Timers` section.
//!
//! Each timer line is `<metrics-timestamp>,<event>,<duration>` where the
//! timestamp marks the end of the operation. Lines are folded into one
//! [`TimerRunningStats`] per [`EventKey`] as they arrive, so memory grows with
//! the number of distinct operations and never with the number of lines.

use crate::metrics::error::ParseErrorKind;
use crate::metrics::section::Section;
use crate::model::{TimerSummary, TimerSummaryMap};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Thread id used for events that carry no thread component.
pub const DEFAULT_THREAD: &str = "0";

/// Operation identity: `Actor.Operation`, thread excluded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey(pub String);

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a dotted event name into its key and thread.
///
/// - `Actor.Op` is a global event on thread `"0"`.
/// - `Actor.Thread.Op[.more...]` keys on `Actor.Op[.more...]`.
pub fn split_event_name(name: &str) -> Result<(EventKey, &str), ParseErrorKind> {
    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        [actor, op] => Ok((EventKey(format!("{actor}.{op}")), DEFAULT_THREAD)),
        [actor, thread, rest @ ..] if !rest.is_empty() => {
            Ok((EventKey(format!("{actor}.{}", rest.join("."))), *thread))
        }
        _ => Err(ParseErrorKind::InvalidEventName(name.to_string())),
    }
}

/// Mutable accumulator for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRunningStats {
    pub duration_sum: i128,
    pub n: u64,
    pub threads: BTreeSet<String>,
    pub started: i64,
    pub ended: i64,
}

impl TimerRunningStats {
    fn new(started: i64, ended: i64) -> Self {
        Self {
            duration_sum: 0,
            n: 0,
            threads: BTreeSet::new(),
            started,
            ended,
        }
    }

    fn record(&mut self, thread: &str, started: i64, ended: i64, duration: i64) {
        if !self.threads.contains(thread) {
            self.threads.insert(thread.to_string());
        }
        self.started = self.started.min(started);
        self.ended = self.ended.max(ended);
        self.duration_sum += i128::from(duration);
        self.n += 1;
    }

    /// Freeze into a summary. `n` is at least 1 for any stored record.
    fn finish(self) -> TimerSummary {
        TimerSummary {
            started: self.started,
            ended: self.ended,
            mean: self.duration_sum as f64 / self.n as f64,
            n: self.n,
            threads: self.threads,
        }
    }
}

/// One decoded timer line, after wall-clock conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEvent<'a> {
    pub key: EventKey,
    pub thread: &'a str,
    /// Wall-clock end of the operation.
    pub when: i64,
    pub duration: i64,
}

impl<'a> TimerEvent<'a> {
    /// Decode `[metrics-timestamp, event, duration]`. `resolve` converts the
    /// metrics timestamp to wall-clock time.
    pub fn decode(
        fields: &[&'a str],
        resolve: impl FnOnce(i64) -> Result<i64, ParseErrorKind>,
    ) -> Result<Self, ParseErrorKind> {
        let [timestamp, event, duration] = fields else {
            return Err(ParseErrorKind::MalformedLine {
                section: Section::Timers,
                expected: 3,
                got: fields.len(),
            });
        };

        let when = resolve(parse_int("timestamp", timestamp)?)?;
        let duration = parse_int("duration", duration)?;
        if duration < 0 {
            return Err(ParseErrorKind::NegativeDuration(duration));
        }
        let (key, thread) = split_event_name(*event)?;

        Ok(Self {
            key,
            thread,
            when,
            duration,
        })
    }

    pub fn started(&self) -> Result<i64, ParseErrorKind> {
        self.when
            .checked_sub(self.duration)
            .ok_or(ParseErrorKind::TimestampOverflow)
    }
}

fn parse_int(field: &'static str, value: &str) -> Result<i64, ParseErrorKind> {
    value.parse().map_err(|_| ParseErrorKind::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

#[derive(Debug, Default)]
pub struct TimerAggregator {
    opened: bool,
    records: HashMap<EventKey, TimerRunningStats>,
}

impl TimerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the Timers section as opened.
    pub fn open(&mut self) {
        self.opened = true;
    }

    /// Number of live records (distinct event keys seen so far).
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&TimerRunningStats> {
        self.records.get(&EventKey(key.to_string()))
    }

    pub fn record(&mut self, event: TimerEvent<'_>) -> Result<(), ParseErrorKind> {
        let started = event.started()?;
        self.records
            .entry(event.key)
            .or_insert_with(|| TimerRunningStats::new(started, event.when))
            .record(event.thread, started, event.when, event.duration);
        Ok(())
    }

    /// Convert every record into its immutable summary.
    pub fn finalize(self) -> Result<TimerSummaryMap, ParseErrorKind> {
        if !self.opened {
            return Err(ParseErrorKind::PrematureFinalize);
        }
        Ok(self
            .records
            .into_iter()
            .map(|(key, stats)| (key.0, stats.finish()))
            .collect())
    }
}
