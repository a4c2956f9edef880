use crate::metrics::clock::ClockReconciler;
use crate::metrics::error::{ParseErrorKind, ParseResult};
use crate::metrics::section::Section;
use crate::metrics::timer::{TimerAggregator, TimerEvent};
use crate::metrics::tokenize::{Line, tokenize};
use crate::model::{MetricsSummary, TimerSummaryMap};
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug, info};

/// Timer lines between progress messages.
const PROGRESS_EVERY: u64 = 1_000_000;

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Keep Counters and Gauges bodies verbatim instead of only counting them.
    pub retain_raw_sections: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NoSection,
    InSection(Section),
}

/// Section-aware streaming parser for one metrics export.
///
/// Feed lines in order with [`feed_line`](Self::feed_line), then call
/// [`finish`](Self::finish). Timer lines are aggregated as they arrive; only
/// the small `Clocks` body (and, on request, Counters/Gauges) is buffered.
#[derive(Debug)]
pub struct MetricsParser {
    file: String,
    options: ParseOptions,
    state: State,
    buffer: Vec<Vec<String>>,
    /// Sections closed so far, in input order.
    closed: Vec<Section>,
    clocks: ClockReconciler,
    timers: TimerAggregator,
    summaries: Option<TimerSummaryMap>,
    section_lines: BTreeMap<Section, u64>,
    raw_sections: BTreeMap<Section, Vec<Vec<String>>>,
    timer_lines: u64,
    last_line: usize,
}

impl MetricsParser {
    /// `file` identifies the input in diagnostics.
    pub fn new(file: impl Into<String>) -> Self {
        Self::with_options(file, ParseOptions::default())
    }

    pub fn with_options(file: impl Into<String>, options: ParseOptions) -> Self {
        Self {
            file: file.into(),
            options,
            state: State::NoSection,
            buffer: Vec::new(),
            closed: Vec::new(),
            clocks: ClockReconciler::new(),
            timers: TimerAggregator::new(),
            summaries: None,
            section_lines: BTreeMap::new(),
            raw_sections: BTreeMap::new(),
            timer_lines: 0,
            last_line: 0,
        }
    }

    /// Live timer records; bounded by the number of distinct event keys.
    pub fn timer_records(&self) -> usize {
        self.timers.len()
    }

    #[cfg(test)]
    fn current_section(&self) -> Option<Section> {
        match self.state {
            State::NoSection => None,
            State::InSection(section) => Some(section),
        }
    }

    /// Process one input line. `line_number` is 0-based.
    pub fn feed_line(&mut self, line_number: usize, line: &str) -> ParseResult<()> {
        self.last_line = line_number;
        match tokenize(line) {
            Line::Blank => Ok(()),
            Line::Header(name) => self.start_section(name, line_number),
            Line::Data(fields) => self
                .add_line(&fields)
                .map_err(|kind| kind.at(&self.file, line_number)),
        }
    }

    /// Close the open section and return the run's summary.
    pub fn finish(mut self) -> ParseResult<MetricsSummary> {
        let last_line = self.last_line;
        self.end_section(last_line)?;

        Ok(MetricsSummary {
            timers: self.summaries.unwrap_or_default(),
            clock_delta: self.clocks.delta(),
            section_lines: self.section_lines,
            raw_sections: self.raw_sections,
        })
    }

    fn start_section(&mut self, name: &str, line_number: usize) -> ParseResult<()> {
        let section = name.parse::<Section>().map_err(|name| {
            ParseErrorKind::InvalidSectionHeader(name).at(&self.file, line_number)
        })?;

        self.end_section(line_number)?;

        let repeated = self.closed.contains(&section);
        if repeated && !section.is_passive() {
            return Err(ParseErrorKind::DuplicateSection(section).at(&self.file, line_number));
        }

        debug!(%section, line = line_number, "opening section");
        if section == Section::Timers {
            self.timers.open();
        }
        self.state = State::InSection(section);
        Ok(())
    }

    fn end_section(&mut self, line_number: usize) -> ParseResult<()> {
        let State::InSection(section) = self.state else {
            return Ok(());
        };
        self.state = State::NoSection;

        let body = std::mem::take(&mut self.buffer);
        match section {
            Section::Clocks => self.clocks.record_section(body),
            Section::Timers => {
                let timers = std::mem::take(&mut self.timers);
                let summaries = timers
                    .finalize()
                    .map_err(|kind| kind.at(&self.file, line_number))?;
                debug!(operations = summaries.len(), "finalized timers");
                self.summaries = Some(summaries);
            }
            Section::Counters | Section::Gauges => {
                if self.options.retain_raw_sections {
                    self.raw_sections.entry(section).or_default().extend(body);
                }
            }
        }

        if !self.closed.contains(&section) {
            self.closed.push(section);
        }
        debug!(%section, line = line_number, "closed section");
        Ok(())
    }

    fn add_line(&mut self, fields: &[&str]) -> Result<(), ParseErrorKind> {
        let State::InSection(section) = self.state else {
            return Err(ParseErrorKind::UnknownSection);
        };
        *self.section_lines.entry(section).or_default() += 1;

        match section {
            Section::Clocks => {
                if fields.len() != 2 {
                    return Err(ParseErrorKind::MalformedLine {
                        section,
                        expected: 2,
                        got: fields.len(),
                    });
                }
                self.buffer.push(to_owned_fields(fields));
            }
            Section::Timers => {
                let clocks = &mut self.clocks;
                let closed = &self.closed;
                let event =
                    TimerEvent::decode(fields, |t| clocks.resolve_system_time(t, closed))?;
                self.timers.record(event)?;

                self.timer_lines += 1;
                if self.timer_lines % PROGRESS_EVERY == 0 {
                    info!(lines = self.timer_lines, file = %self.file, "processed timer lines");
                }
            }
            Section::Counters | Section::Gauges => {
                if self.options.retain_raw_sections {
                    self.buffer.push(to_owned_fields(fields));
                }
            }
        }
        Ok(())
    }
}

fn to_owned_fields(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// Parse a whole stream, one line at a time.
pub fn parse_reader<R: BufRead>(
    reader: R,
    file: &str,
    options: ParseOptions,
) -> ParseResult<MetricsSummary> {
    let mut parser = MetricsParser::with_options(file, options);
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ParseErrorKind::Io(e).at(file, line_number))?;
        parser.feed_line(line_number, &line)?;
    }
    parser.finish()
}

/// Parse text that is already in memory.
pub fn parse_str(text: &str, file: &str) -> ParseResult<MetricsSummary> {
    parse_reader(text.as_bytes(), file, ParseOptions::default())
}

/// Parse a metrics export from disk.
pub fn parse_file(path: &str, options: ParseOptions) -> crate::Result<MetricsSummary> {
    let file = File::open(path).with_context(|| format!("open metrics file {}", path))?;
    let summary = parse_reader(BufReader::new(file), path, options)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_EXPORT: &str = "Clocks\n\
        SystemTime,1000000000000\n\
        MetricsTime,500000\n\
        Timers\n\
        500100,ActorA.0.op,100\n\
        500200,ActorA.1.op,50\n";

    fn kind_of(text: &str) -> ParseErrorKind {
        parse_str(text, "test").unwrap_err().kind
    }

    #[test]
    fn aggregates_two_threads_into_one_operation() {
        let summary = parse_str(SAMPLE_EXPORT, "test").unwrap();
        assert_eq!(summary.timers.len(), 1);

        let op = summary.timer("ActorA.op").unwrap();
        assert_eq!(op.n, 2);
        assert_eq!(op.mean, 75.0);
        assert_eq!(op.started, 1_000_000_000_000);
        assert_eq!(op.ended, 1_000_000_000_200);
        assert_eq!(
            op.threads.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["0", "1"]
        );
        assert_eq!(summary.clock_delta, Some(999_999_500_000));
    }

    #[test]
    fn empty_input_has_no_timers() {
        assert_eq!(parse_str("", "test").unwrap(), MetricsSummary::default());
    }

    #[test]
    fn sections_without_data() {
        let summary = parse_str("Clocks\n\nGauges\n\nCounters\n\nTimers\n", "test").unwrap();
        assert!(summary.timers.is_empty());
        assert_eq!(summary.clock_delta, None);
    }

    #[test]
    fn data_before_any_header() {
        let err = parse_str("\n1,A.0.o,2\n", "input.csv").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnknownSection));
        assert_eq!(err.file, "input.csv");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn timers_without_clocks() {
        assert!(matches!(
            kind_of("Timers\n1234,A.0.o,345\n"),
            ParseErrorKind::ClockNotResolved { .. }
        ));
    }

    #[test]
    fn timers_after_empty_clocks() {
        assert!(matches!(
            kind_of("Clocks\n\nTimers\n1234,A.0.o,345\n"),
            ParseErrorKind::MissingClockField
        ));
    }

    #[test]
    fn timers_before_clocks() {
        let err = parse_str(
            "Timers\n1234,A.0.o,345\n\nClocks\nSystemTime,23439048\nMetricsTime,303947\n",
            "test",
        )
        .unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ClockNotResolved { .. }));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn single_part_event_name() {
        assert!(matches!(
            kind_of("Clocks\nSystemTime,1\nMetricsTime,1\nTimers\n5,Solo,1\n"),
            ParseErrorKind::InvalidEventName(name) if name == "Solo"
        ));
    }

    #[test]
    fn unknown_header_name() {
        assert!(matches!(
            kind_of("Histograms\n"),
            ParseErrorKind::InvalidSectionHeader(name) if name == "Histograms"
        ));
    }

    #[test]
    fn repeated_timers_section() {
        let err = parse_str(&format!("{SAMPLE_EXPORT}Timers\n"), "test").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::DuplicateSection(Section::Timers)));
        assert_eq!(err.line, 6);
    }

    #[test]
    fn repeated_clocks_section() {
        let err = parse_str("Clocks\nSystemTime,1\nMetricsTime,1\nClocks\n", "test").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::DuplicateSection(Section::Clocks)));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn timer_end_overflows_after_clock_conversion() {
        let text = "Clocks\nSystemTime,10\nMetricsTime,0\nTimers\n9223372036854775800,A.o,1\n";
        let err = parse_str(text, "test").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::TimestampOverflow));
        assert_eq!(err.line, 4);
    }

    #[test]
    fn timer_start_overflows_below_minimum() {
        let text = "Clocks\nSystemTime,0\nMetricsTime,0\nTimers\n-9223372036854775808,A.o,1\n";
        let err = parse_str(text, "test").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::TimestampOverflow));
        assert_eq!(err.line, 4);
    }

    #[test]
    fn clock_line_with_extra_fields() {
        let err = parse_str("Clocks\nSystemTime,1,junk\nMetricsTime,1\n", "test").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::MalformedLine { section: Section::Clocks, expected: 2, got: 3 }
        ));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn passive_sections_are_counted_not_kept() {
        let text = "Counters\n1,A.0.docs,1\n2,A.0.docs,1\nGauges\n1,A.0.conns,3\n";
        let summary = parse_str(text, "test").unwrap();
        assert_eq!(summary.section_lines[&Section::Counters], 2);
        assert_eq!(summary.section_lines[&Section::Gauges], 1);
        assert!(summary.raw_sections.is_empty());
    }

    #[test]
    fn passive_sections_retained_on_request() {
        let text = "Counters\n1,A.0.docs,1\nGauges\n1,A.0.conns,3\nCounters\n2,B.o,4\n";
        let options = ParseOptions {
            retain_raw_sections: true,
        };
        let summary = parse_reader(text.as_bytes(), "test", options).unwrap();
        assert_eq!(
            summary.raw_sections[&Section::Counters],
            vec![
                vec!["1".to_string(), "A.0.docs".to_string(), "1".to_string()],
                vec!["2".to_string(), "B.o".to_string(), "4".to_string()],
            ]
        );
        assert_eq!(summary.raw_sections[&Section::Gauges].len(), 1);
    }

    #[test]
    fn crlf_and_trailing_space_are_ignored() {
        let text = SAMPLE_EXPORT.replace('\n', "  \r\n");
        let summary = parse_str(&text, "test").unwrap();
        assert_eq!(summary.timer("ActorA.op").unwrap().n, 2);
    }

    #[test]
    fn feed_line_tracks_current_section() {
        let mut parser = MetricsParser::new("test");
        assert_eq!(parser.current_section(), None);
        parser.feed_line(0, "Gauges").unwrap();
        assert_eq!(parser.current_section(), Some(Section::Gauges));
        parser.feed_line(1, "Clocks").unwrap();
        assert_eq!(parser.current_section(), Some(Section::Clocks));
    }
}
