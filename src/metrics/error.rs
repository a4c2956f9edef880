//! Errors raised while parsing a metrics export.
//!
//! Every error is fatal to the current parse run. A [`ParseError`] always
//! names the input it came from and the 0-based line that caused it.

use crate::metrics::section::Section;
use thiserror::Error;

/// A fatal parse failure with its origin.
#[derive(Debug, Error)]
#[error("[{file}:{line}] {kind}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(file: impl Into<String>, line: usize, kind: ParseErrorKind) -> Self {
        Self {
            file: file.into(),
            line,
            kind,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// Data line seen before any section header.
    #[error("Unknown section: data line appears before any section header")]
    UnknownSection,

    #[error("Invalid section header {0:?} (expected Clocks, Counters, Gauges or Timers)")]
    InvalidSectionHeader(String),

    #[error("Section {0} appears more than once")]
    DuplicateSection(Section),

    /// A timer needed wall-clock conversion before the Clocks section closed.
    #[error(
        "Can only resolve system time after the Clocks section has been read; sections seen so far: {seen:?}"
    )]
    ClockNotResolved { seen: Vec<Section> },

    #[error("Missing SystemTime or MetricsTime from Clocks")]
    MissingClockField,

    #[error("Invalid event name {0:?}: expected Actor.Operation or Actor.Thread.Operation")]
    InvalidEventName(String),

    #[error("Malformed {section} line: expected {expected} fields, got {got}")]
    MalformedLine {
        section: Section,
        expected: usize,
        got: usize,
    },

    #[error("Invalid integer for {field}: {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("Negative duration {0} for timer event")]
    NegativeDuration(i64),

    #[error("Timestamp arithmetic overflowed")]
    TimestampOverflow,

    /// Finalization requested without the Timers section having been opened.
    #[error("Timer summaries finalized before the Timers section was opened")]
    PrematureFinalize,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseErrorKind {
    /// Attach file and line context.
    pub fn at(self, file: &str, line: usize) -> ParseError {
        ParseError::new(file, line, self)
    }
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
