//! Streaming parser for the benchmark engine's CSV-ish metrics export.
//!
//! ```text
//! Clocks
//! SystemTime,1537814143804295
//! MetricsTime,12137713413174
//!
//! Counters
//! 12137712905436,HelloTest.0.documents,1
//!
//! Timers
//! 12137712905436,InsertTest.id-1.output,2235448
//! 12137710737813,HelloTest.1.output,67458
//! ```
//!
//! Only `Clocks` and `Timers` carry meaning today; `Counters` and `Gauges`
//! are counted (and optionally retained) but not summarized.

pub mod clock;
pub mod error;
pub mod parse;
pub mod section;
pub mod timer;
pub mod tokenize;

pub use clock::ClockReconciler;
pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use parse::{MetricsParser, ParseOptions, parse_file, parse_reader, parse_str};
pub use section::Section;
pub use timer::{EventKey, TimerAggregator, TimerEvent, TimerRunningStats, split_event_name};
