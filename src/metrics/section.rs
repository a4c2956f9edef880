//! The four named regions of a metrics export.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Section {
    Clocks,
    Counters,
    Gauges,
    Timers,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Clocks,
        Section::Counters,
        Section::Gauges,
        Section::Timers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Clocks => "Clocks",
            Section::Counters => "Counters",
            Section::Gauges => "Gauges",
            Section::Timers => "Timers",
        }
    }

    /// Sections whose bodies are stored or counted but never aggregated.
    pub fn is_passive(self) -> bool {
        matches!(self, Section::Counters | Section::Gauges)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}
