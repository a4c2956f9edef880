//! Line tokenizer.
//!
//! Lines are split on `,` with no quoting or escaping. A single field is a
//! section header, two or more fields are a data line for the open section.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    /// Empty after trailing whitespace is stripped.
    Blank,
    Header(&'a str),
    Data(Vec<&'a str>),
}

pub fn tokenize(line: &str) -> Line<'_> {
    let line = line.trim_end();
    if line.is_empty() {
        return Line::Blank;
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() == 1 {
        Line::Header(fields[0])
    } else {
        Line::Data(fields)
    }
}
