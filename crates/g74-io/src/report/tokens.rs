//! Numeric token extraction for report lines.
//!
//! Tokens are tried in this order at every position of a line:
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `Infinity`, `Infin`, `ity` | value diverged (text may be wrapped) |
//! | `*********` | value overflowed the column |
//! | `NaN` | engine could not compute the value |
//! | `-?d.dddd(d)` | impedance or voltage, signed |
//! | `ddd.dd` | angle |
//! | `d+.d` | current magnitude |
//!
//! The first four read as 0.0 and are reported as overflowed. Angles carry no
//! sign, so `-84.12` reads as `84.12`.

use once_cell::sync::Lazy;
use regex::Regex;

static IMPEDANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A-?[0-9]\.([0-9]{4,5})").expect("impedance pattern"));
static ANGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[0-9]{1,3}\.[0-9]{2}").expect("angle pattern"));
static MAGNITUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[0-9]+\.[0-9]").expect("magnitude pattern"));
static RUN_INTO_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A[0-9]+\.").expect("run-on pattern"));

const OVERFLOW_TOKENS: [&str; 5] = ["Infinity", "Infin", "ity", "*********", "NaN"];

/// Text that marks a line as holding an overflowed value
const OVERFLOW_MARKERS: [&str; 2] = ["*******", "Infinity"];

/// Values read from one line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedValues {
    pub values: Vec<f64>,
    /// Indices into `values` that came from an overflow token
    pub overflowed: Vec<usize>,
}

impl ExtractedValues {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_overflowed(&self, index: usize) -> bool {
        self.overflowed.contains(&index)
    }

    /// Value at a position. Positions past the end read as 0.0.
    pub fn at(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    fn push_overflow(&mut self) {
        self.overflowed.push(self.values.len());
        self.values.push(0.0);
    }
}

/// True when the raw line carries an overflow marker, which excuses a token
/// count that differs from the layout.
pub fn has_overflow_marker(line: &str) -> bool {
    OVERFLOW_MARKERS.iter().any(|m| line.contains(m))
}

/// Extract every numeric token from a line, left to right.
pub fn extract_values(line: &str) -> ExtractedValues {
    let mut out = ExtractedValues::default();
    let mut pos = 0;

    while pos < line.len() {
        let rest = &line[pos..];
        match next_token(rest) {
            Some((len, token)) => {
                match token {
                    Token::Overflow => out.push_overflow(),
                    // Matched text is ASCII digits with one dot, which always parses
                    Token::Number => out.push(rest[..len].parse().unwrap_or(0.0)),
                }
                pos += len;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    out
}

enum Token {
    Overflow,
    Number,
}

/// Match one token at the start of `rest`, returning its byte length.
fn next_token(rest: &str) -> Option<(usize, Token)> {
    if let Some(tok) = OVERFLOW_TOKENS.iter().find(|t| rest.starts_with(**t)) {
        return Some((tok.len(), Token::Overflow));
    }

    if let Some(caps) = IMPEDANCE.captures(rest) {
        let end = caps.get(0).map_or(0, |m| m.end());
        let decimals = caps.get(1).map_or(0, |m| m.len());
        // Reject a match that runs straight into another number; retry with one
        // decimal fewer before giving up on this token type.
        if !RUN_INTO_NUMBER.is_match(&rest[end..]) {
            return Some((end, Token::Number));
        }
        if decimals == 5 && !RUN_INTO_NUMBER.is_match(&rest[end - 1..]) {
            return Some((end - 1, Token::Number));
        }
    }

    ANGLE
        .find(rest)
        .or_else(|| MAGNITUDE.find(rest))
        .map(|m| (m.end(), Token::Number))
}
