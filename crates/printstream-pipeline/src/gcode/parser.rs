//! G-Code parameter extraction and position parsing
//!
//! Parameters are read from the code portion of a line only: anything after a
//! `;` is a comment and never contributes a value. The command word itself is
//! skipped, so the `1` of `G1` is never mistaken for a parameter.

use regex::Regex;
use std::sync::OnceLock;

use super::command::CommandWord;
use printstream_core::data::Axis;
use printstream_core::{GcodeError, PrinterMove};

fn parameter_regex() -> &'static Regex {
    static PARAMETER_REGEX: OnceLock<Regex> = OnceLock::new();
    PARAMETER_REGEX.get_or_init(|| {
        Regex::new(r"([A-Za-z])\s*([-+]?[0-9]*\.?[0-9]*)").expect("invalid regex pattern")
    })
}

/// A single `letter value` word after the command word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter<'a> {
    /// Upper-case parameter letter
    pub letter: char,
    /// Value text exactly as written, possibly empty
    pub raw: &'a str,
    line: &'a str,
}

impl Parameter<'_> {
    /// Numeric value of the parameter
    ///
    /// A bare letter (`G28 X`) has no value and yields `Ok(None)`. Text that
    /// is not a finite number is an error.
    pub fn value(&self) -> Result<Option<f64>, GcodeError> {
        if self.raw.is_empty() {
            return Ok(None);
        }
        match self.raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(GcodeError::InvalidParameter {
                line: self.line.to_string(),
                param: self.letter,
                reason: format!("'{}' is not a number", self.raw),
            }),
        }
    }
}

/// Split a line into its code portion and its `;` comment, if any
pub fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.find(';') {
        Some(idx) => (&line[..idx], Some(&line[idx..])),
        None => (line, None),
    }
}

/// Iterate the parameters of a line, in order of appearance
pub fn parameters(line: &str) -> impl Iterator<Item = Parameter<'_>> + '_ {
    let (code, _) = split_comment(line);
    let start = CommandWord::parse(code).map_or(0, |(_, span)| span.end);

    parameter_regex()
        .captures_iter(&code[start..])
        .filter_map(move |caps| {
            let letter = caps.get(1)?.as_str().chars().next()?;
            let raw = caps.get(2).map_or("", |m| m.as_str());
            Some(Parameter {
                letter: letter.to_ascii_uppercase(),
                raw,
                line,
            })
        })
}

/// Value of the first occurrence of `key`, with malformed values reported
pub fn parameter_value(key: char, line: &str) -> Result<Option<f64>, GcodeError> {
    let key = key.to_ascii_uppercase();
    match parameters(line).find(|p| p.letter == key) {
        Some(param) => param.value(),
        None => Ok(None),
    }
}

/// The number following the first occurrence of `key` in `line`
///
/// Returns `None` when the key is absent or its value is not a number.
///
/// # Examples
/// ```
/// use printstream_pipeline::first_number_after;
///
/// assert_eq!(first_number_after('S', "M109 S210 T1"), Some(210.0));
/// assert_eq!(first_number_after('T', "M109 S210 T1"), Some(1.0));
/// assert_eq!(first_number_after('T', "M109 S210 ; T2"), None);
/// ```
pub fn first_number_after(key: char, line: &str) -> Option<f64> {
    parameter_value(key, line).ok().flatten()
}

/// Overlay the axes a line names onto `previous`
///
/// Components the line omits keep their previous value (and known flag).
/// A malformed value is skipped and the previous value kept.
pub fn parse_move(line: &str, previous: &PrinterMove) -> PrinterMove {
    let mut next = *previous;
    for param in parameters(line) {
        let Some(axis) = Axis::from_letter(param.letter) else {
            continue;
        };
        match param.value() {
            Ok(Some(value)) => next.set(axis, value),
            Ok(None) => {}
            Err(e) => tracing::debug!("Ignoring malformed parameter: {}", e),
        }
    }
    next
}

/// Render a move as a `G1` line naming every known component
///
/// Numbers use the shortest representation that parses back to the same
/// value, so `parse_move(&serialize_move(&m), &PrinterMove::UNKNOWN) == m`.
pub fn serialize_move(position: &PrinterMove) -> String {
    let mut line = String::from("G1");
    for axis in Axis::ALL {
        if let Some(value) = position.get(axis) {
            line.push(' ');
            line.push(axis.letter());
            line.push_str(&format_number(value));
        }
    }
    line
}

/// Shortest round-tripping decimal form of a value
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// Coordinate rounded to a micron, without trailing zeros
///
/// Used for coordinates this pipeline computes, where float noise such as
/// `0.30000000000000004` would otherwise reach the printer.
pub fn format_coordinate(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    // avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}
