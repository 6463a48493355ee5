//! G-Code command words and line classification
//!
//! The filters only care about a handful of commands. Everything else is
//! classified as [`LineKind::Other`] and flows through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comment line stamped at the head of a stream that has been leveled
pub const LEVELING_MARKER: &str = "; Software Leveling Applied";

/// Lines ending with this suffix bypass every filter verbatim
pub const NO_PROCESSING_SUFFIX: &str = "; NO_PROCESSING";

/// Kind of a G-Code line, as far as the stream filters are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind {
    /// `G0` / `G1` linear move
    Movement,
    /// `G4` dwell
    Dwell,
    /// `G28` home
    Home,
    /// `G29` firmware bed probe
    BedProbe,
    /// `M104` set extruder temperature
    SetExtruderTemp,
    /// `M109` set extruder temperature and wait
    WaitExtruderTemp,
    /// `M140` set bed temperature
    SetBedTemp,
    /// `M190` set bed temperature and wait
    WaitBedTemp,
    /// The [`LEVELING_MARKER`] comment
    LevelingMarker,
    /// Any other comment-only line
    Comment,
    /// Blank line
    Empty,
    /// Anything else
    Other,
}

impl LineKind {
    /// True for the blocking temperature commands (`M109`, `M190`)
    pub fn is_temperature_wait(self) -> bool {
        matches!(self, Self::WaitExtruderTemp | Self::WaitBedTemp)
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Movement => "movement",
            Self::Dwell => "dwell",
            Self::Home => "home",
            Self::BedProbe => "bed-probe",
            Self::SetExtruderTemp => "set-extruder-temp",
            Self::WaitExtruderTemp => "wait-extruder-temp",
            Self::SetBedTemp => "set-bed-temp",
            Self::WaitBedTemp => "wait-bed-temp",
            Self::LevelingMarker => "leveling-marker",
            Self::Comment => "comment",
            Self::Empty => "empty",
            Self::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A command word such as `G1` or `M109`
///
/// Leading zeros are not significant, so `G01` and `G1` compare equal.
/// Sub-codes (`G29.1`) are kept separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandWord {
    /// Upper-case command letter
    pub letter: char,
    /// Command number
    pub number: u32,
    /// Sub-code after a decimal point
    pub sub_code: Option<u32>,
}

impl CommandWord {
    /// Parse the command word at the start of `line`
    ///
    /// Returns the word and its byte span within `line`. Leading whitespace is
    /// skipped; the letter must be followed directly by at least one digit.
    pub fn parse(line: &str) -> Option<(Self, std::ops::Range<usize>)> {
        let start = line.len() - line.trim_start().len();
        let rest = &line[start..];
        let letter = rest.chars().next()?;
        if !letter.is_ascii_alphabetic() {
            return None;
        }

        let digits = leading_digits(&rest[1..]);
        if digits.is_empty() {
            return None;
        }
        let number = digits.parse().ok()?;
        let mut end = 1 + digits.len();

        let mut sub_code = None;
        if rest[end..].starts_with('.') {
            let sub = leading_digits(&rest[end + 1..]);
            if !sub.is_empty() {
                sub_code = sub.parse().ok();
                end += 1 + sub.len();
            }
        }

        let word = Self {
            letter: letter.to_ascii_uppercase(),
            number,
            sub_code,
        };
        Some((word, start..start + end))
    }

    fn is(&self, letter: char, number: u32) -> bool {
        self.letter == letter && self.number == number && self.sub_code.is_none()
    }
}

impl fmt::Display for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.number)?;
        if let Some(sub) = self.sub_code {
            write!(f, ".{}", sub)?;
        }
        Ok(())
    }
}

fn leading_digits(s: &str) -> &str {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    &s[..len]
}

/// Classify a single G-Code line
pub fn classify(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Empty;
    }
    if trimmed == LEVELING_MARKER {
        return LineKind::LevelingMarker;
    }
    if trimmed.starts_with(';') {
        return LineKind::Comment;
    }

    let Some((word, _)) = CommandWord::parse(trimmed) else {
        return LineKind::Other;
    };

    const TABLE: [(char, u32, LineKind); 9] = [
        ('G', 0, LineKind::Movement),
        ('G', 1, LineKind::Movement),
        ('G', 4, LineKind::Dwell),
        ('G', 28, LineKind::Home),
        ('G', 29, LineKind::BedProbe),
        ('M', 104, LineKind::SetExtruderTemp),
        ('M', 109, LineKind::WaitExtruderTemp),
        ('M', 140, LineKind::SetBedTemp),
        ('M', 190, LineKind::WaitBedTemp),
    ];

    TABLE
        .iter()
        .find(|(letter, number, _)| word.is(*letter, *number))
        .map_or(LineKind::Other, |(_, _, kind)| *kind)
}

/// True for `G0` / `G1` lines
pub fn is_movement(line: &str) -> bool {
    classify(line) == LineKind::Movement
}

/// True when the line carries the [`NO_PROCESSING_SUFFIX`]
pub fn has_no_processing_suffix(line: &str) -> bool {
    line.trim_end().ends_with(NO_PROCESSING_SUFFIX)
}

/// The dwell command emitted while polling a temperature wait
pub fn dwell_line(ms: u64) -> String {
    format!("G4 P{}", ms)
}

/// Replace the command word of `line` with `word`, keeping everything after it
///
/// Lines without a command word are returned unchanged.
pub fn replace_command_word(line: &str, word: &str) -> String {
    match CommandWord::parse(line) {
        Some((_, span)) => {
            let mut out = String::with_capacity(line.len() + word.len());
            out.push_str(&line[..span.start]);
            out.push_str(word);
            out.push_str(&line[span.end..]);
            out
        }
        None => line.to_string(),
    }
}
