//! Line sources at the bottom of a chain

use super::GcodeStream;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use printstream_core::Result;

/// Lines of an in-memory G-code program
#[derive(Debug, Clone, Default)]
pub struct StringLineSource {
    text: String,
    offset: usize,
    line_number: usize,
}

impl StringLineSource {
    /// Create a source over `text`
    ///
    /// Lines are split on `\n`; a trailing `\r` is stripped. A final newline
    /// does not produce an extra empty line.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            offset: 0,
            line_number: 0,
        }
    }
}

impl GcodeStream for StringLineSource {
    fn read_line(&mut self) -> Option<String> {
        if self.offset >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.offset..];
        let (line, consumed) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], idx + 1),
            None => (rest, rest.len()),
        };
        self.offset += consumed;
        self.line_number += 1;
        Some(line.strip_suffix('\r').unwrap_or(line).to_string())
    }

    fn debug_info(&self) -> String {
        format!("Source line {}", self.line_number)
    }
}

/// An owned list of lines
#[derive(Debug, Clone, Default)]
pub struct VecLineSource {
    lines: VecDeque<String>,
}

impl VecLineSource {
    /// Create a source yielding `lines` in order
    pub fn new<I, T>(lines: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of lines not yet read
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl GcodeStream for VecLineSource {
    fn read_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    fn debug_info(&self) -> String {
        format!("Source {} lines left", self.lines.len())
    }
}

/// Lines read incrementally from any buffered reader
///
/// A read error is logged and ends the stream; consumers of a stream never
/// see I/O errors.
#[derive(Debug)]
pub struct ReaderLineSource<R> {
    reader: R,
    line_number: usize,
    finished: bool,
}

/// Lines of a G-code file on disk
pub type FileLineSource = ReaderLineSource<BufReader<File>>;

impl<R: BufRead> ReaderLineSource<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            finished: false,
        }
    }

    /// Number of lines read so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl ReaderLineSource<BufReader<File>> {
    /// Open a G-code file
    ///
    /// Fails with [`printstream_core::Error::Io`] when the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        tracing::debug!("Streaming G-code from {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> GcodeStream for ReaderLineSource<R> {
    fn read_line(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        let mut buf = String::new();
        match self.reader.read_line(&mut buf) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => {
                self.line_number += 1;
                let trimmed = buf.trim_end_matches(['\n', '\r']).len();
                buf.truncate(trimmed);
                Some(buf)
            }
            Err(e) => {
                tracing::error!("Read failed after line {}: {}", self.line_number, e);
                self.finished = true;
                None
            }
        }
    }

    fn debug_info(&self) -> String {
        format!("Source line {}", self.line_number)
    }
}
