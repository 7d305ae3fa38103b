//! Bounded line reading

use std::io;
use std::io::BufRead;

/// Most content characters a source line may carry
pub const MAX_LINE_LEN: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Eof,
    Ok,
    TooLong,
}

/// Reads one logical line at a time, bounded by [MAX_LINE_LEN].
/// An overlong line is truncated and reported as [LineStatus::TooLong];
/// the remainder is consumed so the next call starts on a fresh line.
pub struct LineReader<R: BufRead> {
    inner: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        LineReader { inner }
    }

    pub fn read_line(&mut self, line: &mut String) -> io::Result<LineStatus> {
        line.clear();

        let mut bytes = Vec::new();
        if self.inner.read_until(b'\n', &mut bytes)? == 0 {
            return Ok(LineStatus::Eof);
        }
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }

        line.push_str(&String::from_utf8_lossy(&bytes));
        if line.chars().count() > MAX_LINE_LEN {
            *line = line.chars().take(MAX_LINE_LEN).collect();
            return Ok(LineStatus::TooLong);
        }
        Ok(LineStatus::Ok)
    }
}

/// A line whose first non-whitespace character is `;`, or which has
/// no content at all, is discarded before lexing
pub fn is_comment_or_blank(line: &str) -> bool {
    match line.trim_start_matches([' ', '\t']).chars().next() {
        None => true,
        Some(ch) => ch == ';',
    }
}
