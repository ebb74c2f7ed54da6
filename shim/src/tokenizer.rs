//! Command line tokenizer
//!
//! Splits a flat command line on the ASCII space character. Runs of spaces are
//! coalesced and leading/trailing spaces are skipped, so no token is ever empty.
//! Tabs and other whitespace are token content.

use crate::error::{Result, ShimError};
use std::ops::Range;

/// Token delimiter
pub const DELIMITER: u8 = b' ';

/// Default upper bound on the number of arguments handed to the tool
pub const MAX_ARGS: usize = 255;

/// Iterator over the byte ranges of tokens in a buffer
#[derive(Debug, Clone)]
pub struct Spans<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Iterator for Spans<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.bytes[self.pos..];
        let skip = rest.iter().position(|&b| b != DELIMITER)?;
        let start = self.pos + skip;
        let len = self.bytes[start..]
            .iter()
            .position(|&b| b == DELIMITER)
            .unwrap_or(self.bytes.len() - start);
        let end = start + len;
        self.pos = end;
        Some(start..end)
    }
}

/// Token ranges of `bytes`, in order
pub fn spans(bytes: &[u8]) -> Spans<'_> {
    Spans { bytes, pos: 0 }
}

/// Split `line` into all of its tokens
pub fn tokenize(line: &str) -> Vec<&str> {
    spans(line.as_bytes()).map(|r| &line[r]).collect()
}

/// Split `line`, keeping at most `max` tokens. Excess tokens are dropped.
pub fn tokenize_bounded(line: &str, max: usize) -> Vec<&str> {
    spans(line.as_bytes())
        .take(max)
        .map(|r| &line[r])
        .collect()
}

/// Split raw bytes into all of their tokens. Any byte other than the
/// delimiter is token content, whatever the encoding.
pub fn tokenize_bytes(bytes: &[u8]) -> Vec<&[u8]> {
    spans(bytes).map(|r| &bytes[r]).collect()
}

/// Split `line`, failing if it holds more than `max` tokens
pub fn tokenize_strict(line: &str, max: usize) -> Result<Vec<&str>> {
    let tokens = tokenize(line);
    check_bound(tokens.len(), max)?;
    Ok(tokens)
}

/// Byte-level [`tokenize_strict`]
pub fn tokenize_bytes_strict(bytes: &[u8], max: usize) -> Result<Vec<&[u8]>> {
    let tokens = tokenize_bytes(bytes);
    check_bound(tokens.len(), max)?;
    Ok(tokens)
}

fn check_bound(count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(ShimError::TooManyArguments { count, max });
    }
    Ok(())
}

/// Destructively split `buf` in place, keeping at most `max` tokens.
///
/// The delimiter that ends each returned token is overwritten with NUL so every
/// token becomes an independent C string when `buf` is NUL-terminated. Returns
/// the start offset of each token. `buf` must not contain the terminator itself.
pub fn tokenize_in_place(buf: &mut [u8], max: usize) -> Vec<usize> {
    let ranges: Vec<Range<usize>> = spans(buf).take(max).collect();
    for r in &ranges {
        if r.end < buf.len() {
            buf[r.end] = 0;
        }
    }
    ranges.into_iter().map(|r| r.start).collect()
}
