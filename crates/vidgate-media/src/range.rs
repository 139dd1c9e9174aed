//! `Range` header parsing.
//!
//! Only a single `bytes=start-[end]` range is understood. Anything else
//! parses to `None` and the caller serves the whole file.

/// An inclusive byte window within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes in the window.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// `Content-Range` value for a file of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// Parse a `Range` header against a file of `size` bytes.
///
/// An `end` past the last byte is clamped to it. Returns `None` for
/// suffix ranges, multi-range lists, units other than `bytes`, values
/// that are not decimal integers, and windows that do not overlap the
/// file.
pub fn parse_range(header: &str, size: u64) -> Option<ByteRange> {
    let (unit, ranges) = header.split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }
    if ranges.contains(',') {
        return None;
    }

    let (start, end) = ranges.split_once('-')?;
    let start = parse_position(start)?;
    if start >= size {
        return None;
    }

    let last = size - 1;
    let end = match end.trim() {
        "" => last,
        end => parse_position(end)?.min(last),
    };
    if start > end {
        return None;
    }

    Some(ByteRange { start, end })
}

fn parse_position(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
