/*! Run-length compaction of code-length vectors.

A code-length vector assigns every symbol of an alphabet a bit length. The
tree builder consumes it as a list of ranges: each range covers the symbols
after the previous range's `end`, up to and including its own `end`, and gives
them all the same length. */

/// All symbols in `(previous.end, end]` share `length`. The first range starts
/// at symbol 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleRange {
  pub end: usize,
  pub length: u8,
}

impl RleRange {
  pub fn new(end: usize, length: u8) -> Self {
    Self { end, length }
  }
}

/// Collapse runs of equal lengths into ranges.
pub fn runlength_encode(lengths: &[u8]) -> Vec<RleRange> {
  let mut ranges: Vec<RleRange> = Vec::new();
  for (i, &length) in lengths.iter().enumerate() {
    match ranges.last_mut() {
      Some(cur) if cur.length == length => cur.end = i,
      _ => ranges.push(RleRange::new(i, length)),
    }
  }
  ranges
}

/// Replay ranges back into the dense vector they came from.
pub fn runlength_expand(ranges: &[RleRange]) -> Vec<u8> {
  let mut lengths = Vec::with_capacity(ranges.last().map(|r| r.end + 1).unwrap_or(0));
  for range in ranges {
    while lengths.len() <= range.end {
      lengths.push(range.length);
    }
  }
  lengths
}
