/*! A Huffman tree implementation designed for decoding DEFLATE-style codes.

Huffman trees in DEFLATE carry additional constraints:
 - Symbols with the same length are assigned consecutive codes in symbol order
 - Shorter codes lexicographically precede longer codes.

This makes it possible to specify a huffman tree by simply specifying the code
length for each symbol, which is how both the fixed and the dynamic trees of
RFC 1951 are transmitted.

The tree lives in a flat arena. Node 0 is the root; a child index of 0 means
"no child", which is unambiguous because the root is nobody's child.
*/

pub mod rle;

use std::io::Read;

use bit_vec::BitVec;

use crate::bitstream::BitReader;
use crate::deflate::decoder::DeflateReadError;

pub use rle::{runlength_encode, runlength_expand, RleRange};

pub const MAX_CODE_LENGTH: u8 = 15;

/// Symbol slot of internal nodes.
const NON_LEAF: u16 = u16::MAX;
const NO_CHILD: u32 = 0;

/// One symbol's canonical code. `code` holds `length` significant bits, the
/// most significant of which is the edge taken from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalCode {
  pub symbol: u16,
  pub code: u16,
  pub length: u8,
}

/// Convert the lower `nbits` bits of `source` into a bitvector, root edge first
fn to_bitvec(nbits: u8, source: u16) -> BitVec {
  let mut v = BitVec::with_capacity(nbits as usize);
  for i in (0..nbits).rev() {
    v.push((source >> i) & 1 == 1);
  }
  v
}

/// Given the code lengths as ranges, compute the canonical huffman code for
/// every symbol with a nonzero length, in symbol order.
pub fn canonical_codes(ranges: &[RleRange]) -> Result<Vec<CanonicalCode>, DeflateReadError> {
  // Count the number of symbols with a given codelength
  let mut bl_count = [0usize; MAX_CODE_LENGTH as usize + 1];
  let mut previous_end: Option<usize> = None;
  for range in ranges {
    if range.length > MAX_CODE_LENGTH {
      return Err(DeflateReadError::CodeLengthOutOfRange(range.length));
    }
    let span = match previous_end {
      Some(previous) if range.end <= previous => {
        return Err(DeflateReadError::NonIncreasingRange {
          previous,
          end: range.end,
        })
      }
      Some(previous) => range.end - previous,
      None => range.end + 1,
    };
    bl_count[range.length as usize] += span;
    previous_end = Some(range.end);
  }
  if let Some(last) = previous_end {
    if last >= NON_LEAF as usize {
      return Err(DeflateReadError::AlphabetOverflow {
        declared: NON_LEAF as usize,
        decoded: last + 1,
      });
    }
  }
  // Absent symbols take no part in the code
  bl_count[0] = 0;
  let max_bits = ranges.iter().map(|r| r.length).max().unwrap_or(0) as usize;

  // Every length level can hold at most what the previous levels left free
  let mut left = 1i64;
  for (bits, &count) in bl_count.iter().enumerate().take(max_bits + 1).skip(1) {
    left = (left << 1) - count as i64;
    if left < 0 {
      return Err(DeflateReadError::OverSubscribedCode(bits as u8));
    }
  }

  // Compute the smallest code for each codelength
  let mut next_code = [0u16; MAX_CODE_LENGTH as usize + 1];
  let mut code = 0u16;
  for bits in 1..=max_bits {
    code = (code + bl_count[bits - 1] as u16) << 1;
    next_code[bits] = code;
  }

  let mut result = Vec::new();
  let mut start = 0usize;
  for range in ranges {
    if range.length != 0 {
      let len = range.length as usize;
      for symbol in start..=range.end {
        result.push(CanonicalCode {
          // Bounded by the NON_LEAF check above
          symbol: symbol as u16,
          code: next_code[len],
          length: range.length,
        });
        next_code[len] += 1;
      }
    }
    start = range.end + 1;
  }
  Ok(result)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
  symbol: u16,
  children: [u32; 2],
}

impl Node {
  fn internal() -> Self {
    Self {
      symbol: NON_LEAF,
      children: [NO_CHILD; 2],
    }
  }

  fn is_leaf(&self) -> bool {
    self.symbol != NON_LEAF
  }
}

/// A canonical prefix-code decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffTree {
  nodes: Vec<Node>,
  num_symbols: usize,
  max_length: u8,
}

impl HuffTree {
  /// Build the decoding tree for a code given as length ranges.
  ///
  /// An incomplete code is only accepted when it has at most one symbol: RFC
  /// 1951 permits a lone distance code of length 1, and an alphabet with no
  /// symbols at all (a block made only of literals).
  pub fn from_ranges(ranges: &[RleRange]) -> Result<Self, DeflateReadError> {
    let codes = canonical_codes(ranges)?;
    let max_length = codes.iter().map(|c| c.length).max().unwrap_or(0);

    let capacity: u64 = codes.iter().map(|c| 1u64 << (max_length - c.length)).sum();
    if codes.len() > 1 && capacity < (1u64 << max_length) {
      return Err(DeflateReadError::IncompleteCode);
    }

    let mut tree = Self {
      nodes: Vec::with_capacity(2 * codes.len() + 1),
      num_symbols: codes.len(),
      max_length,
    };
    tree.nodes.push(Node::internal());
    for code in codes.iter() {
      tree.insert(code)?;
    }
    Ok(tree)
  }

  /// Build the decoding tree from a dense code-length vector.
  pub fn from_lengths(lengths: &[u8]) -> Result<Self, DeflateReadError> {
    Self::from_ranges(&runlength_encode(lengths))
  }

  fn insert(&mut self, code: &CanonicalCode) -> Result<(), DeflateReadError> {
    let mut node = 0usize;
    for bit_index in (0..code.length).rev() {
      if self.nodes[node].is_leaf() {
        return Err(DeflateReadError::OverSubscribedCode(code.length));
      }
      let bit = ((code.code >> bit_index) & 1) as usize;
      let child = self.nodes[node].children[bit];
      node = if child == NO_CHILD {
        let fresh = self.nodes.len();
        self.nodes.push(Node::internal());
        self.nodes[node].children[bit] = fresh as u32;
        fresh
      } else {
        child as usize
      };
    }

    let leaf = &mut self.nodes[node];
    if leaf.is_leaf() || leaf.children != [NO_CHILD; 2] {
      return Err(DeflateReadError::OverSubscribedCode(code.length));
    }
    leaf.symbol = code.symbol;
    Ok(())
  }

  /// Walk from the root one bit per edge until a leaf is reached.
  pub fn decode_symbol<R: Read>(
    &self,
    bit_src: &mut BitReader<R>,
  ) -> Result<u16, DeflateReadError> {
    let mut node = &self.nodes[0];
    if node.children == [NO_CHILD; 2] {
      return Err(DeflateReadError::InvalidHuffmanPath);
    }
    while !node.is_leaf() {
      let bit = bit_src.read_bit()? as usize;
      match node.children[bit] {
        NO_CHILD => return Err(DeflateReadError::InvalidHuffmanPath),
        child => node = &self.nodes[child as usize],
      }
    }
    Ok(node.symbol)
  }

  /// Every leaf with the path leading to it, ordered by symbol.
  pub fn codes(&self) -> Vec<(u16, BitVec)> {
    let mut out = Vec::with_capacity(self.num_symbols);
    let mut stack = vec![(0usize, 0u16, 0u8)];
    while let Some((index, code, depth)) = stack.pop() {
      let node = &self.nodes[index];
      if node.is_leaf() {
        out.push((node.symbol, to_bitvec(depth, code)));
        continue;
      }
      for (bit, &child) in node.children.iter().enumerate() {
        if child != NO_CHILD {
          stack.push((child as usize, (code << 1) | bit as u16, depth + 1));
        }
      }
    }
    out.sort_by_key(|(symbol, _)| *symbol);
    out
  }

  pub fn num_symbols(&self) -> usize {
    self.num_symbols
  }

  pub fn max_length(&self) -> u8 {
    self.max_length
  }

  pub fn is_empty(&self) -> bool {
    self.num_symbols == 0
  }
}
