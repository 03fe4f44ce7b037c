//! Hand-assembles DEFLATE streams bit by bit, for tests that need blocks no
//! real compressor would emit.

use bitstream_io::{BitWrite, BitWriter, LittleEndian};

use super::deflate_header::CODE_LENGTH_ORDER;
use super::default_data::{FIXED_DIST_TREE, FIXED_LITLEN_TREE};
use super::BlockKind;
use crate::huff_tree::HuffTree;

/// (symbol, extra bits, smallest value), copied from RFC 1951 section 3.2.5.
#[rustfmt::skip]
const RFC_LENGTHS: [(u16, u32, u16); 29] = [
  (257, 0, 3), (258, 0, 4), (259, 0, 5), (260, 0, 6), (261, 0, 7), (262, 0, 8),
  (263, 0, 9), (264, 0, 10), (265, 1, 11), (266, 1, 13), (267, 1, 15), (268, 1, 17),
  (269, 2, 19), (270, 2, 23), (271, 2, 27), (272, 2, 31), (273, 3, 35), (274, 3, 43),
  (275, 3, 51), (276, 3, 59), (277, 4, 67), (278, 4, 83), (279, 4, 99), (280, 4, 115),
  (281, 5, 131), (282, 5, 163), (283, 5, 195), (284, 5, 227), (285, 0, 258),
];

#[rustfmt::skip]
const RFC_DISTANCES: [(u16, u32, u16); 30] = [
  (0, 0, 1), (1, 0, 2), (2, 0, 3), (3, 0, 4), (4, 1, 5), (5, 1, 7),
  (6, 2, 9), (7, 2, 13), (8, 3, 17), (9, 3, 25), (10, 4, 33), (11, 4, 49),
  (12, 5, 65), (13, 5, 97), (14, 6, 129), (15, 6, 193), (16, 7, 257), (17, 7, 385),
  (18, 8, 513), (19, 8, 769), (20, 9, 1025), (21, 9, 1537), (22, 10, 2049),
  (23, 10, 3073), (24, 11, 4097), (25, 11, 6145), (26, 12, 8193), (27, 12, 12289),
  (28, 13, 16385), (29, 13, 24577),
];

/// The last row whose smallest value does not exceed `value`.
fn lookup(table: &[(u16, u32, u16)], value: u16) -> (u16, u32, u16) {
  *table
    .iter()
    .rev()
    .find(|&&(_, _, base)| base <= value)
    .unwrap_or_else(|| panic!("{} is below every row of the table", value))
}

pub struct StreamWriter {
  sink: BitWriter<Vec<u8>, LittleEndian>,
  last_hclen: u8,
}

impl StreamWriter {
  pub fn new() -> Self {
    Self {
      sink: BitWriter::new(Vec::new()),
      last_hclen: 0,
    }
  }

  /// Write the low `n` bits of `value`, least significant first.
  pub fn bits(&mut self, n: u32, value: u32) -> &mut Self {
    if n > 0 {
      self.sink.write(n, value).unwrap();
    }
    self
  }

  /// Write the code `tree` assigns to `symbol`, root edge first.
  pub fn sym(&mut self, tree: &HuffTree, symbol: u16) -> &mut Self {
    let (_, code) = tree
      .codes()
      .into_iter()
      .find(|(s, _)| *s == symbol)
      .unwrap_or_else(|| panic!("symbol {} is not in the tree", symbol));
    for bit in code.iter() {
      self.sink.write_bit(bit).unwrap();
    }
    self
  }

  pub fn block_header(&mut self, last: bool, kind: BlockKind) -> &mut Self {
    self.sink.write_bit(last).unwrap();
    self.bits(2, kind as u32)
  }

  /// A stored block: header, alignment, LEN, NLEN and the payload.
  pub fn stored_block(&mut self, last: bool, payload: &[u8]) -> &mut Self {
    self.block_header(last, BlockKind::Stored);
    self.sink.byte_align().unwrap();
    let len = payload.len() as u16;
    self.bits(16, len as u32).bits(16, !len as u32);
    self.sink.write_bytes(payload).unwrap();
    self
  }

  /// Write a length symbol and its extra bits, then the distance, with the
  /// given trees. Picks the shortest encoding, so 258 uses symbol 285.
  pub fn backref(
    &mut self,
    litlen: &HuffTree,
    dist: &HuffTree,
    length: u16,
    distance: u16,
  ) -> &mut Self {
    let (lsym, lbits, lbase) = lookup(&RFC_LENGTHS, length);
    self.sym(litlen, lsym).bits(lbits, (length - lbase) as u32);
    let (dsym, dbits, dbase) = lookup(&RFC_DISTANCES, distance);
    self.sym(dist, dsym).bits(dbits, (distance - dbase) as u32)
  }

  pub fn fixed_literal(&mut self, byte: u8) -> &mut Self {
    self.sym(&FIXED_LITLEN_TREE, byte as u16)
  }

  pub fn fixed_backref(&mut self, length: u16, distance: u16) -> &mut Self {
    self.backref(&FIXED_LITLEN_TREE, &FIXED_DIST_TREE, length, distance)
  }

  pub fn fixed_end(&mut self) -> &mut Self {
    self.sym(&FIXED_LITLEN_TREE, 256)
  }

  /// A whole fixed block made of literals.
  pub fn fixed_block(&mut self, last: bool, payload: &[u8]) -> &mut Self {
    self.block_header(last, BlockKind::Fixed);
    for &b in payload {
      self.fixed_literal(b);
    }
    self.fixed_end()
  }

  /// HLIT, HDIST, the smallest HCLEN covering `size_codes`, then the size
  /// codes themselves in transmission order.
  pub fn dynamic_preamble(&mut self, hlit: u8, hdist: u8, size_codes: &[u8; 19]) -> &mut Self {
    let used = CODE_LENGTH_ORDER
      .iter()
      .rposition(|&s| size_codes[s] != 0)
      .map(|i| i + 1)
      .unwrap_or(0)
      .max(4);
    let hclen = (used - 4) as u8;
    self.last_hclen = hclen;
    self.bits(5, hlit as u32).bits(5, hdist as u32).bits(4, hclen as u32);
    for &s in CODE_LENGTH_ORDER.iter().take(used) {
      self.bits(3, size_codes[s] as u32);
    }
    self
  }

  /// A full dynamic block header, with every length spelled out as a literal
  /// code length. Returns the trees the block's data must be written with.
  pub fn dynamic_header(
    &mut self,
    last: bool,
    litlen: &[u8],
    dist: &[u8],
  ) -> (HuffTree, HuffTree) {
    assert!(litlen.len() >= 257 && dist.len() >= 1);
    let mut size_codes = [0u8; 19];
    for &l in litlen.iter().chain(dist.iter()) {
      size_codes[l as usize] = 1;
    }
    // Give every used length the same width; 16 codes fit in four bits
    let used = size_codes.iter().filter(|&&x| x != 0).count();
    let width = match used {
      0..=2 => 1,
      3..=4 => 2,
      5..=8 => 3,
      _ => 4,
    };
    for x in size_codes.iter_mut().filter(|x| **x != 0) {
      *x = width;
    }
    // Pad to a complete code with lengths that never appear
    let mut missing = (1usize << width) - used;
    for i in 0..16 {
      if missing == 0 {
        break;
      }
      if size_codes[i] == 0 {
        size_codes[i] = width;
        missing -= 1;
      }
    }

    self.block_header(last, BlockKind::Dynamic);
    self.dynamic_preamble((litlen.len() - 257) as u8, (dist.len() - 1) as u8, &size_codes);
    let tree = HuffTree::from_lengths(&size_codes).unwrap();
    for &l in litlen.iter().chain(dist.iter()) {
      self.sym(&tree, l as u16);
    }
    (
      HuffTree::from_lengths(litlen).unwrap(),
      HuffTree::from_lengths(dist).unwrap(),
    )
  }

  pub fn hclen_written(&self) -> u8 {
    self.last_hclen
  }

  /// Pad the final byte with zero bits and hand back the stream.
  pub fn finish(&mut self) -> Vec<u8> {
    let mut sink = std::mem::replace(&mut self.sink, BitWriter::new(Vec::new()));
    sink.byte_align().unwrap();
    sink.into_writer()
  }
}
