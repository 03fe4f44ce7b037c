/*! Codepoints are used by RFC 1951 to encode distances and lengths. Each codepoint
consists of a value, encoded using the appropriate Huffman Tree, possibly followed
by a number of literal bits that are used to disambiguate the codepoint. */

/* The code table from RFC 1951 is reproduced below to avoid extra ALT-TABs

             Extra               Extra               Extra
        Code Bits Length(s) Code Bits Lengths   Code Bits Length(s)
        ---- ---- ------     ---- ---- -------   ---- ---- -------
         257   0     3       267   1   15,16     277   4   67-82
         258   0     4       268   1   17,18     278   4   83-98
         259   0     5       269   2   19-22     279   4   99-114
         260   0     6       270   2   23-26     280   4  115-130
         261   0     7       271   2   27-30     281   5  131-162
         262   0     8       272   2   31-34     282   5  163-194
         263   0     9       273   3   35-42     283   5  195-226
         264   0    10       274   3   43-50     284   5  227-257
         265   1  11,12      275   3   51-58     285   0    258
         266   1  13,14      276   3   59-66

              Extra           Extra               Extra
         Code Bits Dist  Code Bits   Dist     Code Bits Distance
         ---- ---- ----  ---- ----  ------    ---- ---- --------
           0   0    1     10   4     33-48    20    9   1025-1536
           1   0    2     11   4     49-64    21    9   1537-2048
           2   0    3     12   5     65-96    22   10   2049-3072
           3   0    4     13   5     97-128   23   10   3073-4096
           4   1   5,6    14   6    129-192   24   11   4097-6144
           5   1   7,8    15   6    193-256   25   11   6145-8192
           6   2   9-12   16   7    257-384   26   12  8193-12288
           7   2  13-16   17   7    385-512   27   12 12289-16384
           8   3  17-24   18   8    513-768   28   13 16385-24576
           9   3  25-32   19   8   769-1024   29   13 24577-32768
*/

use std::io::Read;

use lazy_static::lazy_static;

use super::DeflateSym;
use crate::bitstream::BitReader;
use crate::deflate::decoder::DeflateReadError;
use crate::huff_tree::HuffTree;

pub const MAX_DIST_CODE: u16 = 29;
pub const MIN_LENGTH_CODE: u16 = 257;
pub const MAX_LENGTH_CODE: u16 = 285;
pub const EOB_CODE: u16 = 256;

/// Base lengths of symbols 265-284, the ones carrying extra bits.
pub const LENGTH_BASE: [u16; 20] = [
  11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131, 163, 195, 227,
];

/// Smallest distances of symbols 4-29. The extra bits are added to these.
pub const DIST_BASE: [u16; 26] = [
  5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537, 2049, 3073,
  4097, 6145, 8193, 12289, 16385, 24577,
];

lazy_static! {
  pub static ref DEFAULT_CODEPOINTS: CodepointTable = CodepointTable::new();
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Codepoint {
  code: u16,
  nbits: u8,
  lo: u16,
  hi: u16,
}

impl Codepoint {
  pub fn new(code: u16, nbits: u8, lo: u16) -> Self {
    let range = if nbits == 0 { 0 } else { (1u16 << nbits) - 1 };
    Self {
      code,
      nbits,
      lo,
      hi: lo + range,
    }
  }

  pub fn code(&self) -> u16 {
    self.code
  }

  pub fn nbits(&self) -> u8 {
    self.nbits
  }

  /// Smallest and largest value this codepoint can carry.
  pub fn range(&self) -> (u16, u16) {
    (self.lo, self.hi)
  }

  /// Read the extra bits for this codepoint and add them to its base value.
  pub fn read_value_from_bitstream<R: Read>(
    &self,
    bit_src: &mut BitReader<R>,
  ) -> Result<u16, DeflateReadError> {
    let extra = bit_src.read_bits_lsb(self.nbits as u32)? as u16;
    Ok(self.lo + extra)
  }
}

pub struct CodepointTable {
  length_codepoints: Vec<Codepoint>,
  dist_codepoints: Vec<Codepoint>,
}

impl CodepointTable {
  pub fn new() -> Self {
    let mut len_pts = Vec::with_capacity(29);
    for code in MIN_LENGTH_CODE..=264 {
      len_pts.push(Codepoint::new(code, 0, code - 254));
    }
    for (i, &base) in LENGTH_BASE.iter().enumerate() {
      let code = 265 + i as u16;
      len_pts.push(Codepoint::new(code, ((code - 261) / 4) as u8, base));
    }
    len_pts.push(Codepoint::new(MAX_LENGTH_CODE, 0, 258));

    let mut dist_pts = Vec::with_capacity(30);
    for code in 0..=3 {
      dist_pts.push(Codepoint::new(code, 0, code + 1));
    }
    for (i, &base) in DIST_BASE.iter().enumerate() {
      let code = 4 + i as u16;
      dist_pts.push(Codepoint::new(code, ((code - 2) / 2) as u8, base));
    }

    Self {
      length_codepoints: len_pts,
      dist_codepoints: dist_pts,
    }
  }

  pub fn length_codepoint(&self, code: u16) -> Result<Codepoint, DeflateReadError> {
    if (MIN_LENGTH_CODE..=MAX_LENGTH_CODE).contains(&code) {
      Ok(self.length_codepoints[(code - MIN_LENGTH_CODE) as usize])
    } else {
      Err(DeflateReadError::InvalidLiteralSymbol(code))
    }
  }

  pub fn dist_codepoint(&self, code: u16) -> Result<Codepoint, DeflateReadError> {
    if code <= MAX_DIST_CODE {
      Ok(self.dist_codepoints[code as usize])
    } else {
      Err(DeflateReadError::InvalidDistanceSymbol(code))
    }
  }

  /// Read one full symbol: a literal, the end of block, or a length code
  /// together with the distance that must follow it.
  pub fn read_sym<R: Read>(
    &self,
    bit_src: &mut BitReader<R>,
    length_tree: &HuffTree,
    dist_tree: &HuffTree,
  ) -> Result<DeflateSym, DeflateReadError> {
    let code = length_tree.decode_symbol(bit_src)?;
    match code {
      0..=255 => Ok(DeflateSym::Literal(code as u8)),
      EOB_CODE => Ok(DeflateSym::EndOfBlock),
      _ => {
        let length = self.length_codepoint(code)?.read_value_from_bitstream(bit_src)?;
        let dist_code = dist_tree.decode_symbol(bit_src)?;
        let dist = self.dist_codepoint(dist_code)?.read_value_from_bitstream(bit_src)?;
        Ok(DeflateSym::Backreference(length, dist))
      }
    }
  }
}

impl Default for CodepointTable {
  fn default() -> Self {
    Self::new()
  }
}
