/*! A dynamically-encoded DEFLATE block is preceded by a header which
contains the following information:

  - 5 bits: HLIT, # of length/literal codes - 257
  - 5 bits: HDIST, # of distance codes - 1
  - 4 bits: HCLEN, # of Code Length codes - 4
  - (HCLEN + 4) * 3 bits of code lengths for the code alphabet specified by HCLEN,
    given in the order 16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15

  HLIT + 257 code lengths, encoded using the code length alphabet
  HDIST + 1 distance lengths, encoded with the code length alphabet

The two sequences of lengths are decoded as one: a repeat opcode may carry
over from the last literal/length entry into the first distance entries.
*/

/* From RFC 1951:

          16: Copy the previous code length 3 - 6 times.
              The next 2 bits indicate repeat length
                    (0 = 3, ... , 3 = 6)
          17: Repeat a code length of 0 for 3 - 10 times.
              (3 bits of length)
          18: Repeat a code length of 0 for 11 - 138 times
              (7 bits of length)
*/

use std::io::Read;

use crate::bitstream::BitReader;
use crate::deflate::decoder::DeflateReadError;
use crate::huff_tree::HuffTree;

pub const CODE_LENGTH_ORDER: [usize; 19] =
  [16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15];

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CodeLengthCodepoint {
  Length(u8),       // A Number of bits, 0-15
  ValueRepeat(u8),  // Valid values: 3-6
  ShortZeroRep(u8), // Valid values: 3-10
  LongZeroRep(u8),  // Valid values: 11-138
}

impl CodeLengthCodepoint {
  fn read_from_bitstream<R: Read>(
    bit_src: &mut BitReader<R>,
    codelength_tree: &HuffTree,
  ) -> Result<Self, DeflateReadError> {
    let codept = codelength_tree.decode_symbol(bit_src)?;
    let res = match codept {
      0..=15 => Self::Length(codept as u8),
      16 => Self::ValueRepeat(3 + bit_src.read_bits_lsb(2)? as u8),
      17 => Self::ShortZeroRep(3 + bit_src.read_bits_lsb(3)? as u8),
      18 => Self::LongZeroRep(11 + bit_src.read_bits_lsb(7)? as u8),
      // The code length tree is built from 19 entries
      _ => return Err(DeflateReadError::CodeLengthOutOfRange(codept as u8)),
    };
    Ok(res)
  }
}

/// Everything a dynamic block declares before its compressed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicHeader {
  pub hlit: u8,
  pub hdist: u8,
  pub hclen: u8,
  /// Lengths of the code length alphabet, indexed by symbol
  pub size_codes: [u8; 19],
  pub litlen_lengths: Vec<u8>,
  pub dist_lengths: Vec<u8>,
}

impl DynamicHeader {
  pub fn num_literals(&self) -> usize {
    257 + self.hlit as usize
  }

  pub fn num_distances(&self) -> usize {
    1 + self.hdist as usize
  }

  /// Build the literal/length and distance trees this header describes.
  pub fn trees(&self) -> Result<(HuffTree, HuffTree), DeflateReadError> {
    let litlen = HuffTree::from_lengths(&self.litlen_lengths)?;
    let dist = HuffTree::from_lengths(&self.dist_lengths)?;
    Ok((litlen, dist))
  }
}

/// Read a DEFLATE dynamic header from the stream, up to the first symbol of
/// compressed data.
pub fn read_header<R: Read>(bit_src: &mut BitReader<R>) -> Result<DynamicHeader, DeflateReadError> {
  let hlit = bit_src.read_bits_lsb(5)? as u8;
  let hdist = bit_src.read_bits_lsb(5)? as u8;
  let hclen = bit_src.read_bits_lsb(4)? as u8;
  log::debug!("hlit: {}, hdist: {}, hclen: {}", hlit, hdist, hclen);

  let size_codes = read_size_codes(bit_src, hclen as usize + 4)?;
  log::debug!("size codes: {:?}", size_codes);
  let size_code_tree = HuffTree::from_lengths(&size_codes)?;

  let num_literals = 257 + hlit as usize;
  let num_dists = 1 + hdist as usize;
  let mut lengths = decode_alphabet_lengths(bit_src, &size_code_tree, num_literals + num_dists)?;
  let dist_lengths = lengths.split_off(num_literals);

  Ok(DynamicHeader {
    hlit,
    hdist,
    hclen,
    size_codes,
    litlen_lengths: lengths,
    dist_lengths,
  })
}

/// Unpack the HCLEN + 4 three-bit lengths of the code length alphabet. The
/// ones not transmitted are zero.
pub fn read_size_codes<R: Read>(
  bit_src: &mut BitReader<R>,
  num_codes: usize,
) -> Result<[u8; 19], DeflateReadError> {
  let mut lengths = [0u8; 19];
  for &symbol in CODE_LENGTH_ORDER.iter().take(num_codes) {
    lengths[symbol] = bit_src.read_bits_lsb(3)? as u8;
  }
  Ok(lengths)
}

/// Decode exactly `total` code lengths with the code length alphabet.
pub fn decode_alphabet_lengths<R: Read>(
  bit_src: &mut BitReader<R>,
  size_huffman: &HuffTree,
  total: usize,
) -> Result<Vec<u8>, DeflateReadError> {
  let mut lengths = Vec::with_capacity(total);
  while lengths.len() < total {
    let (value, count) = match CodeLengthCodepoint::read_from_bitstream(bit_src, size_huffman)? {
      CodeLengthCodepoint::Length(n) => (n, 1),
      CodeLengthCodepoint::ValueRepeat(rep) => match lengths.last() {
        Some(&prev) => (prev, rep),
        None => return Err(DeflateReadError::RepeatWithoutPredecessor),
      },
      CodeLengthCodepoint::ShortZeroRep(rep) | CodeLengthCodepoint::LongZeroRep(rep) => (0, rep),
    };
    let decoded = lengths.len() + count as usize;
    if decoded > total {
      return Err(DeflateReadError::AlphabetOverflow {
        declared: total,
        decoded,
      });
    }
    lengths.resize(decoded, value);
  }
  Ok(lengths)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bitstream::bits_from_str;
  use crate::huff_tree::RleRange;

  fn code_length_tree() -> HuffTree {
    HuffTree::from_lengths(&[3, 0, 0, 0, 4, 4, 3, 2, 3, 3, 4, 5, 0, 0, 0, 0, 6, 7, 7]).unwrap()
  }

  #[test]
  fn size_codes_in_permutation_order() {
    /*
      110 111 111 011 011 010 011 011 100 100 101 100
      16  17  18  0   8   7   9   6   10  5   11  4
      6   7   7   3   3   2   3   3   4   4   5   4
    */
    let data = [0b11_111_110u8, 0b0_011_011_1, 0b011_011_01, 0b01_100_100, 0b100_1];
    let mut bits = BitReader::new(&data[..]);
    let lengths = read_size_codes(&mut bits, 8 + 4).unwrap();
    assert_eq!(
      lengths,
      [3, 0, 0, 0, 4, 4, 3, 2, 3, 3, 4, 5, 0, 0, 0, 0, 6, 7, 7]
    );
    assert_eq!(bits.position(), 36);
  }

  #[test]
  fn alphabet_lengths_with_repeats() {
    /*
      1111110 111      17, ten zeros
      00               7
      1111111 0101000  18, twenty-one zeros
      1101 101 100     5, 9, 8
      1110             10
    */
    let data = bits_from_str("1111110111001111111010100011011011001110");
    let mut bits = BitReader::new(&data[..]);
    let lengths = decode_alphabet_lengths(&mut bits, &code_length_tree(), 36).unwrap();
    let mut expected = vec![0u8; 10];
    expected.push(7);
    expected.extend(vec![0u8; 21]);
    expected.extend(vec![5, 9, 8, 10]);
    assert_eq!(lengths, expected);
  }

  #[test]
  fn repeat_needs_a_previous_length() {
    // 16 first, then its two extra bits
    let data = bits_from_str("111110 00");
    let mut bits = BitReader::new(&data[..]);
    assert!(matches!(
      decode_alphabet_lengths(&mut bits, &code_length_tree(), 20),
      Err(DeflateReadError::RepeatWithoutPredecessor)
    ));
  }

  #[test]
  fn repeat_past_declared_size() {
    // 17 with ten zeros, but only eight lengths declared
    let data = bits_from_str("1111110 111");
    let mut bits = BitReader::new(&data[..]);
    assert!(matches!(
      decode_alphabet_lengths(&mut bits, &code_length_tree(), 8),
      Err(DeflateReadError::AlphabetOverflow {
        declared: 8,
        decoded: 10
      })
    ));
  }

  #[test]
  fn repeat_spans_litlen_and_dist() {
    use crate::deflate::testing::StreamWriter;

    // 256 zeros, symbol 256 at length 1, then a repeat of 1 that covers
    // literal 257 and both distance codes.
    let mut w = StreamWriter::new();
    let size_codes = [2u8, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 2];
    w.dynamic_preamble(1, 1, &size_codes);
    let tree = HuffTree::from_lengths(&size_codes).unwrap();
    w.sym(&tree, 18).bits(7, 138 - 11);
    w.sym(&tree, 18).bits(7, 118 - 11);
    w.sym(&tree, 1);
    w.sym(&tree, 16).bits(2, 0);
    let data = w.finish();

    let mut bits = BitReader::new(&data[..]);
    let header = read_header(&mut bits).unwrap();
    assert_eq!(header.num_literals(), 258);
    assert_eq!(header.num_distances(), 2);
    assert_eq!(header.litlen_lengths.len(), 258);
    assert_eq!(&header.litlen_lengths[255..], &[0, 1, 1]);
    assert_eq!(header.dist_lengths, vec![1, 1]);
    let (litlen, dist) = header.trees().unwrap();
    assert_eq!(litlen.num_symbols(), 2);
    assert_eq!(dist.num_symbols(), 2);
  }

  #[test]
  fn hclen_extremes() {
    use crate::deflate::testing::StreamWriter;

    // HCLEN = 0: only 16, 17, 18 and 0 can be given lengths
    let mut w = StreamWriter::new();
    let mut size_codes = [0u8; 19];
    size_codes[0] = 1;
    size_codes[18] = 1;
    w.dynamic_preamble(0, 0, &size_codes);
    let tree = HuffTree::from_lengths(&size_codes).unwrap();
    w.sym(&tree, 18).bits(7, 127).sym(&tree, 18).bits(7, 120 - 11);
    let data = w.finish();
    let mut bits = BitReader::new(&data[..]);
    let header = read_header(&mut bits).unwrap();
    assert_eq!(header.hclen, 0);
    assert!(header.litlen_lengths.iter().all(|&l| l == 0));
    assert!(header.trees().unwrap().0.is_empty());

    // HCLEN = 15: 15 is the last symbol in the order
    let mut w = StreamWriter::new();
    let mut size_codes = [0u8; 19];
    size_codes[8] = 2;
    size_codes[15] = 2;
    size_codes[17] = 2;
    size_codes[18] = 2;
    w.dynamic_preamble(0, 0, &size_codes);
    assert_eq!(w.hclen_written(), 15);
    let tree = HuffTree::from_lengths(&size_codes).unwrap();
    w.sym(&tree, 8).sym(&tree, 8);
    w.sym(&tree, 18).bits(7, 138 - 11);
    w.sym(&tree, 18).bits(7, 116 - 11);
    w.sym(&tree, 15).sym(&tree, 15);
    let data = w.finish();
    let mut bits = BitReader::new(&data[..]);
    let header = read_header(&mut bits).unwrap();
    assert_eq!(header.hclen, 15);
    assert_eq!(header.size_codes, size_codes);
    assert_eq!(&header.litlen_lengths[..3], &[8, 8, 0]);
    assert_eq!(header.litlen_lengths[256], 15);
    assert_eq!(header.dist_lengths, vec![15]);
  }

  #[test]
  fn hlit_hdist_extremes() {
    use crate::deflate::testing::StreamWriter;

    for &(hlit, hdist) in [(0u8, 0u8), (29, 29), (0, 29), (29, 0)].iter() {
      let num_lit = 257 + hlit as usize;
      let num_dist = 1 + hdist as usize;
      // Not complete codes for most sizes, so only the header is checked
      let mut lengths = vec![9u8; num_lit];
      lengths.extend(vec![5u8; num_dist]);

      let mut w = StreamWriter::new();
      let mut size_codes = [0u8; 19];
      size_codes[9] = 1;
      size_codes[5] = 1;
      w.dynamic_preamble(hlit, hdist, &size_codes);
      let tree = HuffTree::from_lengths(&size_codes).unwrap();
      for &l in lengths.iter() {
        w.sym(&tree, l as u16);
      }
      let data = w.finish();

      let mut bits = BitReader::new(&data[..]);
      let header = read_header(&mut bits).unwrap();
      assert_eq!(header.litlen_lengths, vec![9u8; num_lit]);
      assert_eq!(header.dist_lengths, vec![5u8; num_dist]);
      assert_eq!(header.hlit, hlit);
      assert_eq!(header.hdist, hdist);
    }
  }

  #[test]
  fn scenario_code_length_alphabet() {
    use crate::deflate::testing::StreamWriter;

    let size_codes = [3u8, 0, 0, 0, 4, 4, 3, 2, 3, 3, 4, 5, 0, 0, 0, 0, 6, 7, 7];
    let mut w = StreamWriter::new();
    w.dynamic_preamble(0, 0, &size_codes);
    assert_eq!(w.hclen_written(), 8);
    let data = w.finish();
    let mut bits = BitReader::new(&data[..]);
    bits.read_bits_lsb(14).unwrap();
    let lengths = read_size_codes(&mut bits, 12).unwrap();
    assert_eq!(lengths, size_codes);
    assert_eq!(
      crate::huff_tree::runlength_encode(&lengths),
      vec![
        RleRange::new(0, 3),
        RleRange::new(3, 0),
        RleRange::new(5, 4),
        RleRange::new(6, 3),
        RleRange::new(7, 2),
        RleRange::new(9, 3),
        RleRange::new(10, 4),
        RleRange::new(11, 5),
        RleRange::new(15, 0),
        RleRange::new(16, 6),
        RleRange::new(18, 7),
      ]
    );
  }
}
