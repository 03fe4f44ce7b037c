/*! A straight implementation of the DEFLATE decompressor as specified in RFC
1951 (https://tools.ietf.org/html/rfc1951).

Blocks are decoded by [`decoder::Inflater`], which pulls symbols out of the
bitstream through the block's Huffman trees and expands them into the output
window as it goes. */

pub mod codepoints;
pub mod decoder;
pub mod deflate_header;
pub mod default_data;

#[cfg(test)]
pub(crate) mod testing;

use num_enum::TryFromPrimitive;

/** Represents a compressed symbol in the DEFLATE stream: either a literal in
0-255, the end-of-block marker, or a <length, distance> pair.
*/
/* Implementor's note: These are not encoded naively, but instead
according to 3.2.5 of RFC 1951. Note that 3.2.5 only deals with the abstract
numbers needed to encode the codepoints: the actual binary representation of the
numbers is specified either according to 3.2.6 or the dynamic Huffman tree. */
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DeflateSym {
  EndOfBlock,
  Literal(u8),
  /// (length, distance)
  Backreference(u16, u16),
}

/// The BTYPE field of a block header. The fourth value, 0b11, is reserved.
#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive)]
#[repr(u8)]
pub enum BlockKind {
  Stored = 0b00,
  Fixed = 0b01,
  Dynamic = 0b10,
}

/// Options fixed at inflater construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InflateOptions {
  /// Log every block header and decoded symbol at `info` level, tagged with
  /// the bit position it was read at.
  pub explain: bool,
}
