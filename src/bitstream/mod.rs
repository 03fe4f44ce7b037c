/*! Little-endian bit extraction on top of `bitstream_io`.

DEFLATE packs everything LSB-first. Integer fields are reassembled with the
first bit read as bit 0 of the value, while Huffman codes are consumed one bit
at a time starting from the root edge, so the reader exposes both a single-bit
read and an n-bit integer read. */

use std::io::Read;

use bitstream_io::{BitRead, LittleEndian};

use crate::deflate::decoder::DeflateReadError;

/// Widest integer field `read_bits_lsb` hands out.
pub const MAX_READ_BITS: u32 = 31;

pub struct BitReader<R: Read> {
  inner: bitstream_io::BitReader<R, LittleEndian>,
  position: u64,
}

impl<R: Read> BitReader<R> {
  pub fn new(src: R) -> Self {
    Self {
      inner: bitstream_io::BitReader::new(src),
      position: 0,
    }
  }

  /// Number of bits consumed so far.
  pub fn position(&self) -> u64 {
    self.position
  }

  pub fn is_byte_aligned(&self) -> bool {
    self.position % 8 == 0
  }

  pub fn read_bit(&mut self) -> Result<bool, DeflateReadError> {
    let bit = self.inner.read_bit()?;
    self.position += 1;
    Ok(bit)
  }

  /// Read `n` bits, the first one read becoming bit 0 of the result.
  pub fn read_bits_lsb(&mut self, n: u32) -> Result<u32, DeflateReadError> {
    if n > MAX_READ_BITS {
      return Err(DeflateReadError::TooManyBits(n));
    }
    if n == 0 {
      return Ok(0);
    }
    let value: u32 = self.inner.read(n)?;
    self.position += u64::from(n);
    Ok(value)
  }

  /// Discard whatever is left of the partially consumed byte. Returns the
  /// number of bits dropped.
  pub fn byte_align(&mut self) -> u8 {
    let dropped = ((8 - self.position % 8) % 8) as u8;
    self.inner.byte_align();
    self.position += u64::from(dropped);
    dropped
  }

  /// Fill `buf` with whole bytes. The reader must be byte aligned.
  pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), DeflateReadError> {
    debug_assert!(self.is_byte_aligned());
    self.inner.read_bytes(buf)?;
    self.position += 8 * buf.len() as u64;
    Ok(())
  }
}

/// Pack a string of '0'/'1' characters LSB-first, in reading order.
#[cfg(test)]
pub(crate) fn bits_from_str(bits: &str) -> Vec<u8> {
  let mut bytes = Vec::new();
  for (i, c) in bits.chars().filter(|c| *c == '0' || *c == '1').enumerate() {
    if i % 8 == 0 {
      bytes.push(0u8);
    }
    if c == '1' {
      *bytes.last_mut().unwrap() |= 1 << (i % 8);
    }
  }
  bytes
}
