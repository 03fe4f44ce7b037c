use super::codepoints::DEFAULT_CODEPOINTS;
use super::default_data::{FIXED_DIST_TREE, FIXED_LITLEN_TREE};
use super::deflate_header::read_header;
use super::{BlockKind, DeflateSym, InflateOptions};
use crate::bitstream::BitReader;
use crate::huff_tree::HuffTree;
use crate::sliding_window::SlidingWindow;

use std::borrow::Cow;
use std::convert::TryFrom;
use std::io::Read;

use thiserror::Error;

/// Log at `info` level, but only when the inflater was asked to explain itself.
macro_rules! explain {
  ($opts:expr, $($arg:tt)*) => {
    if $opts.explain {
      log::info!($($arg)*)
    }
  }
}

#[derive(Error, Debug)]
pub enum DeflateReadError {
  #[error("Unexpected end of DEFLATE data")]
  UnexpectedEnd,
  #[error("Cannot read {0} bits as one field (at most 31)")]
  TooManyBits(u32),
  #[error("Block header uses the reserved block type 0b11")]
  ReservedBlockType,
  #[error("The LEN and NLEN fields of a stored block mismatched: {len:#06x}, {nlen:#06x}")]
  StoredLengthMismatch { len: u16, nlen: u16 },
  #[error("Code length ranges must strictly increase, but {end} follows {previous}")]
  NonIncreasingRange { previous: usize, end: usize },
  #[error("Code lengths oversubscribe the code space at length {0}")]
  OverSubscribedCode(u8),
  #[error("Code lengths leave part of the code space unused")]
  IncompleteCode,
  #[error("Bitstream took a path with no symbol in the Huffman tree")]
  InvalidHuffmanPath,
  #[error("Code length repeat (16) with no previous length to repeat")]
  RepeatWithoutPredecessor,
  #[error("Header declared {declared} code lengths but repeats produced {decoded}")]
  AlphabetOverflow { declared: usize, decoded: usize },
  #[error("Invalid literal/length symbol {0}")]
  InvalidLiteralSymbol(u16),
  #[error("Invalid distance symbol {0}")]
  InvalidDistanceSymbol(u16),
  #[error("Tried to go back {distance} bytes, but only {available} are available")]
  DistanceTooFar { distance: u16, available: usize },
  #[error("Code length {0} is longer than 15 bits")]
  CodeLengthOutOfRange(u8),
  #[error("Other IO error: {0}")]
  IOError(#[source] std::io::Error),
}

impl From<std::io::Error> for DeflateReadError {
  fn from(e: std::io::Error) -> Self {
    match e.kind() {
      std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEnd,
      _ => Self::IOError(e),
    }
  }
}

/// The trees a compressed block is decoded with. Fixed blocks borrow the
/// process-wide trees, dynamic blocks own theirs until the block ends.
struct BlockCodes {
  litlen: Cow<'static, HuffTree>,
  dist: Cow<'static, HuffTree>,
}

impl BlockCodes {
  fn fixed() -> Self {
    Self {
      litlen: Cow::Borrowed(&*FIXED_LITLEN_TREE),
      dist: Cow::Borrowed(&*FIXED_DIST_TREE),
    }
  }

  fn dynamic<R: Read>(bit_src: &mut BitReader<R>) -> Result<Self, DeflateReadError> {
    let header = read_header(bit_src)?;
    let (litlen, dist) = header.trees()?;
    log::debug!(
      "dynamic block: {} literal/length codes, {} distance codes",
      litlen.num_symbols(),
      dist.num_symbols()
    );
    Ok(Self {
      litlen: Cow::Owned(litlen),
      dist: Cow::Owned(dist),
    })
  }
}

/** Decodes one DEFLATE stream. The inflater owns the bit source and the
output; blocks are pulled one at a time with [`Inflater::inflate_block`] or
all at once with [`Inflater::inflate_to_end`]. After an error the output
decoded so far stays readable, but should not be trusted.
*/
pub struct Inflater<R: Read> {
  bit_src: BitReader<R>,
  window: SlidingWindow,
  options: InflateOptions,
  blocks: usize,
  finished: bool,
}

impl<R: Read> Inflater<R> {
  pub fn new(src: R) -> Self {
    Self::with_options(src, InflateOptions::default())
  }

  pub fn with_options(src: R, options: InflateOptions) -> Self {
    Self {
      bit_src: BitReader::new(src),
      window: SlidingWindow::new(),
      options,
      blocks: 0,
      finished: false,
    }
  }

  /// Decode one block. Returns whether it was the final block of the stream.
  pub fn inflate_block(&mut self) -> Result<bool, DeflateReadError> {
    let start = self.bit_src.position();
    let bfinal = self.bit_src.read_bit()?;
    let btype = self.bit_src.read_bits_lsb(2)? as u8;
    let kind = BlockKind::try_from(btype).map_err(|_| DeflateReadError::ReservedBlockType)?;
    log::debug!("block {}: final = {}, type = {:?}", self.blocks, bfinal, kind);
    explain!(
      self.options,
      "[bit {}] block {} header: final = {}, type = {:?}",
      start,
      self.blocks,
      bfinal,
      kind
    );

    match kind {
      BlockKind::Stored => self.stored_block()?,
      BlockKind::Fixed => self.compressed_block(BlockCodes::fixed())?,
      BlockKind::Dynamic => {
        let codes = BlockCodes::dynamic(&mut self.bit_src)?;
        self.compressed_block(codes)?
      }
    }

    self.blocks += 1;
    self.finished = bfinal;
    Ok(bfinal)
  }

  /// Decode blocks until the final one completes.
  pub fn inflate_to_end(&mut self) -> Result<(), DeflateReadError> {
    while !self.finished {
      self.inflate_block()?;
    }
    log::debug!(
      "inflated {} bytes from {} blocks ({} bits)",
      self.window.len(),
      self.blocks,
      self.bit_src.position()
    );
    Ok(())
  }

  fn stored_block(&mut self) -> Result<(), DeflateReadError> {
    // According to 1951, we need to skip any remaining bits in the partial byte
    self.bit_src.byte_align();
    let len = self.bit_src.read_bits_lsb(16)? as u16;
    let nlen = self.bit_src.read_bits_lsb(16)? as u16;
    if len != !nlen {
      return Err(DeflateReadError::StoredLengthMismatch { len, nlen });
    }
    explain!(self.options, "[bit {}] stored block of {} bytes", self.bit_src.position(), len);

    let mut payload = vec![0u8; len as usize];
    self.bit_src.read_bytes(&mut payload)?;
    self.window.extend_from_slice(&payload);
    Ok(())
  }

  fn compressed_block(&mut self, codes: BlockCodes) -> Result<(), DeflateReadError> {
    loop {
      let pos = self.bit_src.position();
      let sym = DEFAULT_CODEPOINTS.read_sym(&mut self.bit_src, &codes.litlen, &codes.dist)?;
      log::trace!("{:?}", sym);
      explain!(self.options, "[bit {}] {:?}", pos, sym);
      match sym {
        DeflateSym::Literal(ch) => self.window.push(ch),
        DeflateSym::Backreference(length, distance) => {
          self.window.copy_backref(length, distance)?
        }
        DeflateSym::EndOfBlock => return Ok(()),
      }
    }
  }

  /// Bytes decoded so far.
  pub fn output(&self) -> &[u8] {
    self.window.as_slice()
  }

  pub fn into_output(self) -> Vec<u8> {
    self.window.into_inner()
  }

  pub fn bit_position(&self) -> u64 {
    self.bit_src.position()
  }

  pub fn blocks_decoded(&self) -> usize {
    self.blocks
  }

  pub fn is_finished(&self) -> bool {
    self.finished
  }
}

/// Decode a raw RFC 1951 stream (no gzip framing) from `src`.
pub fn inflate<R: Read>(src: R) -> Result<Vec<u8>, DeflateReadError> {
  let mut inflater = Inflater::new(src);
  inflater.inflate_to_end()?;
  Ok(inflater.into_output())
}
