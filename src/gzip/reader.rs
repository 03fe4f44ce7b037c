pub use super::{
  calc_crc32, GZFlags, GZXFlags, GzipHeader, GzipMember, GzipOptions, GzipTrailer, OSType,
  GZIP_CM_DEFLATE, GZIP_ID1, GZIP_ID2,
};
use crate::deflate::decoder::{DeflateReadError, Inflater};
use std::convert::TryFrom;
use std::io::{self, BufRead, ErrorKind, Read};
use std::num::NonZeroU32;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GzipReadError {
  #[error("Unexpected end of gzip data")]
  UnexpectedEnd,
  #[error("gzip magic bytes invalid. Expected 1F 8B, got {:02x} {:02x}", .0, .1)]
  BadMagic(u8, u8),
  #[error("gzip compression byte invalid. Expected 8, got {0}")]
  UnsupportedMethod(u8),
  #[error("Reserved bits on GZFlags were set: {:08b}", .0)]
  InvalidFlags(u8),
  #[error("gzip {field} field is longer than the limit of {limit} bytes")]
  HeaderFieldTooLarge { field: &'static str, limit: usize },
  #[error("DEFLATE error after {} decoded bytes: {source}", .partial.len())]
  Inflate {
    source: DeflateReadError,
    /// Everything decoded before the error. Not to be trusted.
    partial: Vec<u8>,
  },
  #[error("CRC32 mismatch: record says {:x}, but calculated {:x}", .0, .1)]
  CRC32Mismatch(u32, u32),
  #[error("Data size mismatch: record says {} bytes, but data has {} bytes", .0, .1)]
  IsizeMismatch(u32, u32),
  #[error("File Read Error: {:?}", .0)]
  FileReadError(io::Error),
}

impl From<io::Error> for GzipReadError {
  fn from(e: io::Error) -> Self {
    match e.kind() {
      ErrorKind::UnexpectedEof => Self::UnexpectedEnd,
      _ => Self::FileReadError(e),
    }
  }
}

/// Read a zero-terminated string of at most `limit` bytes (terminator not
/// included), decoding it as ISO 8859-1.
fn read_cstring<R: BufRead>(
  rdr: &mut R,
  field: &'static str,
  limit: usize,
) -> Result<String, GzipReadError> {
  let mut buf = Vec::new();
  rdr
    .by_ref()
    .take((limit as u64).saturating_add(1))
    .read_until(0u8, &mut buf)?;
  match buf.last() {
    Some(0) => {
      buf.pop();
      Ok(buf.into_iter().map(char::from).collect())
    }
    _ if buf.len() > limit => Err(GzipReadError::HeaderFieldTooLarge { field, limit }),
    _ => Err(GzipReadError::UnexpectedEnd),
  }
}

impl GzipHeader {
  /// Read a member header, leaving `rdr` at the first byte of DEFLATE data.
  pub fn read_from<R: BufRead>(rdr: &mut R, options: &GzipOptions) -> Result<Self, GzipReadError> {
    let mut magic = [0u8; 2];
    rdr.read_exact(&mut magic)?;
    if magic != [GZIP_ID1, GZIP_ID2] {
      return Err(GzipReadError::BadMagic(magic[0], magic[1]));
    }
    Self::read_after_magic(rdr, options)
  }

  fn read_after_magic<R: BufRead>(
    rdr: &mut R,
    options: &GzipOptions,
  ) -> Result<Self, GzipReadError> {
    let mut reqd_header = [0u8; 8];
    rdr.read_exact(&mut reqd_header)?;

    let cm = reqd_header[0];
    if cm != GZIP_CM_DEFLATE {
      return Err(GzipReadError::UnsupportedMethod(cm));
    }
    let flags = GZFlags::from_bits_truncate(reqd_header[1]);
    if !flags.is_valid() {
      return Err(GzipReadError::InvalidFlags(reqd_header[1]));
    }
    let mtime_raw =
      u32::from_le_bytes([reqd_header[2], reqd_header[3], reqd_header[4], reqd_header[5]]);
    let xfl = GZXFlags::from_bits_truncate(reqd_header[6]);
    let os = OSType::try_from(reqd_header[7]).unwrap_or(OSType::Unknown);

    // FTEXT is advisory. The other flags announce optional fields, in this order.
    let extra = if flags.contains(GZFlags::FEXTRA) {
      let mut xlen_bytes = [0u8; 2];
      rdr.read_exact(&mut xlen_bytes)?;
      let xlen = u16::from_le_bytes(xlen_bytes) as usize;
      if xlen > options.max_header_field {
        return Err(GzipReadError::HeaderFieldTooLarge {
          field: "FEXTRA",
          limit: options.max_header_field,
        });
      }
      let mut extra = vec![0u8; xlen];
      rdr.read_exact(&mut extra)?;
      Some(extra)
    } else {
      None
    };

    let name = if flags.contains(GZFlags::FNAME) {
      Some(read_cstring(rdr, "FNAME", options.max_header_field)?)
    } else {
      None
    };
    let comment = if flags.contains(GZFlags::FCOMMENT) {
      Some(read_cstring(rdr, "FCOMMENT", options.max_header_field)?)
    } else {
      None
    };

    // CRC16 covers the header bytes, and is kept but not checked.
    let crc16 = if flags.contains(GZFlags::FHCRC) {
      let mut crc_bytes = [0u8; 2];
      rdr.read_exact(&mut crc_bytes)?;
      Some(u16::from_le_bytes(crc_bytes))
    } else {
      None
    };

    Ok(Self {
      flags,
      mtime: NonZeroU32::new(mtime_raw),
      xfl,
      os,
      extra,
      name,
      comment,
      crc16,
    })
  }
}

impl GzipTrailer {
  pub fn read_from<R: Read>(rdr: &mut R) -> Result<Self, GzipReadError> {
    let mut trailer = [0u8; 8];
    rdr.read_exact(&mut trailer)?;
    Ok(Self {
      crc32: u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]),
      isize: u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]),
    })
  }

  /// Compare against the data the member decoded to.
  pub fn verify(&self, data: &[u8]) -> Result<(), GzipReadError> {
    let my_isize = data.len() as u32;
    if my_isize != self.isize {
      return Err(GzipReadError::IsizeMismatch(self.isize, my_isize));
    }
    let my_crc32 = calc_crc32(data);
    if my_crc32 != self.crc32 {
      return Err(GzipReadError::CRC32Mismatch(self.crc32, my_crc32));
    }
    log::debug!("Passed check with isz = {} and crc32 = {:x}", self.isize, self.crc32);
    Ok(())
  }
}

impl GzipMember {
  /// Read a whole member: header, DEFLATE stream and trailer.
  pub fn read_from<R: BufRead>(rdr: &mut R, options: &GzipOptions) -> Result<Self, GzipReadError> {
    let header = GzipHeader::read_from(rdr, options)?;
    Self::read_body(rdr, header, options)
  }

  fn read_body<R: BufRead>(
    rdr: &mut R,
    header: GzipHeader,
    options: &GzipOptions,
  ) -> Result<Self, GzipReadError> {
    log::debug!("{}", header);
    let mut inflater = Inflater::with_options(&mut *rdr, options.inflate);
    if let Err(source) = inflater.inflate_to_end() {
      return Err(GzipReadError::Inflate {
        source,
        partial: inflater.into_output(),
      });
    }
    // Dropping the inflater discards the unused bits of the last byte
    let data = inflater.into_output();

    let trailer = GzipTrailer::read_from(rdr)?;
    if options.verify_trailer {
      trailer.verify(&data)?;
    }
    Ok(Self {
      header,
      trailer,
      data,
    })
  }
}

/** Pulls members out of a gzip file one at a time. The first member must be
present; after it, decoding stops at the end of input, or at the first bytes
that do not start with the gzip magic (these are ignored with a warning, as
`gzip` itself does).
*/
pub struct GzipDecoder<R: BufRead> {
  rdr: R,
  options: GzipOptions,
  members: usize,
  done: bool,
}

impl<R: BufRead> GzipDecoder<R> {
  pub fn new(rdr: R, options: GzipOptions) -> Self {
    Self {
      rdr,
      options,
      members: 0,
      done: false,
    }
  }

  pub fn members_read(&self) -> usize {
    self.members
  }

  pub fn next_member(&mut self) -> Result<Option<GzipMember>, GzipReadError> {
    if self.done {
      return Ok(None);
    }
    if self.members > 0 && !self.at_next_member()? {
      self.done = true;
      return Ok(None);
    }

    let member = GzipMember::read_from(&mut self.rdr, &self.options)?;
    self.members += 1;
    if !self.options.multi_member {
      self.done = true;
    }
    Ok(Some(member))
  }

  fn at_next_member(&mut self) -> Result<bool, GzipReadError> {
    let buf = self.rdr.fill_buf()?;
    if buf.is_empty() {
      return Ok(false);
    }
    if buf[0] == GZIP_ID1 && buf.get(1).map_or(true, |&b| b == GZIP_ID2) {
      return Ok(true);
    }
    log::warn!(
      "trailing garbage after gzip member {} ignored (starts with {:02x})",
      self.members,
      buf[0]
    );
    Ok(false)
  }

  pub fn into_inner(self) -> R {
    self.rdr
  }
}

/// Decode every member of a gzip file.
pub fn read_members<R: BufRead>(
  rdr: R,
  options: &GzipOptions,
) -> Result<Vec<GzipMember>, GzipReadError> {
  let mut decoder = GzipDecoder::new(rdr, *options);
  let mut members = Vec::new();
  while let Some(member) = decoder.next_member()? {
    members.push(member);
  }
  Ok(members)
}

/// Decode a gzip file into the concatenation of its members' data. On a
/// DEFLATE error, the partial output includes all earlier members.
pub fn decompress<R: BufRead>(rdr: R, options: &GzipOptions) -> Result<Vec<u8>, GzipReadError> {
  let mut decoder = GzipDecoder::new(rdr, *options);
  let mut output = Vec::new();
  loop {
    match decoder.next_member() {
      Ok(Some(member)) => {
        if output.is_empty() {
          output = member.data;
        } else {
          output.extend_from_slice(&member.data);
        }
      }
      Ok(None) => return Ok(output),
      Err(GzipReadError::Inflate { source, partial }) => {
        output.extend_from_slice(&partial);
        return Err(GzipReadError::Inflate {
          source,
          partial: output,
        });
      }
      Err(e) => return Err(e),
    }
  }
}
