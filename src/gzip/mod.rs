pub mod reader;

use bitflags::bitflags;
use crc32fast::Hasher;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Serialize, Serializer};
use std::fmt::{self, Write};
use std::num::NonZeroU32;

use crate::deflate::InflateOptions;

/* Structure from RFC 1952

Header
   +---+---+---+---+---+---+---+---+---+---+
   |ID1|ID2|CM |FLG|     MTIME     |XFL|OS | (more-->)
   +---+---+---+---+---+---+---+---+---+---+
(if FLG.FEXTRA set)

   +---+---+=================================+
   | XLEN  |...XLEN bytes of "extra field"...| (more-->)
   +---+---+=================================+

(if FLG.FNAME set)

   +=========================================+
   |...original file name, zero-terminated...| (more-->)
   +=========================================+

(if FLG.FCOMMENT set)

   +===================================+
   |...file comment, zero-terminated...| (more-->)
   +===================================+

(if FLG.FHCRC set)

   +---+---+
   | CRC16 |
   +---+---+

   +=======================+
   |...compressed blocks...| (more-->)
   +=======================+

     0   1   2   3   4   5   6   7
   +---+---+---+---+---+---+---+---+
   |     CRC32     |     ISIZE     |
   +---+---+---+---+---+---+---+---+
*/

pub const GZIP_ID1: u8 = 0x1f;
pub const GZIP_ID2: u8 = 0x8b;
pub const GZIP_CM_DEFLATE: u8 = 8;

bitflags! {
    /** The bitfields corresponding to FLG in RFC 1952 */
    #[derive(Default)]
    pub struct GZFlags: u8 {
        const FTEXT     = 0b1 << 0;
        const FHCRC     = 0b1 << 1;
        const FEXTRA    = 0b1 << 2;
        const FNAME     = 0b1 << 3;
        const FCOMMENT  = 0b1 << 4;
        const RESERVED1 = 0b1 << 5;
        const RESERVED2 = 0b1 << 6;
        const RESERVED3 = 0b1 << 7;
    }
}
bitflags! {
    #[derive(Default)]
    /** The bitfields corresponding to XFL in RFC 1952 */
    pub struct GZXFlags: u8 {
        const XFL_NO_FLAGS = 0;
        const XFL_MAX_COMPRESSION = 2;
        const XFL_MAX_SPEED = 4;
    }
}

#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Copy, Clone, Serialize)]
#[repr(u8)]
pub enum OSType {
  FatFS = 0,
  Amiga = 1,
  VMS = 2,
  Unix = 3,
  VMorCMS = 4,
  AtariTOS = 5,
  HpfsFS = 6,
  Macintosh = 7,
  ZSystem = 8,
  CPM = 9,
  Tops20 = 10,
  NtfsFS = 11,
  Qds = 12,
  AcornRISC = 13,
  Unknown = 255,
}

impl GZFlags {
  pub fn is_valid(&self) -> bool {
    let all_invalid_bits = GZFlags::RESERVED1 | GZFlags::RESERVED2 | GZFlags::RESERVED3;
    !self.intersects(all_invalid_bits)
  }
}

fn serialize_flags<S: Serializer>(flags: &GZFlags, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u8(flags.bits())
}

fn serialize_xflags<S: Serializer>(flags: &GZXFlags, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u8(flags.bits())
}

/// The member header, with the optional fields the flags announced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GzipHeader {
  #[serde(serialize_with = "serialize_flags")]
  pub flags: GZFlags,
  pub mtime: Option<NonZeroU32>,
  #[serde(serialize_with = "serialize_xflags")]
  pub xfl: GZXFlags,
  pub os: OSType,
  pub extra: Option<Vec<u8>>,
  /// FNAME, decoded as ISO 8859-1
  pub name: Option<String>,
  /// FCOMMENT, decoded as ISO 8859-1
  pub comment: Option<String>,
  pub crc16: Option<u16>,
}

impl GzipHeader {
  pub fn fmt_header<W: Write>(&self, f: &mut W) -> fmt::Result {
    write!(
      f,
      r#"GZip Header:
   +---+---+---+---+---+---+---+---+---+---+
   |ID1|ID2|CM |FLG|     MTIME     |XFL|OS | (more-->)
   +---+---+---+---+---+---+---+---+---+---
   {:x}   {:x}  {}   {:02x}  {:x?}   {:x}  {}
"#,
      GZIP_ID1,
      GZIP_ID2,
      GZIP_CM_DEFLATE,
      self.flags.bits(),
      self.mtime,
      self.xfl.bits(),
      u8::from(self.os)
    )?;
    if let Some(extra) = &self.extra {
      writeln!(f, "Extra: {} bytes", extra.len())?;
    }
    if let Some(name) = &self.name {
      writeln!(f, "Filename: {}", name)?;
    }
    if let Some(comment) = &self.comment {
      writeln!(f, "Comment: {}", comment)?;
    }
    if let Some(crc16) = self.crc16 {
      writeln!(f, "CRC16: {:x}", crc16)?;
    }
    Ok(())
  }
}

impl fmt::Display for GzipHeader {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.fmt_header(f)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GzipTrailer {
  pub crc32: u32,
  /// Size of the uncompressed data modulo 2^32
  pub isize: u32,
}

/// One decoded member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GzipMember {
  pub header: GzipHeader,
  pub trailer: GzipTrailer,
  pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipOptions {
  /// Longest FEXTRA, FNAME or FCOMMENT accepted, in bytes
  pub max_header_field: usize,
  /// Check CRC32 and ISIZE of each member against the decoded data
  pub verify_trailer: bool,
  /// Keep decoding members after the first
  pub multi_member: bool,
  pub inflate: InflateOptions,
}

impl Default for GzipOptions {
  fn default() -> Self {
    Self {
      max_header_field: u16::MAX as usize,
      verify_trailer: false,
      multi_member: true,
      inflate: InflateOptions::default(),
    }
  }
}

pub fn calc_crc32(data: &[u8]) -> u32 {
  let mut hasher = Hasher::new();
  hasher.update(data);
  hasher.finalize()
}
