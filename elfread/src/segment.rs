//! Program headers (segments)
use std::fmt;

use error_stack::Result;
use serde::Serialize;

use crate::reader::Reader;
use crate::Error;

/// Size of a 64-bit program header
pub const PROGRAM_HEADER_SIZE: u64 = 56;

/// Segment types (`p_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentType {
    Null,
    Load,
    Dynamic,
    Interp,
    Note,
    Shlib,
    Phdr,
    Tls,
    Unknown(u32),
}

impl SegmentType {
    pub fn new(etype: u32) -> Self {
        match etype {
            0 => Self::Null,
            1 => Self::Load,
            2 => Self::Dynamic,
            3 => Self::Interp,
            4 => Self::Note,
            5 => Self::Shlib,
            6 => Self::Phdr,
            7 => Self::Tls,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Load => "loadable segment",
            Self::Dynamic => "dynamic linking info",
            Self::Interp => "interpreter",
            Self::Note => "aux info",
            Self::Shlib => "reserved",
            Self::Phdr => "header entry",
            Self::Tls => "tls",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Segment permission flags (`p_flags`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SegmentFlags(pub u32);

impl SegmentFlags {
    pub const EXECUTE: u32 = 0x1;
    pub const WRITE: u32 = 0x2;
    pub const READ: u32 = 0x4;

    pub fn is_read(&self) -> bool {
        self.0 & Self::READ != 0
    }

    pub fn is_write(&self) -> bool {
        self.0 & Self::WRITE != 0
    }

    pub fn is_execute(&self) -> bool {
        self.0 & Self::EXECUTE != 0
    }
}

/// Permissions as `RWE`, with `-` for missing ones
impl fmt::Display for SegmentFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = if self.is_read() { 'R' } else { '-' };
        let w = if self.is_write() { 'W' } else { '-' };
        let e = if self.is_execute() { 'E' } else { '-' };
        write!(f, "{}{}{}", r, w, e)
    }
}

/// A program header entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub segment_type: SegmentType,
    pub flags: SegmentFlags,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub align: u64,
}

impl Segment {
    pub(crate) fn parse(reader: &Reader, offset: u64) -> Result<Self, Error> {
        let mut cursor = reader.cursor(offset);
        Ok(Self {
            segment_type: SegmentType::new(cursor.u32()?),
            flags: SegmentFlags(cursor.u32()?),
            offset: cursor.u64()?,
            vaddr: cursor.u64()?,
            paddr: cursor.u64()?,
            filesz: cursor.u64()?,
            memsz: cursor.u64()?,
            align: cursor.u64()?,
        })
    }

    /// Whether `addr` falls inside the memory image of this segment
    pub fn contains_addr(&self, addr: u64) -> bool {
        addr >= self.vaddr && addr - self.vaddr < self.memsz
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(value) => write!(f, "unknown ({:#x})", value),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}
