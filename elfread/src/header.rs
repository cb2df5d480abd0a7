//! The main ELF header at the start of the file.
//!
//! Layout of the 64-bit header (offsets in bytes):
//!
//! | offset | size | field       |
//! |--------|------|-------------|
//! | 0      | 16   | ident       |
//! | 16     | 2    | type        |
//! | 18     | 2    | machine     |
//! | 20     | 4    | version     |
//! | 24     | 8    | entry       |
//! | 32     | 8    | phoff       |
//! | 40     | 8    | shoff       |
//! | 48     | 4    | flags       |
//! | 52     | 2    | ehsize      |
//! | 54     | 2    | phentsize   |
//! | 56     | 2    | phnum       |
//! | 58     | 2    | shentsize   |
//! | 60     | 2    | shnum       |
//! | 62     | 2    | shstrndx    |
use std::fmt;

use error_stack::{bail, Result};
use serde::Serialize;

use crate::reader::{Endian, Reader};
use crate::Error;

/// `\x7fELF`
pub const MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// Size of the 64-bit ELF header
pub const HEADER_SIZE: u64 = 64;

const CLASS_64: u8 = 2;

/// ELF header identification (`e_ident`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    /// 1 for 32-bit, 2 for 64-bit
    pub class: u8,
    pub endian: Endian,
    pub version: u8,
    pub osabi: u8,
    pub abiversion: u8,
}

impl Ident {
    /// Parse the 16 identification bytes.
    ///
    /// Only 64-bit files are accepted
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
            bail!(Error::NotElf);
        }
        let ident = Reader::new(bytes, Endian::Little).slice(0, 16)?;
        let class = ident[4];
        if class != CLASS_64 {
            bail!(Error::UnsupportedClass(class));
        }
        let endian = match ident[5] {
            1 => Endian::Little,
            2 => Endian::Big,
            other => bail!(Error::UnsupportedEncoding(other)),
        };
        Ok(Self {
            class,
            endian,
            version: ident[6],
            osabi: ident[7],
            abiversion: ident[8],
        })
    }
}

/// ELF file type (`e_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    None,
    /// A relocatable file.
    Rel,
    /// An executable.
    Exec,
    /// A shared object.
    Dyn,
    /// A core file.
    Core,
    Unknown(u16),
}

impl FileType {
    pub fn new(etype: u16) -> Self {
        match etype {
            0 => Self::None,
            1 => Self::Rel,
            2 => Self::Exec,
            3 => Self::Dyn,
            4 => Self::Core,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rel => "relocatable",
            Self::Exec => "executable",
            Self::Dyn => "shared object",
            Self::Core => "core",
            Self::None | Self::Unknown(_) => "unknown",
        }
    }
}

/// Target architecture (`e_machine`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Machine {
    None,
    X86,
    Arm,
    X86_64,
    Aarch64,
    RiscV,
    Unknown(u16),
}

impl Machine {
    pub fn new(machine: u16) -> Self {
        match machine {
            0 => Self::None,
            3 => Self::X86,
            40 => Self::Arm,
            62 => Self::X86_64,
            183 => Self::Aarch64,
            243 => Self::RiscV,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::X86 => "x86",
            Self::Arm => "arm",
            Self::X86_64 => "x86-64",
            Self::Aarch64 => "aarch64",
            Self::RiscV => "risc-v",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// ELF header struct
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub ident: Ident,
    pub file_type: FileType,
    pub machine: Machine,
    pub version: u32,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl Header {
    /// Parse the header at the start of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let ident = Ident::parse(bytes)?;
        let reader = Reader::new(bytes, ident.endian);
        // fail early and report the full header size instead of the first short field
        reader.slice(0, HEADER_SIZE)?;

        let mut cursor = reader.cursor(16);
        Ok(Self {
            file_type: FileType::new(cursor.u16()?),
            machine: Machine::new(cursor.u16()?),
            version: cursor.u32()?,
            entry: cursor.u64()?,
            phoff: cursor.u64()?,
            shoff: cursor.u64()?,
            flags: cursor.u32()?,
            ehsize: cursor.u16()?,
            phentsize: cursor.u16()?,
            phnum: cursor.u16()?,
            shentsize: cursor.u16()?,
            shnum: cursor.u16()?,
            shstrndx: cursor.u16()?,
            ident,
        })
    }

    /// Byte order used by the rest of the file
    #[inline]
    pub fn endian(&self) -> Endian {
        self.ident.endian
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(value) => write!(f, "unknown ({})", value),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}
