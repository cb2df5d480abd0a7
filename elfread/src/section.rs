//! Section headers
use std::fmt;

use error_stack::Result;
use serde::Serialize;

use crate::reader::Reader;
use crate::Error;

/// Size of a 64-bit section header
pub const SECTION_HEADER_SIZE: u64 = 64;

/// Section types (`sh_type`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Null,
    Progbits,
    Symtab,
    Strtab,
    Rela,
    Hash,
    Dynamic,
    Note,
    Nobits,
    Rel,
    Shlib,
    Dynsym,
    Unknown(u32),
}

impl SectionType {
    pub fn new(etype: u32) -> Self {
        match etype {
            0 => Self::Null,
            1 => Self::Progbits,
            2 => Self::Symtab,
            3 => Self::Strtab,
            4 => Self::Rela,
            5 => Self::Hash,
            6 => Self::Dynamic,
            7 => Self::Note,
            8 => Self::Nobits,
            9 => Self::Rel,
            10 => Self::Shlib,
            11 => Self::Dynsym,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Progbits => "progbits",
            Self::Symtab => "symtab",
            Self::Strtab => "strtab",
            Self::Rela => "rela",
            Self::Hash => "hash",
            Self::Dynamic => "dynamic",
            Self::Note => "note",
            Self::Nobits => "nobits",
            Self::Rel => "rel",
            Self::Shlib => "shlib",
            Self::Dynsym => "dynsym",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Symbol tables (static or dynamic)
    pub fn is_symbol_table(&self) -> bool {
        matches!(self, Self::Symtab | Self::Dynsym)
    }
}

/// Section attribute flags (`sh_flags`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SectionFlags(pub u64);

impl SectionFlags {
    pub const WRITE: u64 = 0x1;
    pub const ALLOC: u64 = 0x2;
    pub const EXECINSTR: u64 = 0x4;

    pub fn is_write(&self) -> bool {
        self.0 & Self::WRITE != 0
    }

    pub fn is_alloc(&self) -> bool {
        self.0 & Self::ALLOC != 0
    }

    pub fn is_execinstr(&self) -> bool {
        self.0 & Self::EXECINSTR != 0
    }
}

/// `readelf`-style flag letters, e.g. `WA` or `AX`
impl fmt::Display for SectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_write() {
            write!(f, "W")?;
        }
        if self.is_alloc() {
            write!(f, "A")?;
        }
        if self.is_execinstr() {
            write!(f, "X")?;
        }
        Ok(())
    }
}

/// A section header entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Offset into the section header string table for this section's name
    pub name_offset: u32,
    /// Resolved name, empty if the file has no section name table
    pub name: String,
    pub section_type: SectionType,
    pub flags: SectionFlags,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

impl Section {
    /// Parse the section header at `offset`. The name is left empty
    pub(crate) fn parse(reader: &Reader, offset: u64) -> Result<Self, Error> {
        let mut cursor = reader.cursor(offset);
        Ok(Self {
            name_offset: cursor.u32()?,
            name: String::new(),
            section_type: SectionType::new(cursor.u32()?),
            flags: SectionFlags(cursor.u64()?),
            addr: cursor.u64()?,
            offset: cursor.u64()?,
            size: cursor.u64()?,
            link: cursor.u32()?,
            info: cursor.u32()?,
            addralign: cursor.u64()?,
            entsize: cursor.u64()?,
        })
    }

    #[inline]
    pub fn is_symtab(&self) -> bool {
        self.section_type == SectionType::Symtab
    }

    #[inline]
    pub fn is_strtab(&self) -> bool {
        self.section_type == SectionType::Strtab
    }

    /// Whether the section occupies bytes in the file
    #[inline]
    pub fn has_file_data(&self) -> bool {
        !matches!(self.section_type, SectionType::Null | SectionType::Nobits)
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(value) => write!(f, "unknown ({:#x})", value),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_letters() {
        assert_eq!(SectionFlags(0).to_string(), "");
        assert_eq!(
            SectionFlags(SectionFlags::ALLOC | SectionFlags::EXECINSTR).to_string(),
            "AX"
        );
        assert_eq!(
            SectionFlags(SectionFlags::WRITE | SectionFlags::ALLOC).to_string(),
            "WA"
        );
    }

    #[test]
    fn type_values() {
        assert_eq!(SectionType::new(2), SectionType::Symtab);
        assert_eq!(SectionType::new(11), SectionType::Dynsym);
        assert!(SectionType::new(11).is_symbol_table());
        assert!(!SectionType::new(3).is_symbol_table());
        assert_eq!(SectionType::new(0x6fff_fff6).to_string(), "unknown (0x6ffffff6)");
    }
}
