//! Symbol table entries
use std::fmt;

use error_stack::Result;
use serde::Serialize;

use crate::reader::Reader;
use crate::Error;

/// Size of a 64-bit symbol table entry
pub const SYMBOL_SIZE: u64 = 24;

/// Section index of undefined symbols
pub const SHN_UNDEF: u16 = 0;
/// Section index of absolute symbols
pub const SHN_ABS: u16 = 0xfff1;
/// Section index of common symbols
pub const SHN_COMMON: u16 = 0xfff2;

/// Symbol types, from the lower 4 bits of `st_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolType {
    NoType,
    Object,
    Func,
    Section,
    File,
    Common,
    Tls,
    Unknown(u8),
}

impl SymbolType {
    pub fn new(info: u8) -> Self {
        match info & 0x0f {
            0 => Self::NoType,
            1 => Self::Object,
            2 => Self::Func,
            3 => Self::Section,
            4 => Self::File,
            5 => Self::Common,
            6 => Self::Tls,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoType => "no type",
            Self::Object => "object",
            Self::Func => "function",
            Self::Section => "section",
            Self::File => "file",
            Self::Common => "common",
            Self::Tls => "tls",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// Symbol bindings, from the higher 4 bits of `st_info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolBind {
    Local,
    Global,
    Weak,
    Unknown(u8),
}

impl SymbolBind {
    pub fn new(info: u8) -> Self {
        match info >> 4 {
            0 => Self::Local,
            1 => Self::Global,
            2 => Self::Weak,
            other => Self::Unknown(other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Global => "global",
            Self::Weak => "weak",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// An entry in a symbol table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    /// Offset into the linked string table
    pub name_offset: u32,
    pub name: String,
    pub symbol_type: SymbolType,
    pub bind: SymbolBind,
    pub other: u8,
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

impl Symbol {
    /// Parse the entry at `offset`. The name is left empty
    pub(crate) fn parse(reader: &Reader, offset: u64) -> Result<Self, Error> {
        let mut cursor = reader.cursor(offset);
        let name_offset = cursor.u32()?;
        let info = cursor.u8()?;
        Ok(Self {
            name_offset,
            name: String::new(),
            symbol_type: SymbolType::new(info),
            bind: SymbolBind::new(info),
            other: cursor.u8()?,
            shndx: cursor.u16()?,
            value: cursor.u64()?,
            size: cursor.u64()?,
        })
    }

    /// Visibility, from the lower 2 bits of `st_other`
    pub fn visibility(&self) -> &'static str {
        match self.other & 0x3 {
            0 => "default",
            1 => "internal",
            2 => "hidden",
            _ => "protected",
        }
    }

    /// Whether the symbol represents a section
    #[inline]
    pub fn is_section(&self) -> bool {
        self.symbol_type == SymbolType::Section
    }

    /// Referenced but not defined in this file
    #[inline]
    pub fn is_undefined(&self) -> bool {
        self.shndx == SHN_UNDEF
    }

    /// Global or weak, i.e. visible to the linker outside this file
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.bind, SymbolBind::Global | SymbolBind::Weak)
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for SymbolBind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_is_split_into_type_and_bind() {
        // global function
        let info = 0x12;
        assert_eq!(SymbolType::new(info), SymbolType::Func);
        assert_eq!(SymbolBind::new(info), SymbolBind::Global);
        // weak object
        let info = 0x21;
        assert_eq!(SymbolType::new(info), SymbolType::Object);
        assert_eq!(SymbolBind::new(info), SymbolBind::Weak);
        // GNU unique
        assert_eq!(SymbolBind::new(0xa0), SymbolBind::Unknown(10));
        assert_eq!(SymbolType::new(0x0a), SymbolType::Unknown(10));
    }

    #[test]
    fn parse_entry() {
        let mut bytes = vec![];
        bytes.extend_from_slice(&7u32.to_le_bytes());
        bytes.push(0x12);
        bytes.push(2);
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0x20u64.to_le_bytes());
        bytes.extend_from_slice(&0x16u64.to_le_bytes());
        let reader = Reader::new(&bytes, crate::Endian::Little);
        let symbol = Symbol::parse(&reader, 0).unwrap();
        assert_eq!(symbol.name_offset, 7);
        assert_eq!(symbol.symbol_type, SymbolType::Func);
        assert_eq!(symbol.bind, SymbolBind::Global);
        assert_eq!(symbol.visibility(), "hidden");
        assert_eq!(symbol.shndx, 1);
        assert_eq!(symbol.value, 0x20);
        assert_eq!(symbol.size, 0x16);
        assert!(symbol.is_external());
        assert!(!symbol.is_undefined());
    }
}
