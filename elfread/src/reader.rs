//! Bounds-checked reads over the file bytes
use error_stack::{report, Result};
use serde::Serialize;

use crate::Error;

/// Byte order of the file, from `EI_DATA`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Little => "little endian",
            Self::Big => "big endian",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    endian: Endian,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Self { bytes, endian }
    }

    /// Get `width` bytes starting at `offset`
    pub fn slice(&self, offset: u64, width: u64) -> Result<&'a [u8], Error> {
        let truncated = || report!(Error::Truncated { offset, width });
        let start = usize::try_from(offset).map_err(|_| truncated())?;
        let len = usize::try_from(width).map_err(|_| truncated())?;
        let end = start.checked_add(len).ok_or_else(truncated)?;
        self.bytes.get(start..end).ok_or_else(truncated)
    }

    fn array<const N: usize>(&self, offset: u64) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.slice(offset, N as u64)?);
        Ok(buf)
    }

    pub fn u8(&self, offset: u64) -> Result<u8, Error> {
        Ok(self.array::<1>(offset)?[0])
    }

    pub fn u16(&self, offset: u64) -> Result<u16, Error> {
        let buf = self.array(offset)?;
        Ok(match self.endian {
            Endian::Little => u16::from_le_bytes(buf),
            Endian::Big => u16::from_be_bytes(buf),
        })
    }

    pub fn u32(&self, offset: u64) -> Result<u32, Error> {
        let buf = self.array(offset)?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(buf),
            Endian::Big => u32::from_be_bytes(buf),
        })
    }

    pub fn u64(&self, offset: u64) -> Result<u64, Error> {
        let buf = self.array(offset)?;
        Ok(match self.endian {
            Endian::Little => u64::from_le_bytes(buf),
            Endian::Big => u64::from_be_bytes(buf),
        })
    }

    /// Read a NUL-terminated string starting at `offset`.
    ///
    /// Invalid UTF-8 is replaced, a missing terminator is an error
    pub fn c_str(&self, offset: u64) -> Result<String, Error> {
        let rest = self.slice(offset, (self.bytes.len() as u64).saturating_sub(offset))?;
        let end = rest
            .iter()
            .position(|c| *c == 0)
            .ok_or_else(|| report!(Error::Truncated { offset, width: rest.len() as u64 + 1 }))?;
        Ok(String::from_utf8_lossy(&rest[..end]).into_owned())
    }

    /// Sequential reader starting at `offset`
    pub fn cursor(&self, offset: u64) -> Cursor<'a> {
        Cursor {
            reader: *self,
            pos: offset,
        }
    }
}

/// Reads fields one after another, the way the on-disk structs are laid out
pub(crate) struct Cursor<'a> {
    reader: Reader<'a>,
    pos: u64,
}

macro_rules! cursor_read {
    ($name:ident, $ty:ty, $width:literal) => {
        pub fn $name(&mut self) -> Result<$ty, Error> {
            let value = self.reader.$name(self.pos)?;
            self.pos += $width;
            Ok(value)
        }
    };
}

impl Cursor<'_> {
    cursor_read!(u8, u8, 1);
    cursor_read!(u16, u16, 2);
    cursor_read!(u32, u32, 4);
    cursor_read!(u64, u64, 8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_follow_byte_order() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(Reader::new(&bytes, Endian::Little).u32(0).unwrap(), 0x0403_0201);
        assert_eq!(Reader::new(&bytes, Endian::Big).u32(0).unwrap(), 0x0102_0304);
        assert_eq!(Reader::new(&bytes, Endian::Big).u16(2).unwrap(), 0x0304);
    }

    #[test]
    fn out_of_bounds_is_truncated() {
        let bytes = [0u8; 6];
        let reader = Reader::new(&bytes, Endian::Little);
        let err = reader.u64(0).unwrap_err();
        assert_eq!(
            err.current_context(),
            &Error::Truncated {
                offset: 0,
                width: 8
            }
        );
        assert!(reader.u16(u64::MAX).is_err());
        assert!(reader.slice(u64::MAX - 1, 4).is_err());
    }

    #[test]
    fn c_str_stops_at_nul() {
        let bytes = b"\0.text\0.data\0";
        let reader = Reader::new(bytes, Endian::Little);
        assert_eq!(reader.c_str(1).unwrap(), ".text");
        assert_eq!(reader.c_str(7).unwrap(), ".data");
        assert_eq!(reader.c_str(0).unwrap(), "");
    }

    #[test]
    fn c_str_without_terminator_fails() {
        let reader = Reader::new(b"abc", Endian::Little);
        assert!(reader.c_str(0).is_err());
        assert!(reader.c_str(10).is_err());
    }

    #[test]
    fn cursor_advances_by_field_width() {
        let bytes = [1, 2, 0, 3, 0, 0, 0];
        let mut cursor = Reader::new(&bytes, Endian::Little).cursor(0);
        assert_eq!(cursor.u8().unwrap(), 1);
        assert_eq!(cursor.u16().unwrap(), 2);
        assert_eq!(cursor.u32().unwrap(), 3);
        assert!(cursor.u8().is_err());
    }
}
