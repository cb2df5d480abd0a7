//! Reader for ELF64 files.
//!
//! The whole file is read into memory and parsed into an [`Object`]:
//! the main header, section headers, program headers (segments) and the
//! entries of every symbol table, with all names resolved up front.
//!
//! ```no_run
//! let object = elfread::Object::from_path("samples/main.o").unwrap();
//! println!("{}", object);
//! ```

mod error;
pub use error::{Error, Result};
mod reader;
pub use reader::Endian;
pub mod header;
pub use header::{FileType, Header, Ident, Machine};
pub mod section;
pub use section::{Section, SectionFlags, SectionType};
pub mod segment;
pub use segment::{Segment, SegmentFlags, SegmentType};
pub mod sym;
pub use sym::{Symbol, SymbolBind, SymbolType};
mod object;
pub use object::Object;

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;

/// Check if the bytes start with the ELF magic
pub fn is_elf(bytes: &[u8]) -> bool {
    bytes.starts_with(&header::MAGIC)
}
