/// Error messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("failed to load `{0}`")]
    Load(String),

    // === header ===
    #[error("not an ELF file")]
    NotElf,
    #[error("unsupported ELF class {0}, only 64-bit files are supported")]
    UnsupportedClass(u8),
    #[error("unsupported ELF data encoding {0}")]
    UnsupportedEncoding(u8),

    // === tables ===
    #[error("unexpected end of data reading {width} bytes at offset {offset:#x}")]
    Truncated { offset: u64, width: u64 },
    #[error("{what} entry size {size} is too small, expected at least {min}")]
    EntrySize {
        what: &'static str,
        size: u64,
        min: u64,
    },
    #[error("section index {0} is out of bounds")]
    SectionIndex(usize),
    #[error("failed to parse section headers")]
    ParseSections,
    #[error("failed to parse program headers")]
    ParseSegments,
    #[error("failed to parse symbol table `{0}`")]
    ParseSymbols(String),
    #[error("failed to read data of section `{0}`")]
    SectionData(String),
}

impl elfcommon::system::Context for Error {}

pub type Result<T> = error_stack::Result<T, Error>;
