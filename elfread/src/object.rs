use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use elfcommon::prelude::*;
use serde::Serialize;

use crate::header::Header;
use crate::reader::Reader;
use crate::section::{Section, SectionType, SECTION_HEADER_SIZE};
use crate::segment::{Segment, PROGRAM_HEADER_SIZE};
use crate::sym::{Symbol, SYMBOL_SIZE};
use crate::Error;

/// A whole parsed ELF file
#[derive(Debug, Clone, Serialize)]
pub struct Object {
    /// Name of the file, as given when loading
    pub name: String,
    pub header: Header,
    pub sections: Vec<Section>,
    pub segments: Vec<Segment>,
    /// Entries of the `SHT_SYMTAB` tables
    pub symbols: Vec<Symbol>,
    /// Entries of the `SHT_DYNSYM` tables
    pub dynamic_symbols: Vec<Symbol>,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl Object {
    /// Read and parse the file at `path`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let bytes = system::read_bytes(path).change_context_lazy(|| Error::Load(name.clone()))?;
        Self::parse(name, bytes)
    }

    /// Parse an ELF file from its bytes
    pub fn parse(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, Error> {
        let name = name.into();
        let header = Header::parse(&bytes)?;
        let reader = Reader::new(&bytes, header.endian());

        let mut sections = parse_sections(&reader, &header).change_context(Error::ParseSections)?;
        resolve_section_names(&reader, &header, &mut sections)
            .change_context(Error::ParseSections)?;
        let segments = parse_segments(&reader, &header).change_context(Error::ParseSegments)?;

        let mut symbols = Vec::new();
        let mut dynamic_symbols = Vec::new();
        for section in &sections {
            let table = match section.section_type {
                SectionType::Symtab => &mut symbols,
                SectionType::Dynsym => &mut dynamic_symbols,
                _ => continue,
            };
            let parsed = parse_symbols(&reader, &sections, section)
                .change_context_lazy(|| Error::ParseSymbols(section.name.clone()))?;
            table.extend(parsed);
        }

        verboseln!(
            "parsed '{}': {} sections, {} segments, {} symbols, {} dynamic symbols",
            name,
            sections.len(),
            segments.len(),
            symbols.len(),
            dynamic_symbols.len()
        );

        Ok(Self {
            name,
            header,
            sections,
            segments,
            symbols,
            dynamic_symbols,
            bytes,
        })
    }

    /// Name of the section at index `ndx`
    pub fn section_name(&self, ndx: usize) -> Option<&str> {
        self.sections.get(ndx).map(|s| s.name.as_str())
    }

    /// Name of the symbol at index `ndx` in the static symbol table
    pub fn symbol_name(&self, ndx: usize) -> Option<&str> {
        self.symbols.get(ndx).map(|s| s.name.as_str())
    }

    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Find a named symbol, static table first
    pub fn symbol_by_name(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .iter()
            .chain(&self.dynamic_symbols)
            .find(|s| s.name == name)
    }

    /// The bytes of a section in the file.
    ///
    /// Sections without file data (`NOBITS`, `NULL`) have empty data
    pub fn section_data(&self, section: &Section) -> Result<&[u8], Error> {
        if !section.has_file_data() {
            return Ok(&[]);
        }
        Reader::new(&self.bytes, self.header.endian())
            .slice(section.offset, section.size)
            .change_context_lazy(|| Error::SectionData(section.name.clone()))
    }

    /// Global and weak symbols referenced but not defined by this file,
    /// sorted and deduplicated across both symbol tables
    pub fn undefined_symbols(&self) -> Vec<&str> {
        self.external_symbols(|s| s.is_undefined())
    }

    /// Global and weak symbols defined by this file
    pub fn defined_symbols(&self) -> Vec<&str> {
        self.external_symbols(|s| !s.is_undefined())
    }

    fn external_symbols(&self, filter: impl Fn(&Symbol) -> bool) -> Vec<&str> {
        self.symbols
            .iter()
            .chain(&self.dynamic_symbols)
            .filter(|s| s.is_external() && !s.name.is_empty() && filter(s))
            .map(|s| s.name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn parse_sections(reader: &Reader, header: &Header) -> Result<Vec<Section>, Error> {
    let num = u64::from(header.shnum);
    let size = u64::from(header.shentsize);
    if num == 0 {
        return Ok(Vec::new());
    }
    check_entry_size("section header", size, SECTION_HEADER_SIZE)?;
    (0..num)
        .map(|i| Section::parse(reader, table_offset(header.shoff, size, i)?))
        .collect()
}

fn parse_segments(reader: &Reader, header: &Header) -> Result<Vec<Segment>, Error> {
    let num = u64::from(header.phnum);
    let size = u64::from(header.phentsize);
    if num == 0 {
        return Ok(Vec::new());
    }
    check_entry_size("program header", size, PROGRAM_HEADER_SIZE)?;
    (0..num)
        .map(|i| Segment::parse(reader, table_offset(header.phoff, size, i)?))
        .collect()
}

/// Resolve names through the section name string table (`e_shstrndx`).
///
/// A file without one (index 0) keeps empty names
fn resolve_section_names(
    reader: &Reader,
    header: &Header,
    sections: &mut [Section],
) -> Result<(), Error> {
    let shstrndx = usize::from(header.shstrndx);
    if shstrndx == 0 {
        return Ok(());
    }
    let strtab_offset = match sections.get(shstrndx) {
        Some(strtab) => strtab.offset,
        None => bail!(Error::SectionIndex(shstrndx)),
    };
    for section in sections.iter_mut() {
        section.name = reader.c_str(strtab_offset.saturating_add(u64::from(section.name_offset)))?;
    }
    Ok(())
}

/// Parse the entries of one symbol table, with names resolved through the
/// string table given by the section's `sh_link`
fn parse_symbols(
    reader: &Reader,
    sections: &[Section],
    symtab: &Section,
) -> Result<Vec<Symbol>, Error> {
    check_entry_size("symbol", symtab.entsize, SYMBOL_SIZE)?;
    let strtab = sections
        .get(symtab.link as usize)
        .filter(|s| s.is_strtab());
    if strtab.is_none() {
        verboseln!(
            "symbol table '{}' does not link to a string table (link {})",
            symtab.name,
            symtab.link
        );
    }
    // the whole table must be in the file before anything is allocated for it
    reader.slice(symtab.offset, symtab.size)?;
    let num = symtab.size / symtab.entsize;
    let mut symbols = Vec::with_capacity(num as usize);
    for i in 0..num {
        let offset = table_offset(symtab.offset, symtab.entsize, i)?;
        let mut symbol = Symbol::parse(reader, offset)?;
        if let Some(strtab) = strtab {
            let name_at = strtab.offset.saturating_add(u64::from(symbol.name_offset));
            symbol.name = reader.c_str(name_at)?;
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

fn check_entry_size(what: &'static str, size: u64, min: u64) -> Result<(), Error> {
    if size < min {
        bail!(Error::EntrySize { what, size, min });
    }
    Ok(())
}

/// Offset of entry `i` of a table, guarding against overflow from bogus headers
fn table_offset(base: u64, entsize: u64, i: u64) -> Result<u64, Error> {
    entsize
        .checked_mul(i)
        .and_then(|off| off.checked_add(base))
        .ok_or_else(|| report!(Error::Truncated { offset: base, width: entsize }))
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "object:")?;
        writeln!(f, "- name : {}", self.name)?;

        writeln!(f, "- sections : {}", self.sections.len())?;
        for (i, section) in self.sections.iter().enumerate() {
            writeln!(f, "  - {} - {}: {}", i, section.name, section.section_type)?;
        }

        writeln!(f, "- symbols : {}", self.symbols.len())?;
        for (i, symbol) in self.symbols.iter().enumerate() {
            writeln!(f, "  - {} - {}", i, symbol.name)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixture::{self, ElfBuilder, SymbolSpec};
    use crate::{Endian, SectionType, SegmentType, SymbolBind, SymbolType};

    fn sample() -> Object {
        Object::parse("main.o", fixture::sample_object()).unwrap()
    }

    #[test]
    fn section_names_resolve() {
        let object = sample();
        assert_eq!(object.section_name(2), Some(".data"));
        let names: Vec<_> = object.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["", ".text", ".data", ".bss", ".comment", ".symtab", ".strtab", ".shstrtab"]
        );
        assert_eq!(object.section_name(99), None);
    }

    #[test]
    fn sample_symbols() {
        let object = sample();
        let names: Vec<_> = (0..object.symbols.len())
            .map(|i| object.symbol_name(i).unwrap())
            .collect();
        assert_eq!(names, vec!["", "main.c", "", "local_f", "global_f", "main"]);

        let local_f = object.symbol_by_name("local_f").unwrap();
        assert_eq!(local_f.bind, SymbolBind::Local);
        assert_eq!(local_f.symbol_type, SymbolType::Func);

        let global_f = object.symbol_by_name("global_f").unwrap();
        assert_eq!(global_f.bind, SymbolBind::Global);
        assert_eq!(global_f.symbol_type, SymbolType::Func);
        assert_eq!(global_f.shndx, 1);

        assert!(object.symbols[2].is_section());
        assert_eq!(object.symbol_by_name("printf"), None);
    }

    #[test]
    fn defined_and_undefined() {
        let object = sample();
        assert_eq!(object.defined_symbols(), vec!["global_f", "main"]);
        assert!(object.undefined_symbols().is_empty());

        let bytes = ElfBuilder::new()
            .section(".text", SectionType::Progbits, 0x6, vec![0xc3; 4])
            .symbol(SymbolSpec::global_func("_start", 1, 0, 4))
            .symbol(SymbolSpec::undefined("puts"))
            .symbol(SymbolSpec::undefined("exit"))
            .dynamic_symbol(SymbolSpec::undefined("puts"))
            .build();
        let object = Object::parse("a.out", bytes).unwrap();
        assert_eq!(object.undefined_symbols(), vec!["exit", "puts"]);
        assert_eq!(object.defined_symbols(), vec!["_start"]);
        assert_eq!(object.dynamic_symbols.len(), 2);
        assert_eq!(object.dynamic_symbols[1].name, "puts");
    }

    #[test]
    fn section_data_reads_file_bytes() {
        let object = sample();
        let text = object.section_by_name(".text").unwrap();
        assert_eq!(object.section_data(text).unwrap(), fixture::SAMPLE_TEXT);
        let bss = object.section_by_name(".bss").unwrap();
        assert!(object.section_data(bss).unwrap().is_empty());
        let comment = object.section_by_name(".comment").unwrap();
        assert!(object.section_data(comment).unwrap().starts_with(b"GCC"));
    }

    #[test]
    fn display_listing() {
        let listing = sample().to_string();
        let lines: Vec<_> = listing.lines().map(str::trim_end).collect();
        assert_eq!(
            lines,
            vec![
                "object:",
                "- name : main.o",
                "- sections : 8",
                "  - 0 - : null",
                "  - 1 - .text: progbits",
                "  - 2 - .data: progbits",
                "  - 3 - .bss: nobits",
                "  - 4 - .comment: progbits",
                "  - 5 - .symtab: symtab",
                "  - 6 - .strtab: strtab",
                "  - 7 - .shstrtab: strtab",
                "- symbols : 6",
                "  - 0 -",
                "  - 1 - main.c",
                "  - 2 -",
                "  - 3 - local_f",
                "  - 4 - global_f",
                "  - 5 - main",
            ]
        );
    }

    #[test]
    fn big_endian_object() {
        let bytes = ElfBuilder::new()
            .endian(Endian::Big)
            .section(".text", SectionType::Progbits, 0x6, vec![0; 8])
            .symbol(SymbolSpec::global_func("entry", 1, 0, 8))
            .build();
        let object = Object::parse("be.o", bytes).unwrap();
        assert_eq!(object.header.endian(), Endian::Big);
        assert_eq!(object.section_name(1), Some(".text"));
        assert_eq!(object.symbol_by_name("entry").unwrap().size, 8);
    }

    #[test]
    fn executable_segments() {
        let bytes = ElfBuilder::new()
            .file_type(2)
            .entry(0x401000)
            .section(".text", SectionType::Progbits, 0x6, vec![0x90; 16])
            .segment(1, 0x5, 0x401000, 0x1000)
            .segment(0x6474_e551, 0x6, 0, 0)
            .build();
        let object = Object::parse("a.out", bytes).unwrap();
        assert_eq!(object.segments.len(), 2);
        let load = &object.segments[0];
        assert_eq!(load.segment_type, SegmentType::Load);
        assert_eq!(load.flags.to_string(), "R-E");
        assert_eq!(load.vaddr, 0x401000);
        assert!(load.contains_addr(object.header.entry));
        assert_eq!(object.segments[1].segment_type, SegmentType::Unknown(0x6474_e551));
        assert!(object.symbols.is_empty());
    }

    #[test]
    fn missing_symtab_is_empty() {
        let bytes = ElfBuilder::new()
            .section(".text", SectionType::Progbits, 0x6, vec![0; 4])
            .build();
        let object = Object::parse("stripped.o", bytes).unwrap();
        assert!(object.symbols.is_empty());
        assert!(object.symbol_by_name("main").is_none());
    }

    #[test]
    fn truncated_section_table_fails() {
        let mut bytes = fixture::sample_object();
        let len = bytes.len();
        bytes.truncate(len - 10);
        let err = Object::parse("cut.o", bytes).unwrap_err();
        assert_eq!(err.current_context(), &Error::ParseSections);
    }

    #[test]
    fn zero_symbol_entry_size_fails() {
        let object = sample();
        let symtab_index = object.sections.iter().position(|s| s.is_symtab()).unwrap();
        let mut bytes = fixture::sample_object();
        // sh_entsize is the last field of the section header
        let entsize_at = object.header.shoff as usize + symtab_index * 64 + 56;
        bytes[entsize_at..entsize_at + 8].copy_from_slice(&0u64.to_le_bytes());
        let err = Object::parse("bad.o", bytes).unwrap_err();
        assert_eq!(err.current_context(), &Error::ParseSymbols(".symtab".to_string()));
        let cause = err
            .frames()
            .filter_map(|f| f.downcast_ref::<Error>())
            .last()
            .unwrap();
        assert_eq!(
            cause,
            &Error::EntrySize {
                what: "symbol",
                size: 0,
                min: 24
            }
        );
    }

    #[test]
    fn symtab_not_linked_to_strtab_has_no_names() {
        let object = sample();
        let symtab_index = object.sections.iter().position(|s| s.is_symtab()).unwrap();
        let mut bytes = fixture::sample_object();
        // point sh_link at .text
        let link_at = object.header.shoff as usize + symtab_index * 64 + 40;
        bytes[link_at..link_at + 4].copy_from_slice(&1u32.to_le_bytes());
        let object = Object::parse("bad.o", bytes).unwrap();
        assert_eq!(object.symbols.len(), 6);
        assert!(object.symbols.iter().all(|s| s.name.is_empty()));
        assert!(object.sections[6].is_strtab());
        assert!(!object.sections[1].is_strtab());
    }

    #[test]
    fn from_path_uses_given_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.o");
        std::fs::write(&path, fixture::sample_object()).unwrap();
        let object = Object::from_path(&path).unwrap();
        assert_eq!(object.name, path.display().to_string());
        assert_eq!(object.symbols.len(), 6);

        let err = Object::from_path(dir.path().join("missing.o")).unwrap_err();
        assert!(matches!(err.current_context(), Error::Load(_)));
    }

    #[test]
    fn serializes_to_json() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["header"]["file_type"], "rel");
        assert_eq!(value["sections"][1]["name"], ".text");
        assert_eq!(value["symbols"][4]["bind"], "global");
        assert!(value.get("bytes").is_none());
    }
}
