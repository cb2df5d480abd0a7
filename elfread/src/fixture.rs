//! In-memory ELF64 images for tests.
//!
//! [`ElfBuilder`] lays out a minimal but well-formed file: header, program
//! headers, section data, symbol and string tables, then the section header
//! table. [`sample_object`] is what compiling `samples/main.c` produces.
use crate::reader::Endian;
use crate::section::SectionType;
use crate::sym::SHN_ABS;

/// `.text` of the sample object: `local_f`, `global_f` and `main` at -O0
pub const SAMPLE_TEXT: &[u8] = &[
    // local_f: a * 3
    0x55, 0x48, 0x89, 0xe5, 0x89, 0x7d, 0xfc, 0x8b, 0x55, 0xfc, 0x89, 0xd0, 0x01, 0xc0, 0x01,
    0xd0, 0x5d, 0xc3,
    // global_f: a * 6
    0x55, 0x48, 0x89, 0xe5, 0x89, 0x7d, 0xfc, 0x8b, 0x55, 0xfc, 0x89, 0xd0, 0x01, 0xc0, 0x01,
    0xd0, 0x01, 0xc0, 0x5d, 0xc3,
    // main
    0x55, 0x48, 0x89, 0xe5, 0x48, 0x83, 0xec, 0x10, 0xc7, 0x45, 0xfc, 0x05, 0x00, 0x00, 0x00,
    0xc7, 0x45, 0xf8, 0x07, 0x00, 0x00, 0x00, 0x8b, 0x45, 0xfc, 0x89, 0xc7, 0xe8, 0xba, 0xff,
    0xff, 0xff, 0x89, 0x45, 0xf8, 0x8b, 0x45, 0xf8, 0x89, 0xc7, 0xe8, 0x00, 0x00, 0x00, 0x00,
    0x89, 0x45, 0xfc, 0x8b, 0x55, 0xfc, 0x8b, 0x45, 0xf8, 0x01, 0xd0, 0xc9, 0xc3,
];

/// The relocatable object of `samples/main.c`
pub fn sample_object() -> Vec<u8> {
    ElfBuilder::new()
        .section(".text", SectionType::Progbits, 0x6, SAMPLE_TEXT.to_vec())
        .section(".data", SectionType::Progbits, 0x3, vec![])
        .section(".bss", SectionType::Nobits, 0x3, vec![])
        .section(".comment", SectionType::Progbits, 0x30, b"GCC: (GNU) 13.2.0\0".to_vec())
        .symbol(SymbolSpec::new("main.c", STB_LOCAL, STT_FILE, SHN_ABS, 0, 0))
        .symbol(SymbolSpec::new("", STB_LOCAL, STT_SECTION, 1, 0, 0))
        .symbol(SymbolSpec::new("local_f", STB_LOCAL, STT_FUNC, 1, 0, 18))
        .symbol(SymbolSpec::global_func("global_f", 1, 18, 20))
        .symbol(SymbolSpec::global_func("main", 1, 38, 58))
        .build()
}

pub const STB_LOCAL: u8 = 0;
pub const STB_GLOBAL: u8 = 1;
pub const STB_WEAK: u8 = 2;
pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;
pub const STT_SECTION: u8 = 3;
pub const STT_FILE: u8 = 4;

/// A symbol to put in a generated symbol table
#[derive(Debug, Clone)]
pub struct SymbolSpec {
    pub name: String,
    pub bind: u8,
    pub kind: u8,
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

impl SymbolSpec {
    pub fn new(name: &str, bind: u8, kind: u8, shndx: u16, value: u64, size: u64) -> Self {
        Self {
            name: name.to_string(),
            bind,
            kind,
            shndx,
            value,
            size,
        }
    }

    pub fn global_func(name: &str, shndx: u16, value: u64, size: u64) -> Self {
        Self::new(name, STB_GLOBAL, STT_FUNC, shndx, value, size)
    }

    pub fn weak_object(name: &str, shndx: u16, value: u64, size: u64) -> Self {
        Self::new(name, STB_WEAK, STT_OBJECT, shndx, value, size)
    }

    pub fn undefined(name: &str) -> Self {
        Self::new(name, STB_GLOBAL, STT_NOTYPE, 0, 0, 0)
    }
}

struct SectionSpec {
    name: String,
    section_type: SectionType,
    flags: u64,
    data: Vec<u8>,
}

struct SegmentSpec {
    segment_type: u32,
    flags: u32,
    vaddr: u64,
    memsz: u64,
}

/// Builder for a minimal ELF64 file
pub struct ElfBuilder {
    endian: Endian,
    file_type: u16,
    machine: u16,
    entry: u64,
    sections: Vec<SectionSpec>,
    segments: Vec<SegmentSpec>,
    symbols: Vec<SymbolSpec>,
    dynamic_symbols: Vec<SymbolSpec>,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ElfBuilder {
    /// Little endian x86-64 relocatable file with no sections
    pub fn new() -> Self {
        Self {
            endian: Endian::Little,
            file_type: 1,
            machine: 62,
            entry: 0,
            sections: Vec::new(),
            segments: Vec::new(),
            symbols: Vec::new(),
            dynamic_symbols: Vec::new(),
        }
    }

    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }

    pub fn file_type(mut self, file_type: u16) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    pub fn entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    /// Add a section. Sections get indices from 1 in the order added.
    ///
    /// `NOBITS` sections take their size from `data` but write nothing
    pub fn section(
        mut self,
        name: &str,
        section_type: SectionType,
        flags: u64,
        data: Vec<u8>,
    ) -> Self {
        self.sections.push(SectionSpec {
            name: name.to_string(),
            section_type,
            flags,
            data,
        });
        self
    }

    pub fn segment(mut self, segment_type: u32, flags: u32, vaddr: u64, memsz: u64) -> Self {
        self.segments.push(SegmentSpec {
            segment_type,
            flags,
            vaddr,
            memsz,
        });
        self
    }

    /// Add to `.symtab`. Local symbols should come first
    pub fn symbol(mut self, symbol: SymbolSpec) -> Self {
        self.symbols.push(symbol);
        self
    }

    /// Add to `.dynsym`
    pub fn dynamic_symbol(mut self, symbol: SymbolSpec) -> Self {
        self.dynamic_symbols.push(symbol);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Out {
            bytes: vec![0; 64],
            endian: self.endian,
        };
        let mut shstrtab = StrTab::default();
        let mut headers: Vec<SectionHeader> = vec![SectionHeader::default()];

        let phoff = if self.segments.is_empty() { 0 } else { 64 };
        for segment in &self.segments {
            out.u32(segment.segment_type);
            out.u32(segment.flags);
            out.u64(0);
            out.u64(segment.vaddr);
            out.u64(segment.vaddr);
            out.u64(segment.memsz);
            out.u64(segment.memsz);
            out.u64(0x1000);
        }

        for section in &self.sections {
            let offset = out.align(16);
            if section.section_type != SectionType::Nobits {
                out.bytes.extend_from_slice(&section.data);
            }
            headers.push(SectionHeader {
                name: shstrtab.add(&section.name),
                section_type: section_type_value(section.section_type),
                flags: section.flags,
                offset,
                size: section.data.len() as u64,
                align: 16,
                ..Default::default()
            });
        }

        for (symbols, tab_name, str_name, tab_type) in [
            (&self.symbols, ".symtab", ".strtab", 2),
            (&self.dynamic_symbols, ".dynsym", ".dynstr", 11),
        ] {
            if symbols.is_empty() {
                continue;
            }
            let mut strtab = StrTab::default();
            let offset = out.align(8);
            // null symbol
            out.bytes.extend_from_slice(&[0; 24]);
            for symbol in symbols {
                out.u32(strtab.add(&symbol.name));
                out.bytes.push((symbol.bind << 4) | (symbol.kind & 0xf));
                out.bytes.push(0);
                out.u16(symbol.shndx);
                out.u64(symbol.value);
                out.u64(symbol.size);
            }
            let locals = symbols.iter().filter(|s| s.bind == STB_LOCAL).count() as u32;
            let strtab_index = headers.len() as u32 + 1;
            headers.push(SectionHeader {
                name: shstrtab.add(tab_name),
                section_type: tab_type,
                offset,
                size: 24 * (symbols.len() as u64 + 1),
                link: strtab_index,
                info: locals + 1,
                align: 8,
                entsize: 24,
                ..Default::default()
            });
            let offset = out.bytes.len() as u64;
            out.bytes.extend_from_slice(&strtab.bytes);
            headers.push(SectionHeader {
                name: shstrtab.add(str_name),
                section_type: 3,
                offset,
                size: strtab.bytes.len() as u64,
                align: 1,
                ..Default::default()
            });
        }

        let shstrndx = headers.len() as u16;
        let name = shstrtab.add(".shstrtab");
        let offset = out.bytes.len() as u64;
        out.bytes.extend_from_slice(&shstrtab.bytes);
        headers.push(SectionHeader {
            name,
            section_type: 3,
            offset,
            size: shstrtab.bytes.len() as u64,
            align: 1,
            ..Default::default()
        });

        let shoff = out.align(8);
        for header in &headers {
            out.u32(header.name);
            out.u32(header.section_type);
            out.u64(header.flags);
            out.u64(0);
            out.u64(header.offset);
            out.u64(header.size);
            out.u32(header.link);
            out.u32(header.info);
            out.u64(header.align);
            out.u64(header.entsize);
        }

        // main header, written last now that the offsets are known
        let mut head = Out {
            bytes: Vec::with_capacity(64),
            endian: self.endian,
        };
        head.bytes.extend_from_slice(&crate::header::MAGIC);
        head.bytes.push(2);
        head.bytes.push(match self.endian {
            Endian::Little => 1,
            Endian::Big => 2,
        });
        head.bytes.push(1);
        head.bytes.resize(16, 0);
        head.u16(self.file_type);
        head.u16(self.machine);
        head.u32(1);
        head.u64(self.entry);
        head.u64(phoff);
        head.u64(shoff);
        head.u32(0);
        head.u16(64);
        head.u16(56);
        head.u16(self.segments.len() as u16);
        head.u16(64);
        head.u16(headers.len() as u16);
        head.u16(shstrndx);
        out.bytes[..64].copy_from_slice(&head.bytes);

        out.bytes
    }
}

#[derive(Default)]
struct SectionHeader {
    name: u32,
    section_type: u32,
    flags: u64,
    offset: u64,
    size: u64,
    link: u32,
    info: u32,
    align: u64,
    entsize: u64,
}

fn section_type_value(section_type: SectionType) -> u32 {
    match section_type {
        SectionType::Null => 0,
        SectionType::Progbits => 1,
        SectionType::Symtab => 2,
        SectionType::Strtab => 3,
        SectionType::Rela => 4,
        SectionType::Hash => 5,
        SectionType::Dynamic => 6,
        SectionType::Note => 7,
        SectionType::Nobits => 8,
        SectionType::Rel => 9,
        SectionType::Shlib => 10,
        SectionType::Dynsym => 11,
        SectionType::Unknown(value) => value,
    }
}

/// String table under construction, starting with the empty string
struct StrTab {
    bytes: Vec<u8>,
}

impl Default for StrTab {
    fn default() -> Self {
        Self { bytes: vec![0] }
    }
}

impl StrTab {
    fn add(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }
        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.push(0);
        offset
    }
}

struct Out {
    bytes: Vec<u8>,
    endian: Endian,
}

impl Out {
    /// Pad to `align` and return the new offset
    fn align(&mut self, align: usize) -> u64 {
        let len = (self.bytes.len() + align - 1) & !(align - 1);
        self.bytes.resize(len, 0);
        len as u64
    }

    fn u16(&mut self, x: u16) {
        match self.endian {
            Endian::Little => self.bytes.extend_from_slice(&x.to_le_bytes()),
            Endian::Big => self.bytes.extend_from_slice(&x.to_be_bytes()),
        }
    }

    fn u32(&mut self, x: u32) {
        match self.endian {
            Endian::Little => self.bytes.extend_from_slice(&x.to_le_bytes()),
            Endian::Big => self.bytes.extend_from_slice(&x.to_be_bytes()),
        }
    }

    fn u64(&mut self, x: u64) {
        match self.endian {
            Endian::Little => self.bytes.extend_from_slice(&x.to_le_bytes()),
            Endian::Big => self.bytes.extend_from_slice(&x.to_be_bytes()),
        }
    }
}
