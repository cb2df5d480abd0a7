//! Printing the contents of a single ELF file
use elfcommon::prelude::*;

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;

use clap::{Args, ValueEnum};
use derive_more::derive::Deref;
use elfread::sym::{SHN_ABS, SHN_COMMON, SHN_UNDEF};
use elfread::{Header, Object, Section, Segment, Symbol};
use serde::Serialize;

use crate::cli::{CommonOptions, TopLevelOptions};
use crate::error::Error;

/// CLI Options for the dump command
#[derive(Debug, Clone, PartialEq, Args, Deref)]
pub struct Options {
    /// The ELF file to dump
    pub file: String,

    /// Print the ELF header
    #[clap(long)]
    pub header: bool,

    /// Print the section headers
    #[clap(long)]
    pub sections: bool,

    /// Print the program headers
    #[clap(long)]
    pub segments: bool,

    /// Print the symbol table
    #[clap(long)]
    pub symbols: bool,

    /// Print the dynamic symbol table
    #[clap(long)]
    pub dynamic: bool,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Common options
    #[deref]
    #[clap(flatten)]
    pub options: CommonOptions,
}

/// Output formats for the dump command
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum Format {
    /// Human readable tables
    Text,
    /// One JSON document
    Json,
}

/// Which parts of the file to print
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parts {
    pub header: bool,
    pub sections: bool,
    pub segments: bool,
    pub symbols: bool,
    pub dynamic: bool,
}

impl Parts {
    /// Everything, when no part is selected explicitly
    pub fn from_options(options: &Options) -> Self {
        let parts = Self {
            header: options.header,
            sections: options.sections,
            segments: options.segments,
            symbols: options.symbols,
            dynamic: options.dynamic,
        };
        if parts == Self::none() {
            Self::all()
        } else {
            parts
        }
    }

    pub fn all() -> Self {
        Self {
            header: true,
            sections: true,
            segments: true,
            symbols: true,
            dynamic: true,
        }
    }

    fn none() -> Self {
        Self {
            header: false,
            sections: false,
            segments: false,
            symbols: false,
            dynamic: false,
        }
    }
}

pub fn run(top: &TopLevelOptions, options: &Options) -> Result<(), Error> {
    let path = Path::new(&top.dir).join(&options.file);
    let object =
        Object::from_path(&path).change_context_lazy(|| Error::Dump(options.file.clone()))?;
    let parts = Parts::from_options(options);

    let output = match options.format {
        Format::Text => render_text(&object, parts),
        Format::Json => render_json(&object, parts)
            .change_context_lazy(|| Error::Dump(options.file.clone()))?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|_| stdout.flush())
        .change_context(Error::Output)?;

    Ok(())
}

/// Render the selected parts as readelf-style tables
pub fn render_text(object: &Object, parts: Parts) -> String {
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = write_text(&mut out, object, parts);
    out
}

fn write_text(out: &mut String, object: &Object, parts: Parts) -> std::fmt::Result {
    writeln!(out, "File: {}", object.name)?;
    if parts.header {
        writeln!(out)?;
        write_header(out, &object.header)?;
    }
    if parts.sections {
        writeln!(out)?;
        write_sections(out, &object.sections)?;
    }
    if parts.segments {
        writeln!(out)?;
        write_segments(out, &object.segments)?;
    }
    if parts.symbols {
        writeln!(out)?;
        write_symbols(out, ".symtab", &object.symbols)?;
    }
    if parts.dynamic {
        writeln!(out)?;
        write_symbols(out, ".dynsym", &object.dynamic_symbols)?;
    }
    Ok(())
}

fn write_header(out: &mut String, header: &Header) -> std::fmt::Result {
    writeln!(out, "ELF Header:")?;
    writeln!(out, "  Class:              ELF64")?;
    writeln!(out, "  Data:               {}", header.endian().as_str())?;
    writeln!(out, "  OS/ABI:             {}", header.ident.osabi)?;
    writeln!(out, "  Type:               {}", header.file_type)?;
    writeln!(out, "  Machine:            {}", header.machine)?;
    writeln!(out, "  Version:            {}", header.version)?;
    writeln!(out, "  Entry point:        {:#x}", header.entry)?;
    writeln!(out, "  Program headers:    {} at {:#x}", header.phnum, header.phoff)?;
    writeln!(out, "  Section headers:    {} at {:#x}", header.shnum, header.shoff)?;
    writeln!(out, "  Flags:              {:#x}", header.flags)?;
    writeln!(out, "  Section name index: {}", header.shstrndx)
}

fn write_sections(out: &mut String, sections: &[Section]) -> std::fmt::Result {
    writeln!(out, "Sections: {}", sections.len())?;
    writeln!(
        out,
        "  [Nr] {:<18} {:<10} {:<5} {:<16} {:<8} {:<8} {:<4} {:<4} Align",
        "Name", "Type", "Flags", "Address", "Offset", "Size", "Link", "Info"
    )?;
    for (i, section) in sections.iter().enumerate() {
        writeln!(
            out,
            "  [{:>2}] {:<18} {:<10} {:<5} {:016x} {:08x} {:08x} {:<4} {:<4} {}",
            i,
            section.name,
            section.section_type.to_string(),
            section.flags.to_string(),
            section.addr,
            section.offset,
            section.size,
            section.link,
            section.info,
            section.addralign
        )?;
    }
    Ok(())
}

fn write_segments(out: &mut String, segments: &[Segment]) -> std::fmt::Result {
    writeln!(out, "Segments: {}", segments.len())?;
    if segments.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "  {:<22} {:<5} {:<8} {:<16} {:<8} {:<8} Align",
        "Type", "Flags", "Offset", "VirtAddr", "FileSiz", "MemSiz"
    )?;
    for segment in segments {
        writeln!(
            out,
            "  {:<22} {:<5} {:08x} {:016x} {:08x} {:08x} {:#x}",
            segment.segment_type.to_string(),
            segment.flags.to_string(),
            segment.offset,
            segment.vaddr,
            segment.filesz,
            segment.memsz,
            segment.align
        )?;
    }
    Ok(())
}

fn write_symbols(out: &mut String, table: &str, symbols: &[Symbol]) -> std::fmt::Result {
    writeln!(out, "Symbols ({}): {}", table, symbols.len())?;
    if symbols.is_empty() {
        return Ok(());
    }
    writeln!(
        out,
        "  {:>4} {:<16} {:>5} {:<8} {:<6} {:<9} {:>4} Name",
        "Num", "Value", "Size", "Type", "Bind", "Vis", "Ndx"
    )?;
    for (i, symbol) in symbols.iter().enumerate() {
        writeln!(
            out,
            "  {:>4} {:016x} {:>5} {:<8} {:<6} {:<9} {:>4} {}",
            i,
            symbol.value,
            symbol.size,
            symbol.symbol_type.as_str(),
            symbol.bind.as_str(),
            symbol.visibility(),
            section_index(symbol.shndx),
            symbol.name
        )?;
    }
    Ok(())
}

/// `UND`, `ABS`, `COM` or the section number
fn section_index(shndx: u16) -> String {
    match shndx {
        SHN_UNDEF => "UND".to_string(),
        SHN_ABS => "ABS".to_string(),
        SHN_COMMON => "COM".to_string(),
        n => n.to_string(),
    }
}

#[derive(Serialize)]
struct JsonDump<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<&'a Header>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sections: Option<&'a [Section]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    segments: Option<&'a [Segment]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    symbols: Option<&'a [Symbol]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_symbols: Option<&'a [Symbol]>,
}

/// Render the selected parts as one pretty-printed JSON document
pub fn render_json(object: &Object, parts: Parts) -> Result<String, serde_json::Error> {
    let dump = JsonDump {
        name: &object.name,
        header: parts.header.then_some(&object.header),
        sections: parts.sections.then_some(object.sections.as_slice()),
        segments: parts.segments.then_some(object.segments.as_slice()),
        symbols: parts.symbols.then_some(object.symbols.as_slice()),
        dynamic_symbols: parts.dynamic.then_some(object.dynamic_symbols.as_slice()),
    };
    let mut json = serde_json::to_string_pretty(&dump).map_err(|e| report!(e))?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use elfread::fixture;

    fn sample() -> Object {
        Object::parse("main.o", fixture::sample_object()).unwrap()
    }

    fn symbols_only() -> Parts {
        Parts {
            symbols: true,
            ..Parts::none()
        }
    }

    #[test]
    fn text_symbols_table() {
        let text = render_text(&sample(), symbols_only());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "File: main.o");
        assert_eq!(lines[2], "Symbols (.symtab): 6");
        assert!(lines[4].ends_with(" UND "));
        assert!(lines[5].contains("file"));
        assert!(lines[5].contains(" ABS "));
        assert!(lines[5].ends_with("main.c"));
        let global_f = lines.iter().find(|l| l.ends_with(" global_f")).unwrap();
        assert!(global_f.contains("function"));
        assert!(global_f.contains("global"));
        assert!(global_f.contains("0000000000000012"));
        assert!(!text.contains("Sections:"));
    }

    #[test]
    fn text_all_parts() {
        let text = render_text(&sample(), Parts::all());
        assert!(text.contains("  Type:               relocatable\n"));
        assert!(text.contains("  Machine:            x86-64\n"));
        assert!(text.contains("Sections: 8\n"));
        assert!(text.contains("Segments: 0\n"));
        assert!(text.contains("Symbols (.dynsym): 0\n"));
        let text_line = text.lines().find(|l| l.starts_with("  [ 1] .text")).unwrap();
        assert!(text_line.contains("progbits"));
        assert!(text_line.contains(" AX "));
    }

    #[test]
    fn json_only_selected_parts() {
        let json = render_json(&sample(), symbols_only()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "main.o");
        assert!(value.get("header").is_none());
        assert!(value.get("sections").is_none());
        assert_eq!(value["symbols"].as_array().unwrap().len(), 6);
        assert_eq!(value["symbols"][3]["name"], "local_f");
        assert_eq!(value["symbols"][3]["bind"], "local");
        assert_eq!(value["symbols"][3]["symbol_type"], "func");
    }

    #[test]
    fn no_parts_selected_means_all() {
        let options = Options {
            file: "main.o".to_string(),
            header: false,
            sections: false,
            segments: false,
            symbols: false,
            dynamic: false,
            format: Format::Text,
            options: CommonOptions {
                verbose: false,
                trace: false,
                color: None,
            },
        };
        assert_eq!(Parts::from_options(&options), Parts::all());
        let options = Options {
            sections: true,
            ..options
        };
        assert_eq!(
            Parts::from_options(&options),
            Parts {
                sections: true,
                ..Parts::none()
            }
        );
    }

    #[test]
    fn section_index_names() {
        assert_eq!(section_index(0), "UND");
        assert_eq!(section_index(0xfff1), "ABS");
        assert_eq!(section_index(0xfff2), "COM");
        assert_eq!(section_index(3), "3");
    }
}
