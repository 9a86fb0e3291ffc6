// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Object-file dump utility: prints every table of one or more objects in a
// human-readable layout.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ez80forge::core::objformat::{
    strtab_name, ObjExternRecord, ObjHeader, ObjRelocRecord, ObjSymbolRecord, Section,
    SymbolFlag, EXTERN_SIZE, HEADER_SIZE, RELOC_SIZE, RELOC_ADDR24, SYMBOL_SIZE,
};

#[derive(Parser, Debug)]
#[command(
    name = "ez80objdump",
    version,
    about = "Dump the contents of eZ80 object files"
)]
struct Cli {
    #[arg(value_name = "OBJECT", required = true)]
    objects: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut failed = false;

    for (index, path) in cli.objects.iter().enumerate() {
        if index > 0 {
            println!();
        }
        if let Err(message) = dump_object(path) {
            eprintln!("error: {message}");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn dump_object(path: &PathBuf) -> Result<(), String> {
    let bytes =
        std::fs::read(path).map_err(|_| format!("cannot open '{}'", path.display()))?;
    let header =
        ObjHeader::parse(&bytes).map_err(|err| format!("'{}': {err}", path.display()))?;

    println!("=== Object File: {} ===", path.display());
    println!();
    println!("Header:");
    println!("  Magic:       EZ8O");
    println!("  Version:     3");
    println!("  Flags:       0x{:02X}", header.flags);
    println!("  Code size:   {} bytes", header.code_size);
    println!("  Data size:   {} bytes", header.data_size);
    println!("  BSS size:    {} bytes", header.bss_size);
    println!("  Symbols:     {}", header.num_symbols);
    println!("  Relocations: {}", header.num_relocs);
    println!("  Externals:   {}", header.num_externs);
    println!("  String tab:  {} bytes", header.strtab_size);
    println!();

    let code_pos = HEADER_SIZE;
    let data_pos = code_pos + header.code_size as usize;
    let sym_pos = data_pos + header.data_size as usize;
    let reloc_pos = sym_pos + header.num_symbols as usize * SYMBOL_SIZE;
    let extern_pos = reloc_pos + header.num_relocs as usize * RELOC_SIZE;
    let strtab_pos = extern_pos + header.num_externs as usize * EXTERN_SIZE;

    let strtab = section_slice(&bytes, strtab_pos, header.strtab_size as usize, path)?;

    println!("Code Section:");
    dump_hex(section_slice(&bytes, code_pos, header.code_size as usize, path)?);
    println!();

    println!("Data Section:");
    dump_hex(section_slice(&bytes, data_pos, header.data_size as usize, path)?);
    println!();

    println!("BSS Section:");
    if header.bss_size > 0 {
        println!("  {} bytes (uninitialized)", header.bss_size);
    } else {
        println!("  (empty)");
    }
    println!();

    println!("Symbol Table:");
    let symbols = section_slice(&bytes, sym_pos, header.num_symbols as usize * SYMBOL_SIZE, path)?;
    if symbols.is_empty() {
        println!("  (empty)");
    } else {
        println!("  {:<6} {:<8} {:<8} {:<6} Name", "Index", "Value", "Section", "Flags");
        println!("  {:<6} {:<8} {:<8} {:<6} ----", "-----", "--------", "--------", "------");
        for (index, chunk) in symbols.chunks_exact(SYMBOL_SIZE).enumerate() {
            let sym = ObjSymbolRecord::parse(chunk);
            println!(
                "  {:<6} {:06X}   {:<8} {:<6} {}",
                index,
                sym.value,
                section_name(sym.section),
                flag_name(sym.flags),
                strtab_name(strtab, sym.name_offset).unwrap_or("???")
            );
        }
    }
    println!();

    println!("Relocation Table:");
    let relocs = section_slice(&bytes, reloc_pos, header.num_relocs as usize * RELOC_SIZE, path)?;
    if relocs.is_empty() {
        println!("  (empty)");
    } else {
        println!("  {:<6} {:<8} {:<8} {:<8} Target", "Index", "Offset", "Section", "Type");
        println!("  {:<6} {:<8} {:<8} {:<8} ------", "-----", "--------", "--------", "--------");
        for (index, chunk) in relocs.chunks_exact(RELOC_SIZE).enumerate() {
            let reloc = ObjRelocRecord::parse(chunk);
            let reloc_type = if reloc.reloc_type == RELOC_ADDR24 {
                "ADDR24"
            } else {
                "???"
            };
            let target = if reloc.target_sect == 0 {
                format!("EXT:{}", reloc.ext_index)
            } else {
                section_name(reloc.target_sect).to_string()
            };
            println!(
                "  {:<6} {:06X}   {:<8} {:<8} {}",
                index,
                reloc.offset,
                section_name(reloc.section),
                reloc_type,
                target
            );
        }
    }
    println!();

    println!("External References:");
    let externs = section_slice(&bytes, extern_pos, header.num_externs as usize * EXTERN_SIZE, path)?;
    if externs.is_empty() {
        println!("  (empty)");
    } else {
        println!("  {:<6} Name", "Index");
        println!("  {:<6} ----", "-----");
        for chunk in externs.chunks_exact(EXTERN_SIZE) {
            let ext = ObjExternRecord::parse(chunk);
            println!(
                "  {:<6} {}",
                ext.symbol_index,
                strtab_name(strtab, ext.name_offset).unwrap_or("???")
            );
        }
    }
    println!();

    println!("String Table:");
    if strtab.is_empty() {
        println!("  (empty)");
    } else {
        let mut offset = 0usize;
        while offset < strtab.len() {
            let name = strtab_name(strtab, offset as u32).unwrap_or("");
            println!("  {offset:06X}: \"{name}\"");
            offset += name.len() + 1;
        }
    }
    println!();

    Ok(())
}

fn section_slice<'a>(
    bytes: &'a [u8],
    pos: usize,
    len: usize,
    path: &PathBuf,
) -> Result<&'a [u8], String> {
    bytes
        .get(pos..pos + len)
        .ok_or_else(|| format!("'{}' is truncated", path.display()))
}

fn dump_hex(bytes: &[u8]) {
    if bytes.is_empty() {
        println!("  (empty)");
        return;
    }
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if (32..127).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        println!("  {:06X}: {:<48} |{}|", row * 16, hex.join(" "), ascii);
    }
}

fn section_name(section: u8) -> &'static str {
    Section::from_u8(section).map_or("???", Section::name)
}

fn flag_name(flags: u8) -> &'static str {
    match flags {
        0 => SymbolFlag::Local.name(),
        1 => SymbolFlag::Export.name(),
        2 => SymbolFlag::Extern.name(),
        _ => "???",
    }
}
