// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Object file writer.
//!
//! The stream is assembled in memory in its final order: a zeroed header
//! placeholder, code, data, exported symbol records, relocation records,
//! external records, and the string table. The header is then rewritten in
//! place with the final sizes, mirroring the placeholder-then-patch layout
//! of the on-disk format.

use std::io;
use std::path::Path;

use crate::core::objformat::{
    ObjExternRecord, ObjHeader, ObjSymbolRecord, SymbolFlag, HEADER_SIZE,
};

use super::Assembler;

impl Assembler {
    /// Serialize the assembled object. Only valid after an error-free pass 2.
    pub fn object_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_SIZE];
        let mut strtab: Vec<u8> = Vec::new();

        out.extend_from_slice(&self.code);
        out.extend_from_slice(&self.data);

        // Exported symbols only; locals stay private to this object.
        let mut num_symbols = 0u32;
        for sym in self.symbols.symbols() {
            if sym.flag != SymbolFlag::Export {
                continue;
            }
            num_symbols += 1;
            let record = ObjSymbolRecord {
                name_offset: append_name(&mut strtab, &sym.name),
                section: sym.section as u8,
                flags: sym.flag as u8,
                value: (sym.value & 0xFF_FFFF) as u32,
            };
            record.encode(&mut out);
        }

        for reloc in &self.relocs {
            reloc.encode(&mut out);
        }

        for (index, name) in self.symbols.externs().iter().enumerate() {
            let record = ObjExternRecord {
                name_offset: append_name(&mut strtab, name),
                symbol_index: index as u32,
            };
            record.encode(&mut out);
        }

        out.extend_from_slice(&strtab);

        let header = ObjHeader {
            flags: 0,
            code_size: self.code.len() as u32,
            data_size: self.data.len() as u32,
            bss_size: self.bss_size,
            num_symbols,
            num_relocs: self.relocs.len() as u32,
            num_externs: self.symbols.externs().len() as u32,
            strtab_size: strtab.len() as u32,
        };
        out[..HEADER_SIZE].copy_from_slice(&header.encode());
        out
    }

    pub fn write_object(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.object_bytes())
    }
}

/// Append a NUL-terminated name to the string table and return its offset.
fn append_name(strtab: &mut Vec<u8>, name: &str) -> u32 {
    let offset = strtab.len() as u32;
    strtab.extend_from_slice(name.as_bytes());
    strtab.push(0);
    offset
}
