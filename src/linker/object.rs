// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Object loading: header walk, position bookkeeping, and export
//! registration.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::core::objformat::{
    strtab_name, ObjHeader, ObjSymbolRecord, HEADER_SIZE, RELOC_SIZE, SYMBOL_SIZE,
};

use super::{Linker, ObjectInfo};

/// Seek and read an exact byte range.
pub(crate) fn read_at(file: &mut File, pos: u64, len: usize) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(pos))?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf)?;
    Ok(buf)
}

impl Linker {
    /// Load an object file named on the command line.
    pub fn load_object(&mut self, path: &Path) -> Result<(), ()> {
        self.load_object_at(path, 0)
    }

    /// Load an object at a byte offset within its file (library members).
    /// Registers all exported symbols with section-relative values; they
    /// become absolute during layout.
    pub(crate) fn load_object_at(&mut self, path: &Path, offset: u64) -> Result<(), ()> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(_) => {
                self.error(format!("cannot open '{}'", path.display()));
                return Err(());
            }
        };

        let header_bytes = match read_at(&mut file, offset, HEADER_SIZE) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.error(format!("cannot read header from '{}'", path.display()));
                return Err(());
            }
        };
        let header = match ObjHeader::parse(&header_bytes) {
            Ok(header) => header,
            Err(err) => {
                self.error(format!("'{}': {err}", path.display()));
                return Err(());
            }
        };

        let code_pos = offset + HEADER_SIZE as u64;
        let data_pos = code_pos + u64::from(header.code_size);
        let sym_pos = data_pos + u64::from(header.data_size);
        let reloc_pos = sym_pos + u64::from(header.num_symbols) * SYMBOL_SIZE as u64;
        let extern_pos = reloc_pos + u64::from(header.num_relocs) * RELOC_SIZE as u64;
        let strtab_pos =
            extern_pos + u64::from(header.num_externs) * crate::core::objformat::EXTERN_SIZE as u64;

        let strtab = if header.strtab_size > 0 {
            match read_at(&mut file, strtab_pos, header.strtab_size as usize) {
                Ok(bytes) => bytes,
                Err(_) => {
                    self.error(format!(
                        "cannot read string table from '{}'",
                        path.display()
                    ));
                    return Err(());
                }
            }
        } else {
            Vec::new()
        };

        let obj_index = self.objects.len();
        let sym_bytes = match read_at(
            &mut file,
            sym_pos,
            header.num_symbols as usize * SYMBOL_SIZE,
        ) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.error(format!("cannot read symbols from '{}'", path.display()));
                return Err(());
            }
        };

        self.objects.push(ObjectInfo {
            filename: path.to_path_buf(),
            offset,
            header,
            code_pos,
            data_pos,
            sym_pos,
            reloc_pos,
            extern_pos,
            strtab_pos,
            code_base: 0,
            data_base: 0,
            bss_base: 0,
        });

        for chunk in sym_bytes.chunks_exact(SYMBOL_SIZE) {
            let record = ObjSymbolRecord::parse(chunk);
            if let Some(name) = strtab_name(&strtab, record.name_offset) {
                let name = name.to_string();
                self.add_global(&name, record.value, record.section, Some(obj_index));
            }
        }

        self.info(format!(
            "Loaded '{}': code={}, data={}, bss={}",
            path.display(),
            header.code_size,
            header.data_size,
            header.bss_size
        ));

        Ok(())
    }
}
