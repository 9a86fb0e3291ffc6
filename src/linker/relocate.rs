// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Relocation patching and image assembly.
//!
//! Each object file is opened exactly once: its code and data are read into
//! the output buffers at their assigned bases, its string and extern tables
//! are cached, and its relocation records are applied in order. A patch
//! site holds the section-relative value the assembler emitted; adding the
//! target base makes it absolute.

use std::fs::File;

use crate::core::objformat::{
    read24, strtab_name, ObjExternRecord, ObjRelocRecord, Section, EXTERN_SIZE, RELOC_SIZE,
};

use super::object::read_at;
use super::{Linker, ObjectInfo};

impl Linker {
    /// Build the flat output image: all code, then all data. BSS is not
    /// materialized. Errors are accumulated in the report; the caller must
    /// not write the image when any were recorded.
    pub fn link_output(&mut self) -> Vec<u8> {
        let mut code_buf = vec![0u8; self.total_code as usize];
        let mut data_buf = vec![0u8; self.total_data as usize];

        for obj_index in 0..self.objects.len() {
            let obj = self.objects[obj_index].clone();
            let mut file = match File::open(&obj.filename) {
                Ok(file) => file,
                Err(_) => {
                    self.error(format!("cannot reopen '{}'", obj.filename.display()));
                    continue;
                }
            };

            let code_off = (obj.code_base - self.base_addr) as usize;
            if obj.header.code_size > 0 {
                if let Ok(bytes) = read_at(&mut file, obj.code_pos, obj.header.code_size as usize)
                {
                    code_buf[code_off..code_off + bytes.len()].copy_from_slice(&bytes);
                }
            }

            let data_off = (obj.data_base - self.base_addr - self.total_code) as usize;
            if obj.header.data_size > 0 {
                if let Ok(bytes) = read_at(&mut file, obj.data_pos, obj.header.data_size as usize)
                {
                    data_buf[data_off..data_off + bytes.len()].copy_from_slice(&bytes);
                }
            }

            let strtab = read_at(&mut file, obj.strtab_pos, obj.header.strtab_size as usize)
                .unwrap_or_default();
            let externs: Vec<ObjExternRecord> = read_at(
                &mut file,
                obj.extern_pos,
                obj.header.num_externs as usize * EXTERN_SIZE,
            )
            .map(|bytes| {
                bytes
                    .chunks_exact(EXTERN_SIZE)
                    .map(ObjExternRecord::parse)
                    .collect()
            })
            .unwrap_or_default();

            let reloc_bytes = read_at(
                &mut file,
                obj.reloc_pos,
                obj.header.num_relocs as usize * RELOC_SIZE,
            )
            .unwrap_or_default();

            for chunk in reloc_bytes.chunks_exact(RELOC_SIZE) {
                let reloc = ObjRelocRecord::parse(chunk);
                let Some(target_addr) = self.reloc_target(&obj, &reloc, &strtab, &externs) else {
                    continue;
                };

                match Section::from_u8(reloc.section) {
                    Some(Section::Code) => {
                        let pos = code_off + reloc.offset as usize;
                        patch24(&mut code_buf, pos, target_addr);
                    }
                    Some(Section::Data) => {
                        let pos = data_off + reloc.offset as usize;
                        patch24(&mut data_buf, pos, target_addr);
                    }
                    _ => {}
                }
            }
        }

        let mut out = code_buf;
        out.extend_from_slice(&data_buf);
        out
    }

    /// Absolute address the relocation should add at its patch site.
    fn reloc_target(
        &mut self,
        obj: &ObjectInfo,
        reloc: &ObjRelocRecord,
        strtab: &[u8],
        externs: &[ObjExternRecord],
    ) -> Option<u32> {
        if reloc.target_sect == 0 {
            let Some(ext) = externs.get(reloc.ext_index as usize) else {
                self.error(format!(
                    "cannot resolve external {} in '{}'",
                    reloc.ext_index,
                    obj.filename.display()
                ));
                return None;
            };
            let Some(name) = strtab_name(strtab, ext.name_offset) else {
                self.error(format!(
                    "bad extern name offset {} in '{}'",
                    ext.name_offset,
                    obj.filename.display()
                ));
                return None;
            };
            let name = name.to_string();
            let value = self.find_global(&name).map(|sym| sym.value);
            if value.is_none() {
                self.error(format!(
                    "undefined symbol '{name}' referenced in '{}'",
                    obj.filename.display()
                ));
            }
            return value;
        }

        match Section::from_u8(reloc.target_sect) {
            Some(Section::Code) => Some(obj.code_base),
            Some(Section::Data) => Some(obj.data_base),
            Some(Section::Bss) => Some(obj.bss_base),
            _ => {
                self.error(format!("invalid target section {}", reloc.target_sect));
                None
            }
        }
    }
}

/// Add `target_addr` to the 24-bit little-endian value at `pos`. Sites
/// that would run past the buffer are skipped.
fn patch24(buf: &mut [u8], pos: usize, target_addr: u32) {
    if pos + 2 >= buf.len() {
        return;
    }
    let existing = read24(&buf[pos..]);
    let value = existing.wrapping_add(target_addr);
    buf[pos] = (value & 0xFF) as u8;
    buf[pos + 1] = ((value >> 8) & 0xFF) as u8;
    buf[pos + 2] = ((value >> 16) & 0xFF) as u8;
}
