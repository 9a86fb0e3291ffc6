// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Section layout and symbol resolution.
//!
//! Bases are assigned in object-load order: every code section first
//! (starting at the base address), then every data section, then BSS.
//! Global symbol values, recorded section-relative by the assembler, become
//! absolute by adding the owning object's section base.

use crate::core::objformat::Section;

use super::Linker;

impl Linker {
    pub fn resolve_symbols(&mut self) {
        let mut addr = self.base_addr;
        for obj in &mut self.objects {
            obj.code_base = addr;
            addr += obj.header.code_size;
        }
        self.total_code = addr - self.base_addr;

        for obj in &mut self.objects {
            obj.data_base = addr;
            addr += obj.header.data_size;
        }
        self.total_data = addr - self.base_addr - self.total_code;

        for obj in &mut self.objects {
            obj.bss_base = addr;
            addr += obj.header.bss_size;
        }
        self.total_bss = addr - self.base_addr - self.total_code - self.total_data;

        for sym in &mut self.symbols {
            let Some(obj_index) = sym.origin else {
                continue;
            };
            let obj = &self.objects[obj_index];
            match Section::from_u8(sym.section) {
                Some(Section::Code) => sym.value += obj.code_base,
                Some(Section::Data) => sym.value += obj.data_base,
                Some(Section::Bss) => sym.value += obj.bss_base,
                _ => {}
            }
        }

        // Linker-defined layout symbols for runtime startup code.
        let low_data = self.base_addr + self.total_code;
        let low_bss = low_data + self.total_data;
        self.add_global("__low_code", self.base_addr, 0, None);
        self.add_global("__len_code", self.total_code, 0, None);
        self.add_global("__low_data", low_data, 0, None);
        self.add_global("__len_data", self.total_data, 0, None);
        self.add_global("__low_bss", low_bss, 0, None);
        self.add_global("__len_bss", self.total_bss, 0, None);

        self.info(format!(
            "Layout: CODE={:06X}-{:06X}, DATA={:06X}-{:06X}, BSS={:06X}-{:06X}",
            self.base_addr,
            self.base_addr.wrapping_add(self.total_code.wrapping_sub(1)),
            low_data,
            low_data.wrapping_add(self.total_data.wrapping_sub(1)),
            low_bss,
            low_bss.wrapping_add(self.total_bss.wrapping_sub(1)),
        ));
    }
}
