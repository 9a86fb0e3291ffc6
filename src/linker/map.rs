// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Map file: memory layout, per-object section placement, and the global
//! symbol table with each symbol's origin.

use std::io::{self, Write};
use std::path::Path;

use super::Linker;

impl Linker {
    pub fn write_map(&self, path: &Path) -> io::Result<()> {
        let mut out = Vec::new();

        writeln!(out, "eZ80 Linker Map File")?;
        writeln!(out, "====================")?;
        writeln!(out)?;

        let low_data = self.base_addr + self.total_code;
        let low_bss = low_data + self.total_data;
        writeln!(out, "Memory Layout:")?;
        writeln!(
            out,
            "  CODE: {:06X} - {:06X} ({} bytes)",
            self.base_addr,
            self.base_addr.wrapping_add(self.total_code.wrapping_sub(1)),
            self.total_code
        )?;
        writeln!(
            out,
            "  DATA: {:06X} - {:06X} ({} bytes)",
            low_data,
            low_data.wrapping_add(self.total_data.wrapping_sub(1)),
            self.total_data
        )?;
        writeln!(
            out,
            "  BSS:  {:06X} - {:06X} ({} bytes)",
            low_bss,
            low_bss.wrapping_add(self.total_bss.wrapping_sub(1)),
            self.total_bss
        )?;
        writeln!(out)?;

        writeln!(out, "Object Files:")?;
        for obj in &self.objects {
            writeln!(out, "  {}", obj.filename.display())?;
            writeln!(
                out,
                "    CODE: {:06X} ({} bytes)",
                obj.code_base, obj.header.code_size
            )?;
            writeln!(
                out,
                "    DATA: {:06X} ({} bytes)",
                obj.data_base, obj.header.data_size
            )?;
            writeln!(
                out,
                "    BSS:  {:06X} ({} bytes)",
                obj.bss_base, obj.header.bss_size
            )?;
        }
        writeln!(out)?;

        writeln!(out, "Symbols:")?;
        writeln!(out, "  {:<24} {:<8} {}", "Name", "Address", "Object")?;
        writeln!(out, "  {:<24} {:<8} {}", "----", "-------", "------")?;
        for sym in &self.symbols {
            writeln!(
                out,
                "  {:<24} {:06X}   {}",
                sym.name,
                sym.value,
                self.origin_name(sym.origin)
            )?;
        }

        std::fs::write(path, out)
    }
}
