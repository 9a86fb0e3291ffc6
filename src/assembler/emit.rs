// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Byte emission and relocation recording.
//!
//! Pass 1 only advances the program counter; pass 2 additionally appends to
//! the per-section scratch streams. BSS never holds bytes, it only grows.
//! A relocation is recorded immediately before the 24-bit field it covers,
//! so its offset is the current length of the section stream.

use crate::core::objformat::{ObjRelocRecord, Section, RELOC_ADDR24};

use super::{Assembler, Pass};

impl Assembler {
    pub(crate) fn emit_byte(&mut self, byte: u8) {
        if self.pass == Pass::Two {
            match self.current_section {
                Section::Code => self.code.push(byte),
                Section::Data => self.data.push(byte),
                Section::Bss => self.bss_size += 1,
                Section::Abs => {}
            }
        }
        self.pc = self.pc.wrapping_add(1);
    }

    pub(crate) fn emit_word(&mut self, word: u32) {
        self.emit_byte((word & 0xFF) as u8);
        self.emit_byte(((word >> 8) & 0xFF) as u8);
    }

    pub(crate) fn emit_long(&mut self, long: u32) {
        self.emit_byte((long & 0xFF) as u8);
        self.emit_byte(((long >> 8) & 0xFF) as u8);
        self.emit_byte(((long >> 16) & 0xFF) as u8);
    }

    /// Record a 24-bit absolute relocation for `symbol` at the next emission
    /// offset of the current section. The bytes emitted afterwards are the
    /// section-relative value (local symbols) or zero (externals); the
    /// linker adds the target base.
    pub(crate) fn record_reloc(&mut self, symbol: &str) {
        if self.pass != Pass::Two {
            return;
        }

        let offset = match self.current_section {
            Section::Code => self.code.len() as u32,
            _ => self.data.len() as u32,
        };

        let (target_sect, ext_index) = match self.symbols.extern_index(symbol) {
            Some(idx) => (0u8, idx),
            None => {
                let target = match self.symbols.find(symbol) {
                    Some(sym) if sym.defined => sym.section,
                    _ => self.current_section,
                };
                (target as u8, 0)
            }
        };

        self.relocs.push(ObjRelocRecord {
            offset,
            section: self.current_section as u8,
            reloc_type: RELOC_ADDR24,
            target_sect,
            ext_index,
        });
    }

    /// Save the current PC into the outgoing section's slot and restore the
    /// incoming section's PC.
    pub(crate) fn switch_section(&mut self, section: Section) {
        match self.current_section {
            Section::Code => self.code_pc = self.pc,
            Section::Data => self.data_pc = self.pc,
            Section::Bss => self.bss_pc = self.pc,
            Section::Abs => {}
        }
        self.current_section = section;
        self.pc = match section {
            Section::Code => self.code_pc,
            Section::Data => self.data_pc,
            Section::Bss => self.bss_pc,
            Section::Abs => self.pc,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::int24::Int24;

    #[test]
    fn pass1_advances_pc_without_bytes() {
        let mut asm = Assembler::new();
        asm.emit_long(0x123456);
        assert_eq!(asm.pc, 3);
        assert!(asm.code.is_empty());
    }

    #[test]
    fn pass2_writes_little_endian_streams() {
        let mut asm = Assembler::new();
        asm.pass = Pass::Two;
        asm.emit_word(0x1234);
        asm.emit_long(0xABCDEF);
        assert_eq!(asm.code, &[0x34, 0x12, 0xEF, 0xCD, 0xAB]);
        assert_eq!(asm.pc, 5);
    }

    #[test]
    fn bss_counts_without_emitting() {
        let mut asm = Assembler::new();
        asm.pass = Pass::Two;
        asm.switch_section(Section::Bss);
        asm.emit_byte(0);
        asm.emit_byte(0);
        assert_eq!(asm.bss_size, 2);
        assert!(asm.code.is_empty() && asm.data.is_empty());
    }

    #[test]
    fn section_switch_saves_and_restores_pc() {
        let mut asm = Assembler::new();
        asm.pass = Pass::Two;
        asm.emit_byte(0xAA); // code pc = 1
        asm.switch_section(Section::Data);
        assert_eq!(asm.pc, 0);
        asm.emit_byte(0xBB);
        asm.switch_section(Section::Code);
        assert_eq!(asm.pc, 1);
        asm.switch_section(Section::Data);
        assert_eq!(asm.pc, 1);
    }

    #[test]
    fn reloc_offsets_follow_stream_length() {
        let mut asm = Assembler::new();
        asm.pass = Pass::Two;
        asm.symbols
            .define("here", 0, Section::Code, Pass::One)
            .unwrap();
        asm.emit_byte(0x21);
        asm.record_reloc("here");
        asm.emit_long(0);
        let reloc = &asm.relocs[0];
        assert_eq!(reloc.offset, 1);
        assert_eq!(reloc.section, Section::Code as u8);
        assert_eq!(reloc.target_sect, Section::Code as u8);
        assert_eq!(reloc.ext_index, 0);
    }

    #[test]
    fn extern_reloc_carries_index() {
        let mut asm = Assembler::new();
        asm.pass = Pass::Two;
        asm.symbols.set_extern("_a").unwrap();
        asm.symbols.set_extern("_b").unwrap();
        asm.record_reloc("_b");
        let reloc = &asm.relocs[0];
        assert_eq!(reloc.target_sect, 0);
        assert_eq!(reloc.ext_index, 1);
    }

    #[test]
    fn pc_wraps_as_int24_arithmetic() {
        let mut asm = Assembler::new();
        asm.pc = Int24::MAX;
        asm.emit_byte(0);
        assert_eq!(asm.pc, Int24::MIN);
    }
}
