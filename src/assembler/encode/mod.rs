// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Instruction encoding for the eZ80 in ADL mode.
//!
//! Dispatch is two-tiered: simple no-operand instructions come from a sorted
//! `(mnemonic, prefix, opcode)` table, everything else routes to a handler
//! that consumes classified operands. Mnemonics are lowercased before lookup.

mod alu;
mod bits;
mod control;
mod ld;
mod misc;

use super::operand::Reg;
use super::{Assembler, Dispatch};

/// Simple instructions: a fixed opcode with an optional prefix byte
/// (0 = none). Sorted by mnemonic for binary search.
const SIMPLE_TABLE: &[(&str, u8, u8)] = &[
    ("ccf", 0x00, 0x3F),
    ("cpd", 0xED, 0xA9),
    ("cpdr", 0xED, 0xB9),
    ("cpi", 0xED, 0xA1),
    ("cpir", 0xED, 0xB1),
    ("cpl", 0x00, 0x2F),
    ("daa", 0x00, 0x27),
    ("di", 0x00, 0xF3),
    ("ei", 0x00, 0xFB),
    ("exx", 0x00, 0xD9),
    ("halt", 0x00, 0x76),
    ("ind", 0xED, 0xAA),
    ("indr", 0xED, 0xBA),
    ("ini", 0xED, 0xA2),
    ("inir", 0xED, 0xB2),
    ("ldd", 0xED, 0xA8),
    ("lddr", 0xED, 0xB8),
    ("ldi", 0xED, 0xA0),
    ("ldir", 0xED, 0xB0),
    ("neg", 0xED, 0x44),
    ("nop", 0x00, 0x00),
    ("otdr", 0xED, 0xBB),
    ("otir", 0xED, 0xB3),
    ("outd", 0xED, 0xAB),
    ("outi", 0xED, 0xA3),
    ("reti", 0xED, 0x4D),
    ("retn", 0xED, 0x45),
    ("rla", 0x00, 0x17),
    ("rlca", 0x00, 0x07),
    ("rld", 0xED, 0x6F),
    ("rra", 0x00, 0x1F),
    ("rrca", 0x00, 0x0F),
    ("rrd", 0xED, 0x67),
    ("rsmix", 0xED, 0x7E),
    ("scf", 0x00, 0x37),
    ("slp", 0xED, 0x76),
    ("stmix", 0xED, 0x7D),
];

fn simple_lookup(lower: &str) -> Option<(u8, u8)> {
    SIMPLE_TABLE
        .binary_search_by(|entry| entry.0.cmp(lower))
        .ok()
        .map(|idx| (SIMPLE_TABLE[idx].1, SIMPLE_TABLE[idx].2))
}

impl Assembler {
    /// Try to encode `mnemonic`. Returns [`Dispatch::NotFound`] when the
    /// name is no instruction; encoding errors are already diagnosed and
    /// count as handled.
    pub(crate) fn instr_execute(&mut self, mnemonic: &str) -> Dispatch {
        let lower = mnemonic.to_ascii_lowercase();

        if let Some((prefix, opcode)) = simple_lookup(&lower) {
            self.advance();
            if prefix != 0 {
                self.emit_byte(prefix);
            }
            self.emit_byte(opcode);
            if !self.tok().is_end() {
                self.error("unexpected content after instruction");
            }
            return Dispatch::Handled;
        }

        let result = match lower.as_str() {
            "adc" => self.encode_adc_sbc(1, 0x4A, false, "ADC"),
            "adc.s" => self.encode_adc_sbc(1, 0x4A, true, "ADC.S"),
            "add" => self.encode_add(false, "ADD"),
            "add.s" => self.encode_add(true, "ADD.S"),
            "and" => self.encode_alu_simple(4, "AND"),
            "bit" => self.encode_bit_op(0x40, "BIT"),
            "call" => self.encode_call(),
            "cp" => self.encode_alu_simple(7, "CP"),
            "dec" => self.encode_inc_dec(0x05, 0x0B, 0x2B, 0x35, "DEC"),
            "djnz" => self.encode_djnz(),
            "ex" => self.encode_ex(),
            "im" => self.encode_im(),
            "in" => self.encode_in_out(false, "IN"),
            "in0" => self.encode_in0_out0(false, "IN0"),
            "inc" => self.encode_inc_dec(0x04, 0x03, 0x23, 0x34, "INC"),
            "jp" => self.encode_jp(),
            "jr" => self.encode_jr(),
            "ld" => self.encode_ld(),
            "lea" => self.encode_lea(),
            "mlt" => self.encode_mlt(),
            "or" => self.encode_alu_simple(6, "OR"),
            "out" => self.encode_in_out(true, "OUT"),
            "out0" => self.encode_in0_out0(true, "OUT0"),
            "pea" => self.encode_pea(),
            "pop" => self.encode_push_pop(0xC1, 0xE1, "POP"),
            "push" => self.encode_push_pop(0xC5, 0xE5, "PUSH"),
            "res" => self.encode_bit_op(0x80, "RES"),
            "ret" => self.encode_ret(),
            "rl" => self.encode_shift(0x10, "RL"),
            "rlc" => self.encode_shift(0x00, "RLC"),
            "rr" => self.encode_shift(0x18, "RR"),
            "rrc" => self.encode_shift(0x08, "RRC"),
            "rst" => self.encode_rst(false),
            "rst.lil" => self.encode_rst(true),
            "sbc" => self.encode_adc_sbc(3, 0x42, false, "SBC"),
            "sbc.s" => self.encode_adc_sbc(3, 0x42, true, "SBC.S"),
            "set" => self.encode_bit_op(0xC0, "SET"),
            "sla" => self.encode_shift(0x20, "SLA"),
            "sra" => self.encode_shift(0x28, "SRA"),
            "srl" => self.encode_shift(0x38, "SRL"),
            "sub" => self.encode_alu_simple(2, "SUB"),
            "tst" => self.encode_tst(),
            "xor" => self.encode_alu_simple(5, "XOR"),
            _ => return Dispatch::NotFound,
        };

        if result.is_ok() && !self.tok().is_end() {
            self.error("unexpected content after instruction");
        }
        Dispatch::Handled
    }

    pub(crate) fn expect_comma(&mut self) -> Result<(), ()> {
        if self.tok().kind != super::lexer::TokenKind::Comma {
            self.error("expected comma");
            return Err(());
        }
        self.advance();
        Ok(())
    }

    /// Emit the DD/FD prefix when an index half register is involved.
    /// IX halves and IY halves cannot appear in the same instruction.
    pub(crate) fn index_prefix(&mut self, a: Reg, b: Option<Reg>) -> Result<(), ()> {
        let ix = is_ix_half(a) || b.is_some_and(is_ix_half);
        let iy = is_iy_half(a) || b.is_some_and(is_iy_half);
        if ix && iy {
            self.error("cannot mix IX and IY half registers");
            return Err(());
        }
        if ix {
            self.emit_byte(0xDD);
        } else if iy {
            self.emit_byte(0xFD);
        }
        Ok(())
    }

    /// DD for IX, FD for IY.
    pub(crate) fn emit_idx_reg_prefix(&mut self, reg: Reg) {
        self.emit_byte(if reg == Reg::Ix { 0xDD } else { 0xFD });
    }
}

/// 3-bit register field encoding. Index halves share codes with H and L;
/// the prefix byte selects the register file.
pub(crate) fn reg8_code(reg: Reg) -> Option<u8> {
    match reg {
        Reg::B => Some(0),
        Reg::C => Some(1),
        Reg::D => Some(2),
        Reg::E => Some(3),
        Reg::H | Reg::IxH | Reg::IyH => Some(4),
        Reg::L | Reg::IxL | Reg::IyL => Some(5),
        Reg::A => Some(7),
        _ => None,
    }
}

pub(crate) fn is_ix_half(reg: Reg) -> bool {
    matches!(reg, Reg::IxH | Reg::IxL)
}

pub(crate) fn is_iy_half(reg: Reg) -> bool {
    matches!(reg, Reg::IyH | Reg::IyL)
}

/// `dd` register-pair field: BC, DE, HL, SP.
pub(crate) fn reg16_dd_code(reg: Reg) -> Option<u8> {
    match reg {
        Reg::Bc => Some(0),
        Reg::De => Some(1),
        Reg::Hl => Some(2),
        Reg::Sp => Some(3),
        _ => None,
    }
}

/// `qq` register-pair field for PUSH/POP: BC, DE, HL, AF.
pub(crate) fn reg16_qq_code(reg: Reg) -> Option<u8> {
    match reg {
        Reg::Bc => Some(0),
        Reg::De => Some(1),
        Reg::Hl => Some(2),
        Reg::Af => Some(3),
        _ => None,
    }
}

/// Pair field for `ADD IX/IY, rr`: BC=0 DE=1 SP=3, and 2 when the source is
/// the destination index register itself.
pub(crate) fn idx_pair_code(dest: Reg, src: Reg) -> Option<u8> {
    match src {
        Reg::Bc => Some(0),
        Reg::De => Some(1),
        Reg::Sp => Some(3),
        _ if src == dest => Some(2),
        _ => None,
    }
}
