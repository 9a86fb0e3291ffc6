// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! 8-bit ALU group, 16-bit adds, INC/DEC, MLT, and TST.
//!
//! The 8-bit ALU operations share one encoding keyed by a 3-bit opcode
//! field: ADD=0 ADC=1 SUB=2 SBC=3 AND=4 XOR=5 OR=6 CP=7. The `.S` variants
//! of ADD/ADC/SBC carry a 0x52 suffix byte ahead of the instruction.

use crate::core::int24::MASK8;

use super::super::lexer::TokenKind;
use super::super::operand::{Operand, Reg};
use super::super::Assembler;
use super::{idx_pair_code, reg8_code, reg16_dd_code};

impl Assembler {
    /// Encode an 8-bit ALU operation against `src`. Returns false when the
    /// operand shape is not an 8-bit ALU form.
    fn emit_alu8(&mut self, aluop: u8, src: &Operand) -> Result<bool, ()> {
        match src {
            Operand::Reg(reg) => {
                if let Some(r) = reg8_code(*reg) {
                    self.index_prefix(*reg, None)?;
                    self.emit_byte(0x80 | (aluop << 3) | r);
                    return Ok(true);
                }
            }
            Operand::Imm(val) => {
                self.emit_byte(0xC6 | (aluop << 3));
                self.emit_byte((val.value & MASK8) as u8);
                return Ok(true);
            }
            Operand::IndReg(Reg::Hl) => {
                self.emit_byte(0x86 | (aluop << 3));
                return Ok(true);
            }
            Operand::IxOff(disp) | Operand::IyOff(disp) => {
                self.emit_byte(if matches!(src, Operand::IyOff(_)) {
                    0xFD
                } else {
                    0xDD
                });
                self.emit_byte(0x86 | (aluop << 3));
                self.emit_byte((disp.value & MASK8) as u8);
                return Ok(true);
            }
            _ => {}
        }
        Ok(false)
    }

    /// SUB/AND/XOR/OR/CP: one operand, with the alternate `op a, src` form.
    pub(super) fn encode_alu_simple(&mut self, aluop: u8, name: &str) -> Result<(), ()> {
        self.advance();
        let mut src = self.parse_operand()?;

        if matches!(src, Operand::Reg(Reg::A)) && self.tok().kind == TokenKind::Comma {
            self.advance();
            src = self.parse_operand()?;
        }

        if self.emit_alu8(aluop, &src)? {
            return Ok(());
        }
        self.error(format!("invalid operand for {name}"));
        Err(())
    }

    /// ADD and ADD.S: 8-bit forms plus ADD HL,ss and ADD IX/IY,pp.
    pub(super) fn encode_add(&mut self, s_variant: bool, name: &str) -> Result<(), ()> {
        self.advance();
        let dest = self.parse_operand()?;

        if self.tok().kind != TokenKind::Comma {
            if !s_variant && self.emit_alu8(0, &dest)? {
                return Ok(());
            }
            self.error(format!("invalid operand for {name}"));
            return Err(());
        }
        self.advance();
        let src = self.parse_operand()?;

        if !s_variant && matches!(dest, Operand::Reg(Reg::A)) && self.emit_alu8(0, &src)? {
            return Ok(());
        }

        if let (Operand::Reg(Reg::Hl), Operand::Reg(s)) = (&dest, &src) {
            if let Some(ss) = reg16_dd_code(*s) {
                if s_variant {
                    self.emit_byte(0x52);
                }
                self.emit_byte(0x09 | (ss << 4));
                return Ok(());
            }
        }

        if let (Operand::Reg(d @ (Reg::Ix | Reg::Iy)), Operand::Reg(s)) = (&dest, &src) {
            if let Some(pp) = idx_pair_code(*d, *s) {
                if s_variant {
                    self.emit_byte(0x52);
                }
                self.emit_idx_reg_prefix(*d);
                self.emit_byte(0x09 | (pp << 4));
                return Ok(());
            }
        }

        self.error(format!("invalid operands for {name}"));
        Err(())
    }

    /// ADC/SBC and their .S variants: 8-bit forms plus the ED-prefixed
    /// HL,ss encodings (0x4A for ADC, 0x42 for SBC).
    pub(super) fn encode_adc_sbc(
        &mut self,
        aluop: u8,
        hl_op: u8,
        s_variant: bool,
        name: &str,
    ) -> Result<(), ()> {
        self.advance();
        let dest = self.parse_operand()?;

        if self.tok().kind != TokenKind::Comma {
            if !s_variant && self.emit_alu8(aluop, &dest)? {
                return Ok(());
            }
            self.error(format!("invalid operand for {name}"));
            return Err(());
        }
        self.advance();
        let src = self.parse_operand()?;

        if !s_variant && matches!(dest, Operand::Reg(Reg::A)) && self.emit_alu8(aluop, &src)? {
            return Ok(());
        }

        if let (Operand::Reg(Reg::Hl), Operand::Reg(s)) = (&dest, &src) {
            if let Some(ss) = reg16_dd_code(*s) {
                if s_variant {
                    self.emit_byte(0x52);
                }
                self.emit_byte(0xED);
                self.emit_byte(hl_op | (ss << 4));
                return Ok(());
            }
        }

        self.error(format!("invalid operands for {name}"));
        Err(())
    }

    /// INC and DEC across 8-bit registers, register pairs, index registers,
    /// (HL), and indexed memory.
    pub(super) fn encode_inc_dec(
        &mut self,
        r8_base: u8,
        r16_base: u8,
        idx_op: u8,
        ind_op: u8,
        name: &str,
    ) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        match &op {
            Operand::Reg(reg) => {
                if let Some(r) = reg8_code(*reg) {
                    self.index_prefix(*reg, None)?;
                    self.emit_byte(r8_base | (r << 3));
                    return Ok(());
                }
                if let Some(ss) = reg16_dd_code(*reg) {
                    self.emit_byte(r16_base | (ss << 4));
                    return Ok(());
                }
                if matches!(reg, Reg::Ix | Reg::Iy) {
                    self.emit_idx_reg_prefix(*reg);
                    self.emit_byte(idx_op);
                    return Ok(());
                }
            }
            Operand::IndReg(Reg::Hl) => {
                self.emit_byte(ind_op);
                return Ok(());
            }
            Operand::IxOff(disp) | Operand::IyOff(disp) => {
                self.emit_byte(if matches!(op, Operand::IyOff(_)) {
                    0xFD
                } else {
                    0xDD
                });
                self.emit_byte(ind_op);
                self.emit_byte((disp.value & MASK8) as u8);
                return Ok(());
            }
            _ => {}
        }

        self.error(format!("invalid operand for {name}"));
        Err(())
    }

    /// MLT rr: 8x8 multiply of a register pair.
    pub(super) fn encode_mlt(&mut self) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        let Operand::Reg(reg) = op else {
            self.error("MLT requires register operand");
            return Err(());
        };
        let Some(ss) = reg16_dd_code(reg) else {
            self.error("MLT requires BC, DE, HL, or SP");
            return Err(());
        };
        self.emit_byte(0xED);
        self.emit_byte(0x4C | (ss << 4));
        Ok(())
    }

    /// TST r / TST n, with the optional `a,` prefix.
    pub(super) fn encode_tst(&mut self) -> Result<(), ()> {
        self.advance();
        let mut op = self.parse_operand()?;

        if matches!(op, Operand::Reg(Reg::A)) && self.tok().kind == TokenKind::Comma {
            self.advance();
            op = self.parse_operand()?;
        }

        match &op {
            Operand::Reg(reg) => {
                if let Some(r) = reg8_code(*reg) {
                    self.emit_byte(0xED);
                    self.emit_byte(0x04 | (r << 3));
                    return Ok(());
                }
            }
            Operand::Imm(val) => {
                self.emit_byte(0xED);
                self.emit_byte(0x64);
                self.emit_byte((val.value & MASK8) as u8);
                return Ok(());
            }
            _ => {}
        }

        self.error("invalid operand for TST");
        Err(())
    }
}
