// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Control flow: jumps, calls, returns, restarts, interrupt mode, and the
//! stack group (PUSH/POP/EX).

use crate::core::int24::{is_signed_8bit, MASK8};

use super::super::expr::ExprValue;
use super::super::operand::{Cond, Operand, Reg};
use super::super::{Assembler, Pass};
use super::{reg8_code, reg16_qq_code};

impl Assembler {
    pub(super) fn encode_jp(&mut self) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        match &op {
            Operand::IndReg(Reg::Hl) => {
                self.emit_byte(0xE9);
                return Ok(());
            }
            Operand::IndReg(reg @ (Reg::Ix | Reg::Iy)) => {
                self.emit_idx_reg_prefix(*reg);
                self.emit_byte(0xE9);
                return Ok(());
            }
            _ => {}
        }

        if let Some(cc) = op.condition() {
            self.error_if_missing_comma("expected comma after condition")?;
            let addr = self.parse_operand()?;
            let val = match &addr {
                Operand::Imm(v) | Operand::Addr(v) => v.clone(),
                _ => {
                    self.error("JP requires address operand");
                    return Err(());
                }
            };
            self.emit_byte(0xC2 | (cc.code() << 3));
            self.emit_reloc_long(&val);
            return Ok(());
        }

        if let Operand::Imm(val) | Operand::Addr(val) = &op {
            let val = val.clone();
            self.emit_byte(0xC3);
            self.emit_reloc_long(&val);
            return Ok(());
        }

        self.error("invalid operand for JP");
        Err(())
    }

    pub(super) fn encode_jr(&mut self) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        if let Some(cc) = op.condition() {
            if cc.code() > Cond::C.code() {
                self.error("JR only supports NZ, Z, NC, C conditions");
                return Err(());
            }
            self.error_if_missing_comma("expected comma after condition")?;
            let addr = self.parse_operand()?;
            let val = match &addr {
                Operand::Imm(v) | Operand::Addr(v) => v.clone(),
                _ => {
                    self.error("invalid operand for JR");
                    return Err(());
                }
            };
            self.reject_extern_target(&val, "JR")?;
            self.emit_byte(0x20 | (cc.code() << 3));
            self.emit_relative_disp(&val, "JR");
            return Ok(());
        }

        if let Operand::Imm(val) = &op {
            let val = val.clone();
            self.reject_extern_target(&val, "JR")?;
            self.emit_byte(0x18);
            self.emit_relative_disp(&val, "JR");
            return Ok(());
        }

        self.error("invalid operand for JR");
        Err(())
    }

    pub(super) fn encode_djnz(&mut self) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        let Operand::Imm(val) = &op else {
            self.error("DJNZ requires address operand");
            return Err(());
        };
        let val = val.clone();
        self.reject_extern_target(&val, "DJNZ")?;
        self.emit_byte(0x10);
        self.emit_relative_disp(&val, "DJNZ");
        Ok(())
    }

    pub(super) fn encode_call(&mut self) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        if let Some(cc) = op.condition() {
            self.error_if_missing_comma("expected comma after condition")?;
            let addr = self.parse_operand()?;
            let val = match &addr {
                Operand::Imm(v) | Operand::Addr(v) => v.clone(),
                _ => {
                    self.error("CALL requires address operand");
                    return Err(());
                }
            };
            self.emit_byte(0xC4 | (cc.code() << 3));
            self.emit_reloc_long(&val);
            return Ok(());
        }

        if let Operand::Imm(val) | Operand::Addr(val) = &op {
            let val = val.clone();
            self.emit_byte(0xCD);
            self.emit_reloc_long(&val);
            return Ok(());
        }

        self.error("invalid operand for CALL");
        Err(())
    }

    pub(super) fn encode_ret(&mut self) -> Result<(), ()> {
        self.advance();

        if self.tok().is_end() {
            self.emit_byte(0xC9);
            return Ok(());
        }

        let op = self.parse_operand()?;
        if let Some(cc) = op.condition() {
            self.emit_byte(0xC0 | (cc.code() << 3));
            return Ok(());
        }

        self.error("invalid operand for RET");
        Err(())
    }

    /// RST, with the `.LIL` suffix variant emitting 0x5B ahead of the
    /// restart opcode. Accepts vector numbers 0-7 (scaled by 8) or the
    /// pre-scaled vectors 0x00..=0x38.
    pub(super) fn encode_rst(&mut self, lil: bool) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        let Operand::Imm(val) = &op else {
            self.error("RST requires immediate operand");
            return Err(());
        };
        let v = val.value;
        let vec = if (0..=7).contains(&v) {
            (v << 3) as u8
        } else if (v & 0x07) == 0 && (0..=0x38).contains(&v) {
            v as u8
        } else {
            self.error("invalid RST vector (use 0-7 or 0x00-0x38)");
            return Err(());
        };

        if lil {
            self.emit_byte(0x5B);
        }
        self.emit_byte(0xC7 | vec);
        Ok(())
    }

    pub(super) fn encode_im(&mut self) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        let Operand::Imm(val) = &op else {
            self.error("IM requires immediate operand");
            return Err(());
        };
        let opcode = match val.value {
            0 => 0x46,
            1 => 0x56,
            2 => 0x5E,
            _ => {
                self.error("invalid interrupt mode");
                return Err(());
            }
        };
        self.emit_byte(0xED);
        self.emit_byte(opcode);
        Ok(())
    }

    /// PUSH (base 0xC5, index op 0xE5) and POP (0xC1/0xE1).
    pub(super) fn encode_push_pop(
        &mut self,
        qq_base: u8,
        idx_op: u8,
        name: &str,
    ) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        let Operand::Reg(reg) = op else {
            self.error(format!("{name} requires register operand"));
            return Err(());
        };

        if let Some(qq) = reg16_qq_code(reg) {
            self.emit_byte(qq_base | (qq << 4));
            return Ok(());
        }
        if matches!(reg, Reg::Ix | Reg::Iy) {
            self.emit_idx_reg_prefix(reg);
            self.emit_byte(idx_op);
            return Ok(());
        }

        self.error(format!("invalid register for {name}"));
        Err(())
    }

    pub(super) fn encode_ex(&mut self) -> Result<(), ()> {
        self.advance();
        let op1 = self.parse_operand()?;
        self.expect_comma()?;
        let op2 = self.parse_operand()?;

        match (&op1, &op2) {
            (Operand::Reg(Reg::De), Operand::Reg(Reg::Hl)) => {
                self.emit_byte(0xEB);
                Ok(())
            }
            (Operand::Reg(Reg::Af), Operand::Reg(Reg::AfAlt)) => {
                self.emit_byte(0x08);
                Ok(())
            }
            (Operand::IndReg(Reg::Sp), Operand::Reg(Reg::Hl)) => {
                self.emit_byte(0xE3);
                Ok(())
            }
            (Operand::IndReg(Reg::Sp), Operand::Reg(reg @ (Reg::Ix | Reg::Iy))) => {
                self.emit_idx_reg_prefix(*reg);
                self.emit_byte(0xE3);
                Ok(())
            }
            _ => {
                self.error("invalid operands for EX");
                Err(())
            }
        }
    }

    /// IN/OUT through the accumulator port form and the (C) form.
    pub(super) fn encode_in_out(&mut self, is_out: bool, name: &str) -> Result<(), ()> {
        self.advance();
        let op1 = self.parse_operand()?;
        self.expect_comma()?;
        let op2 = self.parse_operand()?;

        let (reg_op, other_op) = if is_out { (&op2, &op1) } else { (&op1, &op2) };

        if let (Operand::Reg(Reg::A), Operand::Addr(val)) = (reg_op, other_op) {
            self.emit_byte(if is_out { 0xD3 } else { 0xDB });
            self.emit_byte((val.value & MASK8) as u8);
            return Ok(());
        }

        if let (Operand::Reg(reg), Operand::IndReg(Reg::C)) = (reg_op, other_op) {
            if let Some(r) = reg8_code(*reg) {
                self.emit_byte(0xED);
                self.emit_byte(0x40 | (r << 3) | u8::from(is_out));
                return Ok(());
            }
        }

        self.error(format!("invalid operands for {name}"));
        Err(())
    }

    /// IN0 r,(n) / OUT0 (n),r — page-zero I/O.
    pub(super) fn encode_in0_out0(&mut self, is_out: bool, name: &str) -> Result<(), ()> {
        self.advance();
        let op1 = self.parse_operand()?;
        self.expect_comma()?;
        let op2 = self.parse_operand()?;

        let (reg_op, addr_op) = if is_out { (&op2, &op1) } else { (&op1, &op2) };

        if let (Operand::Reg(reg), Operand::Addr(val)) = (reg_op, addr_op) {
            if let Some(r) = reg8_code(*reg) {
                self.emit_byte(0xED);
                self.emit_byte((r << 3) | u8::from(is_out));
                self.emit_byte((val.value & MASK8) as u8);
                return Ok(());
            }
        }

        self.error(format!("invalid operands for {name}"));
        Err(())
    }

    /// Relative displacement from the byte after the displacement itself:
    /// `target - (pc_after_opcode + 1)`. Out of range is an error in pass 2.
    fn emit_relative_disp(&mut self, val: &ExprValue, name: &str) {
        let offset = val.value.wrapping_sub(self.pc.wrapping_add(1));
        if !is_signed_8bit(offset) && self.pass == Pass::Two {
            self.error(format!("{name} offset out of range"));
        }
        self.emit_byte((offset & MASK8) as u8);
    }

    fn reject_extern_target(&mut self, val: &ExprValue, name: &str) -> Result<(), ()> {
        if let Some(symbol) = &val.symbol {
            if self.symbols.is_extern(symbol) {
                self.error(format!("{name} cannot use external symbols"));
                return Err(());
            }
        }
        Ok(())
    }

    fn error_if_missing_comma(&mut self, message: &str) -> Result<(), ()> {
        if self.tok().kind != super::super::lexer::TokenKind::Comma {
            self.error(message);
            return Err(());
        }
        self.advance();
        Ok(())
    }
}
