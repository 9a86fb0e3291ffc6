// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! CB-prefixed bit tests and rotates/shifts.
//!
//! For indexed forms the displacement byte precedes the CB opcode byte, a
//! quirk inherited from the Z80 DDCB/FDCB encoding.

use crate::core::int24::{Int24, MASK8};

use super::super::operand::{Operand, Reg};
use super::super::Assembler;
use super::reg8_code;

impl Assembler {
    /// BIT (base 0x40), RES (0x80), SET (0xC0).
    pub(super) fn encode_bit_op(&mut self, base: u8, name: &str) -> Result<(), ()> {
        self.advance();
        let bit = self.parse_operand()?;
        self.expect_comma()?;
        let op = self.parse_operand()?;

        let b = operand_value(&bit);
        if !(0..=7).contains(&b) {
            self.error("bit number must be 0-7");
            return Err(());
        }
        let opcode = base | ((b as u8) << 3);

        if self.emit_cb_form(opcode, &op) {
            return Ok(());
        }
        self.error(format!("invalid operands for {name}"));
        Err(())
    }

    /// RLC/RRC/RL/RR/SLA/SRA/SRL share the CB page with the register field
    /// in the low bits.
    pub(super) fn encode_shift(&mut self, opcode: u8, name: &str) -> Result<(), ()> {
        self.advance();
        let op = self.parse_operand()?;

        if self.emit_cb_form(opcode, &op) {
            return Ok(());
        }
        self.error(format!("invalid operand for {name}"));
        Err(())
    }

    fn emit_cb_form(&mut self, opcode: u8, op: &Operand) -> bool {
        match op {
            Operand::Reg(reg) => {
                if let Some(r) = reg8_code(*reg) {
                    self.emit_byte(0xCB);
                    self.emit_byte(opcode | r);
                    return true;
                }
                false
            }
            Operand::IndReg(Reg::Hl) => {
                self.emit_byte(0xCB);
                self.emit_byte(opcode | 6);
                true
            }
            Operand::IxOff(disp) | Operand::IyOff(disp) => {
                self.emit_byte(if matches!(op, Operand::IyOff(_)) {
                    0xFD
                } else {
                    0xDD
                });
                self.emit_byte(0xCB);
                // displacement comes before the opcode byte
                self.emit_byte((disp.value & MASK8) as u8);
                self.emit_byte(opcode | 6);
                true
            }
            _ => false,
        }
    }
}

fn operand_value(op: &Operand) -> Int24 {
    match op {
        Operand::Imm(v) | Operand::Addr(v) => v.value,
        _ => 0,
    }
}
