// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! The LD decision tree, including the eZ80 24-bit register-pair loads
//! through (HL), (IX+d), and (IY+d).

use crate::core::int24::{MASK24, MASK8};

use super::super::operand::{Operand, Reg};
use super::super::Assembler;
use super::{is_ix_half, is_iy_half, reg8_code, reg16_dd_code};

/// Fixed-encoding register pairs: SP from HL/IX/IY, and the interrupt page
/// and MB transfers with A.
const LD_SPECIAL_PAIRS: &[(Reg, Reg, u8, u8)] = &[
    (Reg::Sp, Reg::Hl, 0x00, 0xF9),
    (Reg::Sp, Reg::Ix, 0xDD, 0xF9),
    (Reg::Sp, Reg::Iy, 0xFD, 0xF9),
    (Reg::I, Reg::A, 0xED, 0x47),
    (Reg::R, Reg::A, 0xED, 0x4F),
    (Reg::A, Reg::I, 0xED, 0x57),
    (Reg::A, Reg::R, 0xED, 0x5F),
    (Reg::A, Reg::Mb, 0xED, 0x6E),
    (Reg::Mb, Reg::A, 0xED, 0x6D),
];

/// eZ80 16-bit loads and stores through (HL)/(IX+d)/(IY+d). The prefix
/// depends on the base (ED for HL, DD for IX, FD for IY); the opcode comes
/// from this table. BC/DE/HL rows are regular, the IX and IY rows are not
/// and must never be computed.
struct LdRr16Entry {
    reg: Reg,
    load_hl: u8,
    store_hl: u8,
    load_ix: u8,
    store_ix: u8,
    load_iy: u8,
    store_iy: u8,
}

const LD_RR16_TABLE: &[LdRr16Entry] = &[
    LdRr16Entry { reg: Reg::Bc, load_hl: 0x07, store_hl: 0x0F, load_ix: 0x07, store_ix: 0x0F, load_iy: 0x07, store_iy: 0x0F },
    LdRr16Entry { reg: Reg::De, load_hl: 0x17, store_hl: 0x1F, load_ix: 0x17, store_ix: 0x1F, load_iy: 0x17, store_iy: 0x1F },
    LdRr16Entry { reg: Reg::Hl, load_hl: 0x27, store_hl: 0x2F, load_ix: 0x27, store_ix: 0x2F, load_iy: 0x27, store_iy: 0x2F },
    LdRr16Entry { reg: Reg::Ix, load_hl: 0x37, store_hl: 0x3F, load_ix: 0x37, store_ix: 0x3E, load_iy: 0x31, store_iy: 0x3D },
    LdRr16Entry { reg: Reg::Iy, load_hl: 0x31, store_hl: 0x3E, load_ix: 0x31, store_ix: 0x3D, load_iy: 0x37, store_iy: 0x3E },
];

fn find_ld_rr16(reg: Reg) -> Option<&'static LdRr16Entry> {
    LD_RR16_TABLE.iter().find(|entry| entry.reg == reg)
}

impl Assembler {
    pub(super) fn encode_ld(&mut self) -> Result<(), ()> {
        self.advance();
        let dest = self.parse_operand()?;
        self.expect_comma()?;
        let src = self.parse_operand()?;

        match (&dest, &src) {
            (Operand::Reg(d), Operand::Reg(s)) => {
                // LD r, r' including index halves
                if let (Some(dc), Some(sc)) = (reg8_code(*d), reg8_code(*s)) {
                    return self.ld_reg8_pair(*d, *s, dc, sc);
                }
                for &(pd, ps, prefix, opcode) in LD_SPECIAL_PAIRS {
                    if *d == pd && *s == ps {
                        if prefix != 0 {
                            self.emit_byte(prefix);
                        }
                        self.emit_byte(opcode);
                        return Ok(());
                    }
                }
            }

            (Operand::Reg(d), Operand::Imm(val)) => {
                if let Some(dc) = reg8_code(*d) {
                    self.index_prefix(*d, None)?;
                    self.emit_byte(0x06 | (dc << 3));
                    self.emit_byte((val.value & MASK8) as u8);
                    return Ok(());
                }
                if let Some(dd) = reg16_dd_code(*d) {
                    self.emit_byte(0x01 | (dd << 4));
                    self.emit_reloc_long(val);
                    return Ok(());
                }
                if matches!(d, Reg::Ix | Reg::Iy) {
                    self.emit_idx_reg_prefix(*d);
                    self.emit_byte(0x21);
                    self.emit_reloc_long(val);
                    return Ok(());
                }
            }

            (Operand::Reg(d), Operand::IndReg(Reg::Hl)) => {
                if let Some(entry) = find_ld_rr16(*d) {
                    self.emit_byte(0xED);
                    self.emit_byte(entry.load_hl);
                    return Ok(());
                }
                if let Some(dc) = reg8_code(*d) {
                    self.emit_byte(0x46 | (dc << 3));
                    return Ok(());
                }
            }

            (Operand::IndReg(Reg::Hl), Operand::Reg(s)) => {
                if let Some(entry) = find_ld_rr16(*s) {
                    self.emit_byte(0xED);
                    self.emit_byte(entry.store_hl);
                    return Ok(());
                }
                if let Some(sc) = reg8_code(*s) {
                    self.emit_byte(0x70 | sc);
                    return Ok(());
                }
            }

            (Operand::IndReg(Reg::Hl), Operand::Imm(val)) => {
                self.emit_byte(0x36);
                self.emit_byte((val.value & MASK8) as u8);
                return Ok(());
            }

            (Operand::Reg(d), Operand::IxOff(disp) | Operand::IyOff(disp)) => {
                let is_iy = matches!(src, Operand::IyOff(_));
                if let Some(dc) = reg8_code(*d) {
                    self.emit_byte(if is_iy { 0xFD } else { 0xDD });
                    self.emit_byte(0x46 | (dc << 3));
                    self.emit_byte((disp.value & MASK8) as u8);
                    return Ok(());
                }
                if let Some(entry) = find_ld_rr16(*d) {
                    self.emit_byte(if is_iy { 0xFD } else { 0xDD });
                    self.emit_byte(if is_iy { entry.load_iy } else { entry.load_ix });
                    self.emit_byte((disp.value & MASK8) as u8);
                    return Ok(());
                }
            }

            (Operand::IxOff(disp) | Operand::IyOff(disp), Operand::Reg(s)) => {
                let is_iy = matches!(dest, Operand::IyOff(_));
                if let Some(sc) = reg8_code(*s) {
                    self.emit_byte(if is_iy { 0xFD } else { 0xDD });
                    self.emit_byte(0x70 | sc);
                    self.emit_byte((disp.value & MASK8) as u8);
                    return Ok(());
                }
                if let Some(entry) = find_ld_rr16(*s) {
                    self.emit_byte(if is_iy { 0xFD } else { 0xDD });
                    self.emit_byte(if is_iy { entry.store_iy } else { entry.store_ix });
                    self.emit_byte((disp.value & MASK8) as u8);
                    return Ok(());
                }
            }

            (Operand::IxOff(disp) | Operand::IyOff(disp), Operand::Imm(val)) => {
                let is_iy = matches!(dest, Operand::IyOff(_));
                self.emit_byte(if is_iy { 0xFD } else { 0xDD });
                self.emit_byte(0x36);
                self.emit_byte((disp.value & MASK8) as u8);
                self.emit_byte((val.value & MASK8) as u8);
                return Ok(());
            }

            (Operand::Reg(Reg::A), Operand::IndReg(Reg::Bc)) => {
                self.emit_byte(0x0A);
                return Ok(());
            }
            (Operand::Reg(Reg::A), Operand::IndReg(Reg::De)) => {
                self.emit_byte(0x1A);
                return Ok(());
            }
            (Operand::IndReg(Reg::Bc), Operand::Reg(Reg::A)) => {
                self.emit_byte(0x02);
                return Ok(());
            }
            (Operand::IndReg(Reg::De), Operand::Reg(Reg::A)) => {
                self.emit_byte(0x12);
                return Ok(());
            }

            (Operand::Reg(Reg::A), Operand::Addr(val)) => {
                self.emit_byte(0x3A);
                self.emit_reloc_long(val);
                return Ok(());
            }
            (Operand::Addr(val), Operand::Reg(Reg::A)) => {
                self.emit_byte(0x32);
                self.emit_reloc_long(val);
                return Ok(());
            }
            (Operand::Reg(Reg::Hl), Operand::Addr(val)) => {
                self.emit_byte(0x2A);
                self.emit_reloc_long(val);
                return Ok(());
            }
            (Operand::Addr(val), Operand::Reg(Reg::Hl)) => {
                self.emit_byte(0x22);
                self.emit_reloc_long(val);
                return Ok(());
            }

            (Operand::Reg(d), Operand::Addr(val)) => {
                if let Some(dd) = reg16_dd_code(*d) {
                    self.emit_byte(0xED);
                    self.emit_byte(0x4B | (dd << 4));
                    self.emit_reloc_long(val);
                    return Ok(());
                }
                if matches!(d, Reg::Ix | Reg::Iy) {
                    self.emit_idx_reg_prefix(*d);
                    self.emit_byte(0x2A);
                    self.emit_reloc_long(val);
                    return Ok(());
                }
            }

            (Operand::Addr(val), Operand::Reg(s)) => {
                if let Some(dd) = reg16_dd_code(*s) {
                    self.emit_byte(0xED);
                    self.emit_byte(0x43 | (dd << 4));
                    self.emit_reloc_long(val);
                    return Ok(());
                }
                if matches!(s, Reg::Ix | Reg::Iy) {
                    self.emit_idx_reg_prefix(*s);
                    self.emit_byte(0x22);
                    self.emit_reloc_long(val);
                    return Ok(());
                }
            }

            _ => {}
        }

        self.error("invalid operands for LD");
        Err(())
    }

    fn ld_reg8_pair(&mut self, d: Reg, s: Reg, dc: u8, sc: u8) -> Result<(), ()> {
        let ix = is_ix_half(d) || is_ix_half(s);
        let iy = is_iy_half(d) || is_iy_half(s);
        if ix && iy {
            self.error("cannot mix IX and IY half registers");
            return Err(());
        }
        if (ix || iy) && matches!(d, Reg::H | Reg::L) || (ix || iy) && matches!(s, Reg::H | Reg::L)
        {
            self.error("cannot use H or L with index half registers");
            return Err(());
        }
        if ix {
            self.emit_byte(0xDD);
        } else if iy {
            self.emit_byte(0xFD);
        }
        self.emit_byte(0x40 | (dc << 3) | sc);
        Ok(())
    }

    /// Emit a 24-bit field, recording a relocation first when the value is
    /// relocatable.
    pub(crate) fn emit_reloc_long(&mut self, val: &super::super::expr::ExprValue) {
        if let Some(symbol) = val.symbol.clone() {
            self.record_reloc(&symbol);
        }
        self.emit_long((val.value & MASK24) as u32);
    }
}
