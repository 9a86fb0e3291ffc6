// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Operand classification: one pass over the token stream yields a typed
//! operand record for the instruction encoders.

use super::expr::ExprValue;
use super::lexer::TokenKind;
use super::Assembler;

/// Register identifiers. Values are never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    A,
    B,
    C,
    D,
    E,
    H,
    L,
    IxH,
    IxL,
    IyH,
    IyL,
    I,
    R,
    Mb,
    Af,
    Bc,
    De,
    Hl,
    Sp,
    Ix,
    Iy,
    AfAlt,
}

/// Condition codes in their 3-bit encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Nz = 0,
    Z = 1,
    Nc = 2,
    C = 3,
    Po = 4,
    Pe = 5,
    P = 6,
    M = 7,
}

impl Cond {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Register name table, sorted by lowercase name for binary search.
const REG_TABLE: &[(&str, Reg)] = &[
    ("a", Reg::A),
    ("af", Reg::Af),
    ("af'", Reg::AfAlt),
    ("b", Reg::B),
    ("bc", Reg::Bc),
    ("c", Reg::C),
    ("d", Reg::D),
    ("de", Reg::De),
    ("e", Reg::E),
    ("h", Reg::H),
    ("hl", Reg::Hl),
    ("i", Reg::I),
    ("ix", Reg::Ix),
    ("ixh", Reg::IxH),
    ("ixl", Reg::IxL),
    ("iy", Reg::Iy),
    ("iyh", Reg::IyH),
    ("iyl", Reg::IyL),
    ("l", Reg::L),
    ("mb", Reg::Mb),
    ("r", Reg::R),
    ("sp", Reg::Sp),
];

/// Condition name table, sorted by lowercase name for binary search.
const COND_TABLE: &[(&str, Cond)] = &[
    ("c", Cond::C),
    ("m", Cond::M),
    ("nc", Cond::Nc),
    ("nz", Cond::Nz),
    ("p", Cond::P),
    ("pe", Cond::Pe),
    ("po", Cond::Po),
    ("z", Cond::Z),
];

pub fn parse_register(name: &str) -> Option<Reg> {
    let lower = name.to_ascii_lowercase();
    REG_TABLE
        .binary_search_by(|entry| entry.0.cmp(lower.as_str()))
        .ok()
        .map(|idx| REG_TABLE[idx].1)
}

pub fn parse_condition(name: &str) -> Option<Cond> {
    let lower = name.to_ascii_lowercase();
    COND_TABLE
        .binary_search_by(|entry| entry.0.cmp(lower.as_str()))
        .ok()
        .map(|idx| COND_TABLE[idx].1)
}

/// A classified operand.
#[derive(Debug, Clone)]
pub enum Operand {
    Reg(Reg),
    Cond(Cond),
    Imm(ExprValue),
    Addr(ExprValue),
    IndReg(Reg),
    IxOff(ExprValue),
    IyOff(ExprValue),
}

impl Operand {
    /// Condition view of this operand. The token `C` always classifies as
    /// `Reg(C)`; instructions that admit a condition retry through here.
    pub fn condition(&self) -> Option<Cond> {
        match self {
            Operand::Cond(cc) => Some(*cc),
            Operand::Reg(Reg::C) => Some(Cond::C),
            _ => None,
        }
    }
}

impl Assembler {
    /// Classify the operand starting at the current token.
    pub(crate) fn parse_operand(&mut self) -> Result<Operand, ()> {
        let tok = self.tok().clone();

        // Indirection: ( register ) / ( IX|IY ± d ) / ( expression )
        if tok.kind == TokenKind::LParen {
            self.advance();
            if self.tok().kind == TokenKind::Ident {
                match parse_register(&self.tok().text) {
                    Some(reg @ (Reg::Hl | Reg::Bc | Reg::De | Reg::Sp | Reg::C)) => {
                        self.advance();
                        self.expect_rparen()?;
                        return Ok(Operand::IndReg(reg));
                    }
                    Some(reg @ (Reg::Ix | Reg::Iy)) => {
                        self.advance();
                        if self.tok().kind == TokenKind::RParen {
                            self.advance();
                            return Ok(Operand::IndReg(reg));
                        }
                        if !matches!(self.tok().kind, TokenKind::Plus | TokenKind::Minus) {
                            self.error("expected ')'");
                            return Err(());
                        }
                        let disp = self.parse_index_displacement();
                        self.expect_rparen()?;
                        return Ok(index_offset(reg, disp));
                    }
                    _ => {}
                }
            }

            // General expression in parentheses: absolute memory operand
            let val = self.parse_expression();
            self.expect_rparen()?;
            return Ok(Operand::Addr(val));
        }

        if tok.kind == TokenKind::Ident {
            if let Some(reg) = parse_register(&tok.text) {
                self.advance();

                // IX+d / IY+d without parentheses (LEA/PEA source syntax)
                if matches!(reg, Reg::Ix | Reg::Iy)
                    && matches!(self.tok().kind, TokenKind::Plus | TokenKind::Minus)
                {
                    let disp = self.parse_index_displacement();
                    return Ok(index_offset(reg, disp));
                }

                return Ok(Operand::Reg(reg));
            }

            if let Some(cc) = parse_condition(&tok.text) {
                self.advance();
                return Ok(Operand::Cond(cc));
            }
        }

        Ok(Operand::Imm(self.parse_expression()))
    }

    /// Parse `+ expr` or `- expr` after an index register.
    fn parse_index_displacement(&mut self) -> ExprValue {
        let negate = self.tok().kind == TokenKind::Minus;
        if matches!(self.tok().kind, TokenKind::Plus | TokenKind::Minus) {
            self.advance();
        }
        let mut disp = self.parse_expression();
        if negate {
            disp.value = disp.value.wrapping_neg();
        }
        disp
    }

    fn expect_rparen(&mut self) -> Result<(), ()> {
        if self.tok().kind != TokenKind::RParen {
            self.error("expected ')'");
            return Err(());
        }
        self.advance();
        Ok(())
    }
}

fn index_offset(reg: Reg, disp: ExprValue) -> Operand {
    if reg == Reg::Ix {
        Operand::IxOff(disp)
    } else {
        Operand::IyOff(disp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> Operand {
        let mut asm = Assembler::new();
        asm.lexer.init(text);
        asm.advance();
        asm.parse_operand().expect("operand should classify")
    }

    #[test]
    fn register_names_are_case_insensitive() {
        assert_eq!(parse_register("HL"), Some(Reg::Hl));
        assert_eq!(parse_register("ixh"), Some(Reg::IxH));
        assert_eq!(parse_register("AF'"), Some(Reg::AfAlt));
        assert_eq!(parse_register("foo"), None);
    }

    #[test]
    fn condition_codes() {
        assert_eq!(parse_condition("nz"), Some(Cond::Nz));
        assert_eq!(parse_condition("PE"), Some(Cond::Pe));
        assert_eq!(parse_condition("q"), None);
    }

    #[test]
    fn bare_register_and_condition() {
        assert!(matches!(classify("hl"), Operand::Reg(Reg::Hl)));
        assert!(matches!(classify("nz"), Operand::Cond(Cond::Nz)));
    }

    #[test]
    fn c_is_register_with_condition_view() {
        let op = classify("c");
        assert!(matches!(op, Operand::Reg(Reg::C)));
        assert_eq!(op.condition(), Some(Cond::C));
        assert_eq!(classify("b").condition(), None);
        assert_eq!(classify("m").condition(), Some(Cond::M));
    }

    #[test]
    fn indirect_registers() {
        assert!(matches!(classify("(hl)"), Operand::IndReg(Reg::Hl)));
        assert!(matches!(classify("(c)"), Operand::IndReg(Reg::C)));
        assert!(matches!(classify("(ix)"), Operand::IndReg(Reg::Ix)));
    }

    #[test]
    fn indexed_with_displacement() {
        match classify("(ix+5)") {
            Operand::IxOff(d) => assert_eq!(d.value, 5),
            other => panic!("expected IxOff, got {other:?}"),
        }
        match classify("(iy-3)") {
            Operand::IyOff(d) => assert_eq!(d.value, -3),
            other => panic!("expected IyOff, got {other:?}"),
        }
    }

    #[test]
    fn bare_index_offset_for_lea() {
        match classify("ix+12") {
            Operand::IxOff(d) => assert_eq!(d.value, 12),
            other => panic!("expected IxOff, got {other:?}"),
        }
        match classify("iy-1") {
            Operand::IyOff(d) => assert_eq!(d.value, -1),
            other => panic!("expected IyOff, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_expression_is_address() {
        match classify("(0x1234)") {
            Operand::Addr(v) => assert_eq!(v.value, 0x1234),
            other => panic!("expected Addr, got {other:?}"),
        }
    }

    #[test]
    fn plain_expression_is_immediate() {
        match classify("42+1") {
            Operand::Imm(v) => assert_eq!(v.value, 43),
            other => panic!("expected Imm, got {other:?}"),
        }
    }

    #[test]
    fn missing_rparen_is_an_error() {
        let mut asm = Assembler::new();
        asm.lexer.init("(hl");
        asm.advance();
        assert!(asm.parse_operand().is_err());
        assert!(asm.report.has_errors());
    }
}
