// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Expression evaluation with relocatable-symbol tracking.
//!
//! Precedence is primary, then `*`/`/`, then `+`/`-`; unary `+`/`-` bind to
//! primaries. An expression result carries at most one relocatable symbol:
//! addition lets a symbol flow through from either side, and subtraction of
//! two symbols in the same non-absolute section cancels them to a constant.
//! In pass 1 an unknown identifier evaluates to 0 and is marked relocatable
//! so PC advancement is stable across passes; in pass 2 it is an error
//! unless the name was declared external.

use crate::core::int24::Int24;
use crate::core::objformat::{Section, SymbolFlag};

use super::lexer::TokenKind;
use super::symbols::{is_local, mangle_local};
use super::{Assembler, Pass};

/// An evaluated expression: a constant, or a value relative to the section
/// of the single tracked symbol.
#[derive(Debug, Clone, Default)]
pub struct ExprValue {
    pub value: Int24,
    pub symbol: Option<String>,
}

impl ExprValue {
    pub fn constant(value: Int24) -> Self {
        Self {
            value,
            symbol: None,
        }
    }

    pub fn is_reloc(&self) -> bool {
        self.symbol.is_some()
    }
}

/// How symbols combine under subtraction.
enum SubSymbols {
    Cancel,
    ExternDiff,
    TakeRight,
    KeepLeft,
}

impl Assembler {
    /// Parse and evaluate an expression starting at the current token.
    pub(crate) fn parse_expression(&mut self) -> ExprValue {
        self.expr_add()
    }

    fn expr_primary(&mut self) -> ExprValue {
        let tok = self.tok().clone();
        match tok.kind {
            TokenKind::Number | TokenKind::Char => {
                self.advance();
                ExprValue::constant(tok.value)
            }
            TokenKind::Dollar => {
                self.advance();
                ExprValue::constant(self.pc)
            }
            TokenKind::Ident => {
                self.advance();
                self.expr_ident(&tok.text)
            }
            TokenKind::LParen => {
                self.advance();
                let val = self.expr_add();
                if self.tok().kind == TokenKind::RParen {
                    self.advance();
                } else {
                    self.error("expected ')'");
                }
                val
            }
            TokenKind::Minus => {
                self.advance();
                let mut val = self.expr_primary();
                val.value = val.value.wrapping_neg();
                val
            }
            TokenKind::Plus => {
                self.advance();
                self.expr_primary()
            }
            _ => ExprValue::constant(0),
        }
    }

    fn expr_ident(&mut self, name: &str) -> ExprValue {
        let lookup = if is_local(name) {
            mangle_local(name, self.local_scope)
        } else {
            name.to_string()
        };

        match self.symbols.find(&lookup) {
            Some(sym) if sym.defined => {
                let mut val = ExprValue::constant(sym.value);
                if sym.section != Section::Abs {
                    val.symbol = Some(lookup);
                }
                val
            }
            Some(sym) if sym.flag == SymbolFlag::Extern => ExprValue {
                value: 0,
                symbol: Some(lookup),
            },
            _ if self.pass == Pass::One => ExprValue {
                // Forward reference: relocatable zero keeps pass-1 sizing
                // identical to pass 2.
                value: 0,
                symbol: Some(lookup),
            },
            _ => {
                self.error(format!("undefined symbol '{name}'"));
                ExprValue::constant(0)
            }
        }
    }

    fn expr_mul(&mut self) -> ExprValue {
        let mut lhs = self.expr_primary();

        while matches!(self.tok().kind, TokenKind::Star | TokenKind::Slash) {
            let op = self.tok().kind;
            self.advance();
            let rhs = self.expr_primary();

            // A 24-bit absolute relocation cannot scale an address at link
            // time, so a symbol on either side is an error here.
            if lhs.is_reloc() || rhs.is_reloc() {
                self.error("relocatable expression cannot be multiplied or divided");
                lhs.symbol = None;
            }

            if op == TokenKind::Star {
                lhs.value = lhs.value.wrapping_mul(rhs.value);
            } else if rhs.value == 0 {
                self.error("division by zero");
                lhs.value = 0;
            } else {
                lhs.value /= rhs.value;
            }
        }

        lhs
    }

    fn expr_add(&mut self) -> ExprValue {
        let mut lhs = self.expr_mul();

        while matches!(self.tok().kind, TokenKind::Plus | TokenKind::Minus) {
            let op = self.tok().kind;
            self.advance();
            let rhs = self.expr_mul();

            if op == TokenKind::Plus {
                lhs.value = lhs.value.wrapping_add(rhs.value);
                if lhs.symbol.is_none() {
                    lhs.symbol = rhs.symbol;
                }
                // Both sides relocatable: keep the left symbol.
            } else {
                lhs.value = lhs.value.wrapping_sub(rhs.value);
                let action = match (lhs.symbol.as_deref(), rhs.symbol.as_deref()) {
                    // Same-section difference is a link-time constant.
                    (Some(l), Some(r)) if self.same_nonabs_section(l, r) => SubSymbols::Cancel,
                    (Some(l), Some(r))
                        if self.symbols.is_extern(l) && self.symbols.is_extern(r) =>
                    {
                        SubSymbols::ExternDiff
                    }
                    // Negated symbol reference: unusual, preserved.
                    (None, Some(_)) => SubSymbols::TakeRight,
                    _ => SubSymbols::KeepLeft,
                };
                match action {
                    SubSymbols::Cancel => lhs.symbol = None,
                    SubSymbols::ExternDiff => {
                        self.error("difference of two external symbols");
                        lhs.symbol = None;
                    }
                    SubSymbols::TakeRight => lhs.symbol = rhs.symbol,
                    SubSymbols::KeepLeft => {}
                }
            }
        }

        lhs
    }

    fn same_nonabs_section(&self, a: &str, b: &str) -> bool {
        match (self.symbols.find(a), self.symbols.find(b)) {
            (Some(sa), Some(sb)) => {
                sa.defined
                    && sb.defined
                    && sa.section == sb.section
                    && sa.section != Section::Abs
            }
            _ => false,
        }
    }
}
