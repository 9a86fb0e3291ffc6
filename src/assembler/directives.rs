// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Assembly directives.
//!
//! Every directive also answers to a `.`-prefixed alias. `equ` and the `=`
//! infix form are routed here by the line processor with the label already
//! extracted.

use crate::core::int24::{MASK16, MASK24, MASK8};
use crate::core::objformat::Section;

use super::lexer::TokenKind;
use super::symbols::is_local;
use super::{Assembler, Dispatch, Pass};

impl Assembler {
    /// Execute `name` as a directive. Returns [`Dispatch::NotFound`] when
    /// the name is no directive; directive errors are already diagnosed and
    /// count as handled.
    pub(crate) fn directive_execute(&mut self, name: &str) -> Dispatch {
        let stripped = name.strip_prefix('.').unwrap_or(name);
        let lower = stripped.to_ascii_lowercase();

        match lower.as_str() {
            "org" => self.dir_org(),
            "db" | "defb" | "byte" => self.dir_db(),
            "dw" | "defw" | "word" => self.dir_dw(),
            "dl" | "defl" | "long" | "dd" => self.dir_dl(),
            "ds" | "defs" | "rmb" | "blkb" => self.dir_ds(),
            "section" | "segment" => self.dir_section(),
            "xdef" | "public" | "global" => self.dir_xdef(),
            "xref" | "extern" | "external" => self.dir_xref(),
            "end" => self.dir_end(),
            "align" => self.dir_align(),
            "ascii" => {
                self.dir_ascii();
            }
            "asciz" | "asciiz" => self.dir_asciz(),
            "assume" => self.dir_assume(),
            "include" => self.dir_include(),
            "incbin" => self.dir_incbin(),
            _ => return Dispatch::NotFound,
        }
        Dispatch::Handled
    }

    fn dir_org(&mut self) {
        self.advance();
        let val = self.parse_expression();
        if val.is_reloc() {
            self.error("ORG requires constant expression");
            return;
        }
        self.pc = val.value & MASK24;
    }

    /// `label equ expr` / `label = expr`. EQU symbols live in the absolute
    /// section; a relocatable right side is only tolerated in pass 1, where
    /// it can still be an unresolved forward reference.
    pub(crate) fn dir_equ(&mut self, label: &str) {
        if label.is_empty() {
            self.error("EQU requires a label");
            return;
        }

        self.advance();
        let val = self.parse_expression();
        let value = if val.is_reloc() {
            if self.pass == Pass::Two {
                self.error("EQU requires constant expression");
                return;
            }
            0
        } else {
            val.value
        };

        if let Err(msg) = self
            .symbols
            .define(label, value, Section::Abs, self.pass)
        {
            self.error(msg);
        }
    }

    fn dir_db(&mut self) {
        self.advance();
        loop {
            if self.tok().kind == TokenKind::String {
                let bytes = self.tok().bytes.clone();
                for b in bytes {
                    self.emit_byte(b);
                }
                self.advance();
            } else {
                let val = self.parse_expression();
                if val.is_reloc() {
                    self.error("DB cannot use relocatable symbols, use DL");
                    return;
                }
                self.emit_byte((val.value & MASK8) as u8);
            }

            if self.tok().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
    }

    fn dir_dw(&mut self) {
        self.advance();
        loop {
            let val = self.parse_expression();
            if val.is_reloc() {
                self.error("DW cannot use relocatable symbols, use DL");
                return;
            }
            self.emit_word((val.value & MASK16) as u32);

            if self.tok().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
    }

    fn dir_dl(&mut self) {
        self.advance();
        loop {
            let val = self.parse_expression();
            if let Some(symbol) = &val.symbol {
                let symbol = symbol.clone();
                self.record_reloc(&symbol);
            }
            self.emit_long((val.value & MASK24) as u32);

            if self.tok().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
    }

    fn dir_ds(&mut self) {
        self.advance();
        let count = self.parse_expression();
        if count.is_reloc() {
            self.error("DS requires constant expression");
            return;
        }

        let mut fill = 0;
        if self.tok().kind == TokenKind::Comma {
            self.advance();
            fill = self.parse_expression().value;
        }

        // In BSS this only advances the section size; no bytes are stored.
        for _ in 0..count.value.max(0) {
            self.emit_byte((fill & MASK8) as u8);
        }
    }

    fn dir_section(&mut self) {
        self.advance();
        if self.tok().kind != TokenKind::Ident {
            self.error("SECTION requires name");
            return;
        }
        let name = self.tok().text.clone();
        let lower = name.to_ascii_lowercase();

        let section = match lower.as_str() {
            "code" | "text" | ".text" => Section::Code,
            "data" | ".data" => Section::Data,
            "bss" | ".bss" => Section::Bss,
            _ => {
                self.warning(format!("unknown section '{name}', using CODE"));
                Section::Code
            }
        };
        self.switch_section(section);
        self.advance();
    }

    fn dir_xdef(&mut self) {
        self.advance();
        while self.tok().kind == TokenKind::Ident {
            let name = self.tok().text.clone();
            if is_local(&name) {
                self.error("local labels cannot be exported");
                return;
            }
            self.symbols.set_export(&name);
            self.advance();

            if self.tok().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
    }

    fn dir_xref(&mut self) {
        self.advance();
        while self.tok().kind == TokenKind::Ident {
            let name = self.tok().text.clone();
            if is_local(&name) {
                self.error("local labels cannot be external references");
                return;
            }
            if let Err(msg) = self.symbols.set_extern(&name) {
                self.error(msg);
                return;
            }
            self.advance();

            if self.tok().kind != TokenKind::Comma {
                break;
            }
            self.advance();
        }
    }

    /// `end` terminates nothing and emits nothing; it is a syntactic
    /// sentinel only.
    fn dir_end(&mut self) {}

    fn dir_align(&mut self) {
        self.advance();
        let val = self.parse_expression();
        if val.is_reloc() {
            self.error("ALIGN requires constant expression");
            return;
        }
        let align = val.value;
        if align <= 0 || (align & (align - 1)) != 0 {
            self.error("ALIGN must be power of 2");
            return;
        }
        while self.pc & (align - 1) != 0 {
            self.emit_byte(0);
        }
    }

    fn dir_ascii(&mut self) -> bool {
        self.advance();
        if self.tok().kind != TokenKind::String {
            self.error("ASCII requires string");
            return false;
        }
        let bytes = self.tok().bytes.clone();
        for b in bytes {
            self.emit_byte(b);
        }
        self.advance();
        true
    }

    fn dir_asciz(&mut self) {
        if self.dir_ascii() {
            self.emit_byte(0);
        }
    }

    /// Only `ASSUME ADL=1` is accepted: this assembler targets ADL mode
    /// exclusively.
    fn dir_assume(&mut self) {
        self.advance();
        if self.tok().kind != TokenKind::Ident || !self.tok().text.eq_ignore_ascii_case("adl") {
            self.error("ASSUME expects ADL=0 or ADL=1");
            return;
        }
        self.advance();
        if self.tok().kind != TokenKind::Equals {
            self.error("ASSUME expects ADL=0 or ADL=1");
            return;
        }
        self.advance();
        if self.tok().kind != TokenKind::Number {
            self.error("ASSUME expects ADL=0 or ADL=1");
            return;
        }
        match self.tok().value {
            1 => {}
            0 => {
                self.error("this assembler only supports ADL mode (ADL=1)");
                return;
            }
            _ => {
                self.error("ASSUME expects ADL=0 or ADL=1");
                return;
            }
        }
        self.advance();
    }

    /// Textual inclusion: the named file is processed line by line in
    /// place, with the file/line context saved and restored around it.
    fn dir_include(&mut self) {
        self.advance();
        if self.tok().kind != TokenKind::String {
            self.error("INCLUDE requires filename string");
            return;
        }
        let filename = self.tok().text.clone();
        self.advance();

        let source = match std::fs::read_to_string(&filename) {
            Ok(source) => source,
            Err(_) => {
                self.error(format!("cannot open include file '{filename}'"));
                return;
            }
        };

        let saved_file = std::mem::replace(&mut self.filename, filename);
        let saved_line = self.line_num;

        let lines: Vec<&str> = source.lines().collect();
        self.process_lines(&lines);

        self.filename = saved_file;
        self.line_num = saved_line;
    }

    /// Literal binary concatenation into the current section.
    fn dir_incbin(&mut self) {
        self.advance();
        if self.tok().kind != TokenKind::String {
            self.error("INCBIN requires filename string");
            return;
        }
        let filename = self.tok().text.clone();
        self.advance();

        let bytes = match std::fs::read(&filename) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.error(format!("cannot open binary file '{filename}'"));
                return;
            }
        };
        for b in bytes {
            self.emit_byte(b);
        }
    }
}
