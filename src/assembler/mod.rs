// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Two-pass eZ80 ADL-mode assembler.
//!
//! Pass 1 collects symbols and sizes the sections; pass 2 re-walks the same
//! lines, emits bytes into the per-section scratch streams, and records
//! relocations. All shared state lives in one [`Assembler`] context that is
//! threaded through the lexer, expression evaluator, directives, and
//! instruction encoders.

pub mod cli;
mod directives;
mod emit;
mod encode;
pub mod expr;
pub mod lexer;
pub mod operand;
mod output;
pub mod symbols;

use std::path::Path;

use crate::core::diag::{Diagnostic, RunReport};
use crate::core::int24::Int24;
use crate::core::objformat::{ObjRelocRecord, Section};

use lexer::{Lexer, Token, TokenKind};
use symbols::{is_local, mangle_local, SymbolTable};

/// Longest accepted source line.
pub const MAX_LINE_LEN: usize = 512;

/// Which of the two passes is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    One,
    Two,
}

/// Outcome of a dispatch attempt: the name was handled (successfully or
/// with a diagnostic already recorded), or it is not known to this table.
pub(crate) enum Dispatch {
    Handled,
    NotFound,
}

/// Assembler context: symbol table, section state, scratch streams, and
/// diagnostics for one translation unit.
pub struct Assembler {
    pub(crate) symbols: SymbolTable,
    pub(crate) lexer: Lexer,
    pub(crate) report: RunReport,

    pub(crate) pass: Pass,
    pub(crate) filename: String,
    pub(crate) line_num: u32,

    pub(crate) current_section: Section,
    pub(crate) pc: Int24,
    pub(crate) code_pc: Int24,
    pub(crate) data_pc: Int24,
    pub(crate) bss_pc: Int24,

    pub(crate) code: Vec<u8>,
    pub(crate) data: Vec<u8>,
    pub(crate) bss_size: u32,
    pub(crate) relocs: Vec<ObjRelocRecord>,

    pub(crate) local_scope: u32,
    pass1_pcs: [Int24; 3],
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            lexer: Lexer::new(),
            report: RunReport::new(),
            pass: Pass::One,
            filename: String::new(),
            line_num: 0,
            current_section: Section::Code,
            pc: 0,
            code_pc: 0,
            data_pc: 0,
            bss_pc: 0,
            code: Vec::new(),
            data: Vec::new(),
            bss_size: 0,
            relocs: Vec::new(),
            local_scope: 0,
            pass1_pcs: [0; 3],
        }
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// End-of-pass-1 PC per section (code, data, bss); equals the pass-2
    /// values and the header byte counts for well-formed input.
    pub fn pass1_section_pcs(&self) -> [Int24; 3] {
        self.pass1_pcs
    }

    /// Current per-section PCs with the active section's live PC folded in.
    pub fn section_pcs(&self) -> [Int24; 3] {
        let mut pcs = [self.code_pc, self.data_pc, self.bss_pc];
        match self.current_section {
            Section::Code => pcs[0] = self.pc,
            Section::Data => pcs[1] = self.pc,
            Section::Bss => pcs[2] = self.pc,
            Section::Abs => {}
        }
        pcs
    }

    /// Assemble a whole translation unit: pass 1 over all lines, then, if
    /// it was error-free, pass 2.
    pub fn assemble_source(&mut self, filename: &str, source: &str) {
        self.filename = filename.to_string();
        let lines: Vec<&str> = source.lines().collect();

        self.reset_pass(Pass::One);
        self.process_lines(&lines);
        self.pass1_pcs = self.section_pcs();

        if self.report.has_errors() {
            return;
        }

        self.reset_pass(Pass::Two);
        self.process_lines(&lines);
    }

    /// Load and assemble a source file.
    pub fn assemble_file(&mut self, path: &Path) {
        match std::fs::read_to_string(path) {
            Ok(source) => self.assemble_source(&path.display().to_string(), &source),
            Err(_) => {
                self.report
                    .push(Diagnostic::error(format!("cannot open '{}'", path.display())));
            }
        }
    }

    fn reset_pass(&mut self, pass: Pass) {
        self.pass = pass;
        self.line_num = 0;
        self.current_section = Section::Code;
        self.pc = 0;
        self.code_pc = 0;
        self.data_pc = 0;
        self.bss_pc = 0;
        self.code.clear();
        self.data.clear();
        self.bss_size = 0;
        self.relocs.clear();
        self.local_scope = 0;
    }

    /// Feed a block of lines through the line processor, tracking line
    /// numbers. Also the re-entry point for `include`.
    pub(crate) fn process_lines(&mut self, lines: &[&str]) {
        self.line_num = 0;
        for line in lines {
            self.line_num += 1;
            let mut line = *line;
            if line.len() > MAX_LINE_LEN - 2 {
                self.error(format!("line too long (max {} characters)", MAX_LINE_LEN - 2));
                // Only the remainder past the cutoff is discarded; the
                // prefix still assembles.
                let mut end = MAX_LINE_LEN - 2;
                while !line.is_char_boundary(end) {
                    end -= 1;
                }
                line = &line[..end];
            }
            self.process_line(line);
        }
    }

    /// One source line: optional label, then an instruction or directive.
    fn process_line(&mut self, line: &str) {
        self.lexer.init(line);
        self.advance();
        if self.tok().is_end() {
            return;
        }

        let mut label = String::new();

        if self.tok().kind == TokenKind::Label {
            label = self.tok().text.clone();
            self.advance();
            if !self.is_equ_intro() {
                self.define_label_at_pc(&label);
            }
        } else if self.tok().kind == TokenKind::Ident {
            let peeked = self.lexer.peek();
            let is_equ_ident = peeked.kind == TokenKind::Ident
                && (peeked.text.eq_ignore_ascii_case("equ")
                    || peeked.text.eq_ignore_ascii_case(".equ"));
            if peeked.kind == TokenKind::Equals || is_equ_ident {
                // `label = expr` and colon-less `label equ expr`
                label = self.tok().text.clone();
                self.advance();
            }
        }

        if self.tok().is_end() {
            return;
        }

        if self.tok().kind == TokenKind::Equals {
            if label.is_empty() {
                self.error("= requires a label");
                return;
            }
            self.dir_equ(&label);
            return;
        }

        if self.tok().kind != TokenKind::Ident {
            self.error("expected instruction or directive");
            return;
        }
        let mnemonic = self.tok().text.clone();

        if mnemonic.eq_ignore_ascii_case("equ") || mnemonic.eq_ignore_ascii_case(".equ") {
            self.dir_equ(&label);
            return;
        }

        if matches!(self.instr_execute(&mnemonic), Dispatch::Handled) {
            return;
        }
        if matches!(self.directive_execute(&mnemonic), Dispatch::Handled) {
            return;
        }
        self.error(format!("unknown instruction or directive '{mnemonic}'"));
    }

    /// True when the current token starts an EQU definition, in which case
    /// the pending label must not be defined at the PC.
    fn is_equ_intro(&self) -> bool {
        match self.tok().kind {
            TokenKind::Equals => true,
            TokenKind::Ident => {
                self.tok().text.eq_ignore_ascii_case("equ")
                    || self.tok().text.eq_ignore_ascii_case(".equ")
            }
            _ => false,
        }
    }

    /// Define a code/data/bss label at the current PC. A non-local label
    /// opens a fresh scope for subsequent `@`-labels.
    fn define_label_at_pc(&mut self, label: &str) {
        let result = if is_local(label) {
            let mangled = mangle_local(label, self.local_scope);
            self.symbols
                .define(&mangled, self.pc, self.current_section, self.pass)
        } else {
            let result = self
                .symbols
                .define(label, self.pc, self.current_section, self.pass);
            self.local_scope += 1;
            result
        };
        if let Err(msg) = result {
            self.error(msg);
        }
    }

    pub(crate) fn advance(&mut self) -> TokenKind {
        let kind = self.lexer.advance();
        if let Some(msg) = self.lexer.take_error() {
            self.error(msg);
        }
        kind
    }

    pub(crate) fn tok(&self) -> &Token {
        self.lexer.current()
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let diag = Diagnostic::error(message).at(&self.filename, self.line_num);
        self.report.push(diag);
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        let diag = Diagnostic::warning(message).at(&self.filename, self.line_num);
        self.report.push(diag);
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}
