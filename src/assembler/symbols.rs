// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Symbol table with export/extern flags and local-label scoping.
//!
//! Symbols live in a packed array with a case-sensitive hash index over the
//! names. Externs are additionally kept as an insertion-ordered list; the
//! position in that list is the `ext_index` written into relocation records
//! and must be stable across the two passes.

use std::collections::HashMap;

use crate::core::int24::Int24;
use crate::core::objformat::{Section, SymbolFlag};

use super::Pass;

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub value: Int24,
    pub section: Section,
    pub flag: SymbolFlag,
    pub defined: bool,
    pub pass1_value: Int24,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
    externs: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn externs(&self) -> &[String] {
        &self.externs
    }

    fn add(&mut self, name: &str, section: Section) -> usize {
        let idx = self.symbols.len();
        self.symbols.push(Symbol {
            name: name.to_string(),
            value: 0,
            section,
            flag: SymbolFlag::Local,
            defined: false,
            pass1_value: 0,
        });
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Define `name` at `value` in `section`. Redefinition is an error in
    /// pass 1 only; pass 2 re-walks the same source and re-defines every
    /// symbol with the (identical) pass-2 value.
    pub fn define(
        &mut self,
        name: &str,
        value: Int24,
        section: Section,
        pass: Pass,
    ) -> Result<(), String> {
        let idx = match self.index.get(name) {
            Some(&idx) => {
                let sym = &self.symbols[idx];
                if sym.defined && pass == Pass::One {
                    return Err(format!("symbol '{name}' already defined"));
                }
                if sym.flag == SymbolFlag::Extern {
                    return Err(format!("cannot define external symbol '{name}'"));
                }
                idx
            }
            None => self.add(name, section),
        };

        let sym = &mut self.symbols[idx];
        sym.value = value;
        sym.section = section;
        sym.defined = true;
        if pass == Pass::One {
            sym.pass1_value = value;
        }
        Ok(())
    }

    /// Mark `name` as exported, creating it if necessary.
    pub fn set_export(&mut self, name: &str) {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => self.add(name, Section::Abs),
        };
        self.symbols[idx].flag = SymbolFlag::Export;
    }

    /// Mark `name` as an external reference and register it in the externs
    /// list. Externs are undefined and absolute by construction.
    pub fn set_extern(&mut self, name: &str) -> Result<(), String> {
        let idx = match self.index.get(name) {
            Some(&idx) => {
                if self.symbols[idx].defined {
                    return Err(format!(
                        "cannot declare defined symbol '{name}' as external"
                    ));
                }
                idx
            }
            None => self.add(name, Section::Abs),
        };
        self.symbols[idx].flag = SymbolFlag::Extern;
        self.symbols[idx].section = Section::Abs;

        if !self.externs.iter().any(|e| e == name) {
            // ext_index is a 16-bit field in the relocation record
            if self.externs.len() >= usize::from(u16::MAX) {
                return Err("too many external symbols".to_string());
            }
            self.externs.push(name.to_string());
        }
        Ok(())
    }

    pub fn is_extern(&self, name: &str) -> bool {
        self.extern_index(name).is_some()
    }

    /// Index of `name` in the externs list, the `ext_index` of relocations.
    pub fn extern_index(&self, name: &str) -> Option<u16> {
        self.externs
            .iter()
            .position(|e| e == name)
            .map(|i| i as u16)
    }
}

/// A label whose first character is `@` is local to the current scope.
pub fn is_local(name: &str) -> bool {
    name.starts_with('@')
}

/// Mangle a local label with the current scope number. `:` cannot occur in
/// user identifiers, so mangled names never collide with source names.
pub fn mangle_local(name: &str, scope: u32) -> String {
    format!("{name}:{scope}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_lookup() {
        let mut table = SymbolTable::new();
        table.define("start", 0x100, Section::Code, Pass::One).unwrap();
        let sym = table.find("start").unwrap();
        assert_eq!(sym.value, 0x100);
        assert_eq!(sym.section, Section::Code);
        assert!(sym.defined);
        assert_eq!(sym.pass1_value, 0x100);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut table = SymbolTable::new();
        table.define("Main", 1, Section::Code, Pass::One).unwrap();
        assert!(table.find("main").is_none());
        assert!(table.find("Main").is_some());
    }

    #[test]
    fn redefinition_errors_in_pass1_only() {
        let mut table = SymbolTable::new();
        table.define("x", 1, Section::Code, Pass::One).unwrap();
        assert!(table.define("x", 2, Section::Code, Pass::One).is_err());
        table.define("x", 1, Section::Code, Pass::Two).unwrap();
    }

    #[test]
    fn extern_cannot_be_defined() {
        let mut table = SymbolTable::new();
        table.set_extern("_printf").unwrap();
        let err = table
            .define("_printf", 5, Section::Code, Pass::One)
            .unwrap_err();
        assert!(err.contains("external"));
        let sym = table.find("_printf").unwrap();
        assert_eq!(sym.section, Section::Abs);
        assert!(!sym.defined);
    }

    #[test]
    fn defined_symbol_cannot_become_extern() {
        let mut table = SymbolTable::new();
        table.define("x", 1, Section::Code, Pass::One).unwrap();
        assert!(table.set_extern("x").is_err());
    }

    #[test]
    fn extern_indices_are_insertion_ordered_and_deduplicated() {
        let mut table = SymbolTable::new();
        table.set_extern("b").unwrap();
        table.set_extern("a").unwrap();
        table.set_extern("b").unwrap();
        assert_eq!(table.externs(), &["b".to_string(), "a".to_string()]);
        assert_eq!(table.extern_index("b"), Some(0));
        assert_eq!(table.extern_index("a"), Some(1));
        assert_eq!(table.extern_index("c"), None);
    }

    #[test]
    fn local_label_mangling() {
        assert!(is_local("@loop"));
        assert!(!is_local("loop"));
        assert_eq!(mangle_local("@loop", 3), "@loop:3");
    }
}
