// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! End-to-end linker tests: objects are produced by the real assembler,
//! written to a scratch directory, and linked.

use std::path::{Path, PathBuf};

use crate::assembler::tests::test_dir;
use crate::assembler::Assembler;

use super::Linker;

fn write_object(dir: &Path, name: &str, source: &str) -> PathBuf {
    let mut asm = Assembler::new();
    asm.assemble_source(name, source);
    assert!(
        !asm.report().has_errors(),
        "assembly of {name} failed: {:?}",
        asm.report()
            .diagnostics()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );
    let path = dir.join(name).with_extension("o");
    std::fs::write(&path, asm.object_bytes()).unwrap();
    path
}

fn write_library(dir: &Path, name: &str, sources: &[(&str, &str)]) -> PathBuf {
    let mut archive = Vec::new();
    for (member, source) in sources {
        let mut asm = Assembler::new();
        asm.assemble_source(member, source);
        assert!(!asm.report().has_errors(), "assembly of {member} failed");
        archive.extend_from_slice(&asm.object_bytes());
    }
    let path = dir.join(name);
    std::fs::write(&path, archive).unwrap();
    path
}

fn global_value(linker: &Linker, name: &str) -> u32 {
    linker
        .find_global(name)
        .unwrap_or_else(|| panic!("symbol {name} missing"))
        .value
}

#[test]
fn layout_assigns_bases_in_object_order() {
    let dir = test_dir("layout");
    // 0x10 bytes of code in a, 0x20 in b
    let a = write_object(&dir, "a", "assume adl=1\nxdef a_start\na_start: ds 0x10");
    let b = write_object(&dir, "b", "assume adl=1\nxdef b_start\nb_start: ds 0x20");

    let mut linker = Linker::new(0x40000);
    linker.load_object(&a).unwrap();
    linker.load_object(&b).unwrap();
    linker.resolve_symbols();
    assert!(!linker.report().has_errors());

    assert_eq!(linker.objects()[0].code_base, 0x40000);
    assert_eq!(linker.objects()[1].code_base, 0x40010);
    assert_eq!(global_value(&linker, "a_start"), 0x40000);
    assert_eq!(global_value(&linker, "b_start"), 0x40010);
    assert_eq!(global_value(&linker, "__low_code"), 0x40000);
    assert_eq!(global_value(&linker, "__len_code"), 0x30);

    let image = linker.link_output();
    assert!(!linker.report().has_errors());
    assert_eq!(image.len(), 0x30);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn code_then_data_with_linker_symbols() {
    let dir = test_dir("sections");
    let a = write_object(
        &dir,
        "prog",
        "assume adl=1\n\
         xdef main\n\
         main: nop\n\
         section data\n\
         db 0x5A\n\
         section bss\n\
         ds 8\n",
    );

    let mut linker = Linker::new(0x1000);
    linker.load_object(&a).unwrap();
    linker.resolve_symbols();
    let image = linker.link_output();
    assert!(!linker.report().has_errors());

    assert_eq!(image, vec![0x00, 0x5A]);
    assert_eq!(global_value(&linker, "__low_code"), 0x1000);
    assert_eq!(global_value(&linker, "__len_code"), 1);
    assert_eq!(global_value(&linker, "__low_data"), 0x1001);
    assert_eq!(global_value(&linker, "__len_data"), 1);
    assert_eq!(global_value(&linker, "__low_bss"), 0x1002);
    assert_eq!(global_value(&linker, "__len_bss"), 8);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn relocations_are_patched_against_section_bases() {
    let dir = test_dir("reloc");
    let main = write_object(
        &dir,
        "main",
        "assume adl=1\n\
         xref var\n\
         ld hl, var\n\
         ld de, local\n\
         local: nop\n\
         section data\n\
         var_space: dl var\n",
    );
    let lib = write_object(
        &dir,
        "vars",
        "assume adl=1\n\
         xdef var\n\
         section data\n\
         pad: db 0xFF\n\
         var: db 0x77\n",
    );

    let mut linker = Linker::new(0x40000);
    linker.load_object(&main).unwrap();
    linker.load_object(&lib).unwrap();
    linker.resolve_symbols();
    let image = linker.link_output();
    assert!(
        !linker.report().has_errors(),
        "{:?}",
        linker
            .report()
            .diagnostics()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );

    // main code: 9 code bytes, then main data (dl var: 3), then vars data.
    // var sits at data_base(vars) + 1.
    let var_addr = global_value(&linker, "var");
    assert_eq!(var_addr, 0x40000 + 9 + 3 + 1);
    assert_eq!(&image[0..1], &[0x21]);
    assert_eq!(
        &image[1..4],
        &[
            (var_addr & 0xFF) as u8,
            ((var_addr >> 8) & 0xFF) as u8,
            ((var_addr >> 16) & 0xFF) as u8
        ]
    );
    // ld de, local: local is code offset 8
    let local_addr = 0x40008u32;
    assert_eq!(image[4], 0x11);
    assert_eq!(
        &image[5..8],
        &[
            (local_addr & 0xFF) as u8,
            ((local_addr >> 8) & 0xFF) as u8,
            ((local_addr >> 16) & 0xFF) as u8
        ]
    );
    // the data-section dl var patch
    assert_eq!(
        &image[9..12],
        &[
            (var_addr & 0xFF) as u8,
            ((var_addr >> 8) & 0xFF) as u8,
            ((var_addr >> 16) & 0xFF) as u8
        ]
    );
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn selective_library_loading_pulls_only_needed_members() {
    let dir = test_dir("selective");
    let main = write_object(
        &dir,
        "main",
        "assume adl=1\nxref _printf\ncall _printf",
    );
    let lib = write_library(
        &dir,
        "libc.a",
        &[
            ("printf", "assume adl=1\nxdef _printf\n_printf: db 0xAA\nret"),
            ("unused", "assume adl=1\nxdef _unused\n_unused: db 0xBB\nret"),
        ],
    );

    let mut linker = Linker::new(0);
    linker.load_object(&main).unwrap();
    linker.add_library(&lib).unwrap();
    let loaded = linker.process_libraries();
    assert_eq!(loaded, 1);
    linker.resolve_symbols();
    let image = linker.link_output();
    assert!(!linker.report().has_errors());

    assert!(image.contains(&0xAA));
    assert!(!image.contains(&0xBB));
    assert!(linker.find_global("_printf").is_some());
    assert!(linker.find_global("_unused").is_none());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn library_loading_follows_dependency_chains() {
    let dir = test_dir("chain");
    let main = write_object(&dir, "main", "assume adl=1\nxref _a\ncall _a");
    let lib = write_library(
        &dir,
        "libchain.a",
        &[
            ("c", "assume adl=1\nxdef _c\n_c: ret"),
            ("b", "assume adl=1\nxdef _b\nxref _c\n_b: call _c\nret"),
            ("a", "assume adl=1\nxdef _a\nxref _b\n_a: call _b\nret"),
        ],
    );

    let mut linker = Linker::new(0);
    linker.load_object(&main).unwrap();
    linker.add_library(&lib).unwrap();
    let loaded = linker.process_libraries();
    assert_eq!(loaded, 3);
    linker.resolve_symbols();
    linker.link_output();
    assert!(!linker.report().has_errors());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn resolution_loop_is_idempotent_on_closed_set() {
    let dir = test_dir("idempotent");
    let main = write_object(&dir, "main", "assume adl=1\nxref _a\ncall _a");
    let lib = write_library(
        &dir,
        "liba.a",
        &[("a", "assume adl=1\nxdef _a\n_a: ret")],
    );

    let mut linker = Linker::new(0);
    linker.load_object(&main).unwrap();
    linker.add_library(&lib).unwrap();
    assert_eq!(linker.process_libraries(), 1);
    assert_eq!(linker.process_libraries(), 0);
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn duplicate_exports_are_hard_errors() {
    let dir = test_dir("dup");
    let a = write_object(&dir, "a", "assume adl=1\nxdef thing\nthing: ret");
    let b = write_object(&dir, "b", "assume adl=1\nxdef THING\nTHING: ret");

    let mut linker = Linker::new(0);
    linker.load_object(&a).unwrap();
    linker.load_object(&b).unwrap();
    assert!(linker.report().has_errors());
    assert!(linker
        .report()
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("duplicate symbol")));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn unresolved_external_surfaces_during_relocation() {
    let dir = test_dir("unresolved");
    let main = write_object(&dir, "main", "assume adl=1\nxref _gone\ncall _gone");

    let mut linker = Linker::new(0);
    linker.load_object(&main).unwrap();
    linker.resolve_symbols();
    linker.link_output();
    assert!(linker
        .report()
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("undefined symbol '_gone'")));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cross_object_matching_is_case_insensitive() {
    let dir = test_dir("case");
    let main = write_object(&dir, "main", "assume adl=1\nxref _Helper\ncall _Helper");
    let other = write_object(&dir, "other", "assume adl=1\nxdef _helper\n_helper: ret");

    let mut linker = Linker::new(0);
    linker.load_object(&main).unwrap();
    linker.load_object(&other).unwrap();
    linker.resolve_symbols();
    linker.link_output();
    assert!(!linker.report().has_errors());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn library_search_path_resolves_lib_names() {
    let dir = test_dir("libpath");
    write_library(
        &dir,
        "libm.a",
        &[("m", "assume adl=1\nxdef _sin\n_sin: ret")],
    );

    let mut linker = Linker::new(0);
    linker.add_libdir(&dir);
    assert!(linker.find_and_add_library("m").is_ok());
    assert!(linker.find_and_add_library("nope").is_err());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn invalid_library_member_magic_is_fatal() {
    let dir = test_dir("badlib");
    let mut archive = Vec::new();
    let mut asm = Assembler::new();
    asm.assemble_source("ok", "assume adl=1\nxdef _x\n_x: ret");
    archive.extend_from_slice(&asm.object_bytes());
    archive.extend_from_slice(&[0xFF; 32]);
    let path = dir.join("libbad.a");
    std::fs::write(&path, archive).unwrap();

    let mut linker = Linker::new(0);
    assert!(linker.add_library(&path).is_err());
    assert!(linker
        .report()
        .diagnostics()
        .iter()
        .any(|d| d.message.contains("invalid object at offset")));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn linking_is_deterministic() {
    let dir = test_dir("determinism");
    let a = write_object(
        &dir,
        "a",
        "assume adl=1\nxdef entry\nxref _b\nentry: call _b\nsection data\ndl entry",
    );
    let b = write_object(&dir, "b", "assume adl=1\nxdef _b\n_b: ret");

    let link = || {
        let mut linker = Linker::new(0x2000);
        linker.load_object(&a).unwrap();
        linker.load_object(&b).unwrap();
        linker.resolve_symbols();
        let image = linker.link_output();
        assert!(!linker.report().has_errors());
        image
    };
    assert_eq!(link(), link());
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn map_file_lists_layout_objects_and_symbols() {
    let dir = test_dir("map");
    let a = write_object(
        &dir,
        "prog",
        "assume adl=1\nxdef main\nmain: nop\nsection data\ndb 1",
    );

    let mut linker = Linker::new(0x100);
    linker.load_object(&a).unwrap();
    linker.resolve_symbols();
    linker.link_output();
    let map_path = dir.join("prog.map");
    linker.write_map(&map_path).unwrap();

    let text = std::fs::read_to_string(&map_path).unwrap();
    assert!(text.contains("Memory Layout:"));
    assert!(text.contains("CODE: 000100"));
    assert!(text.contains("prog.o"));
    assert!(text.contains("main"));
    assert!(text.contains("(linker)"));
    assert!(text.contains("__len_code"));
    std::fs::remove_dir_all(&dir).ok();
}
