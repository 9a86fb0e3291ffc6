// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for ez80as.

use clap::Parser;

use ez80forge::assembler::cli::{default_output, Cli};
use ez80forge::assembler::Assembler;
use ez80forge::core::objformat::ObjHeader;

fn main() {
    let cli = Cli::parse();
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output(&cli.input));

    let mut assembler = Assembler::new();
    assembler.assemble_file(&cli.input);

    for diag in assembler.report().diagnostics() {
        eprintln!("{diag}");
    }
    if assembler.report().has_errors() {
        eprintln!(
            "Assembly failed with {} error(s)",
            assembler.report().error_count()
        );
        std::process::exit(1);
    }

    let bytes = assembler.object_bytes();
    if let Err(err) = std::fs::write(&output, &bytes) {
        eprintln!("error: cannot create '{}': {err}", output.display());
        std::process::exit(1);
    }

    if cli.verbose {
        // The freshly written header carries every count worth reporting.
        if let Ok(header) = ObjHeader::parse(&bytes) {
            println!("Output: {}", output.display());
            println!("  Code: {} bytes", header.code_size);
            println!("  Data: {} bytes", header.data_size);
            println!("  BSS:  {} bytes", header.bss_size);
            println!("  Symbols: {}", header.num_symbols);
            println!("  Relocations: {}", header.num_relocs);
            println!("  Externals: {}", header.num_externs);
        }
        println!("Assembly successful");
    }
}
