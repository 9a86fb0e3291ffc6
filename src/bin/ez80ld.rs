// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for ez80ld. The Linker records progress notes as data;
// every byte of user-facing output is printed from here.

use clap::Parser;

use ez80forge::linker::cli::Cli;
use ez80forge::linker::Linker;

fn main() {
    let cli = Cli::parse();

    let mut linker = Linker::new(cli.base);

    for dir in &cli.libdirs {
        linker.add_libdir(dir);
    }
    for path in &cli.objects {
        let result = linker.load_object(path);
        flush_infos(&mut linker, cli.verbose);
        if result.is_err() {
            report_and_exit(&linker);
        }
    }
    for name in &cli.libraries {
        let result = linker.find_and_add_library(name);
        flush_infos(&mut linker, cli.verbose);
        if result.is_err() {
            report_and_exit(&linker);
        }
    }

    linker.process_libraries();
    linker.resolve_symbols();
    flush_infos(&mut linker, cli.verbose);
    if linker.report().has_errors() {
        report_and_exit(&linker);
    }

    let image = linker.link_output();
    flush_infos(&mut linker, cli.verbose);
    if linker.report().has_errors() {
        report_and_exit(&linker);
    }

    if let Err(err) = std::fs::write(&cli.output, &image) {
        eprintln!("error: cannot create '{}': {err}", cli.output.display());
        std::process::exit(1);
    }
    if cli.verbose {
        println!("Output: {} ({} bytes)", cli.output.display(), image.len());
    }

    if let Some(map) = &cli.map {
        if let Err(err) = linker.write_map(map) {
            eprintln!("error: cannot create map file '{}': {err}", map.display());
            std::process::exit(1);
        }
        if cli.verbose {
            println!("Map file: {}", map.display());
        }
    }

    // Warnings may have been recorded even on success.
    for diag in linker.report().diagnostics() {
        eprintln!("{diag}");
    }
    if cli.verbose {
        println!("Link successful");
    }
}

/// Print the linker's accumulated progress notes when verbose; always
/// drain them.
fn flush_infos(linker: &mut Linker, verbose: bool) {
    for line in linker.take_infos() {
        if verbose {
            println!("{line}");
        }
    }
}

fn report_and_exit(linker: &Linker) -> ! {
    for diag in linker.report().diagnostics() {
        eprintln!("{diag}");
    }
    eprintln!(
        "Link failed with {} error(s)",
        linker.report().error_count()
    );
    std::process::exit(1);
}
