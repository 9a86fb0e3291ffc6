// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface for the assembler.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "ez80as",
    version = VERSION,
    about = "eZ80 ADL-mode assembler producing relocatable object files"
)]
pub struct Cli {
    #[arg(
        short = 'o',
        value_name = "OUTFILE",
        long_help = "Output object file. Defaults to the input filename with its \
                     extension replaced by .o."
    )]
    pub output: Option<PathBuf>,
    #[arg(
        short = 'v',
        action = ArgAction::SetTrue,
        long_help = "Print section sizes and table counts after assembly."
    )]
    pub verbose: bool,
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

/// Default output path: the input basename with its final dot-extension
/// replaced by `.o`; an extensionless input gets `.o` appended.
pub fn default_output(input: &Path) -> PathBuf {
    input.with_extension("o")
}
