// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface for the linker.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "ez80ld",
    version = VERSION,
    about = "eZ80 linker combining objects and libraries into a flat binary"
)]
pub struct Cli {
    #[arg(
        short = 'o',
        value_name = "OUTFILE",
        default_value = "a.out",
        long_help = "Output image filename."
    )]
    pub output: PathBuf,
    #[arg(
        short = 'b',
        value_name = "HEXADDR",
        default_value = "000000",
        value_parser = parse_hex_addr,
        long_help = "Base address of the image in hex, with or without a 0x prefix."
    )]
    pub base: u32,
    #[arg(
        short = 'm',
        value_name = "MAPFILE",
        long_help = "Write a map file listing layout and all global symbols."
    )]
    pub map: Option<PathBuf>,
    #[arg(
        short = 'L',
        value_name = "DIR",
        action = ArgAction::Append,
        long_help = "Add a library search directory. -l NAME looks for libNAME.a in \
                     each directory in order."
    )]
    pub libdirs: Vec<PathBuf>,
    #[arg(
        short = 'l',
        value_name = "NAME",
        action = ArgAction::Append,
        long_help = "Link library libNAME.a; members load only while they satisfy \
                     undefined references. May be written joined (-lc) or separated."
    )]
    pub libraries: Vec<String>,
    #[arg(short = 'v', action = ArgAction::SetTrue)]
    pub verbose: bool,
    #[arg(value_name = "OBJ", required = true)]
    pub objects: Vec<PathBuf>,
}

fn parse_hex_addr(text: &str) -> Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let value = u32::from_str_radix(digits, 16)
        .map_err(|_| format!("invalid hex address '{text}'"))?;
    if value > 0xFF_FFFF {
        return Err(format!("address '{text}' exceeds 24 bits"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_addresses() {
        assert_eq!(parse_hex_addr("40000"), Ok(0x40000));
        assert_eq!(parse_hex_addr("0x40000"), Ok(0x40000));
        assert!(parse_hex_addr("1000000").is_err());
        assert!(parse_hex_addr("zz").is_err());
    }

    #[test]
    fn joined_and_separated_library_forms() {
        let cli = Cli::parse_from(["ez80ld", "-lc", "-l", "m", "main.o"]);
        assert_eq!(cli.libraries, vec!["c".to_string(), "m".to_string()]);
        assert_eq!(cli.objects, vec![PathBuf::from("main.o")]);
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["ez80ld", "main.o"]);
        assert_eq!(cli.output, PathBuf::from("a.out"));
        assert_eq!(cli.base, 0);
        assert!(cli.map.is_none());
    }
}
