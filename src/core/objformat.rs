// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Object file binary layout.
//!
//! The format is shared by the assembler (writer), the linker (reader), and
//! the dump utility. All multi-byte fields are little-endian; addresses and
//! sizes are 24-bit (three bytes, LSB first).
//!
//! Stream order: header, code bytes, data bytes, symbol records, relocation
//! records, external records, string table.

use std::fmt;

/// Magic bytes "EZ8O" at the start of every object.
pub const OBJ_MAGIC: [u8; 4] = [0x45, 0x5A, 0x38, 0x4F];
/// Current format version.
pub const OBJ_VERSION: u8 = 3;

/// Header size in bytes.
pub const HEADER_SIZE: usize = 27;
/// Symbol record size in bytes.
pub const SYMBOL_SIZE: usize = 10;
/// Relocation record size in bytes.
pub const RELOC_SIZE: usize = 8;
/// External record size in bytes.
pub const EXTERN_SIZE: usize = 6;

/// Relocation type: 24-bit absolute address.
pub const RELOC_ADDR24: u8 = 1;

/// Section identifiers. `Abs` is used for absolute (EQU) symbols and
/// linker-defined symbols; it never holds bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Abs = 0,
    Code = 1,
    Data = 2,
    Bss = 3,
}

impl Section {
    pub fn from_u8(v: u8) -> Option<Section> {
        match v {
            0 => Some(Section::Abs),
            1 => Some(Section::Code),
            2 => Some(Section::Data),
            3 => Some(Section::Bss),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Section::Abs => "ABS",
            Section::Code => "CODE",
            Section::Data => "DATA",
            Section::Bss => "BSS",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Symbol flags. A symbol carries exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFlag {
    Local = 0,
    Export = 1,
    Extern = 2,
}

impl SymbolFlag {
    pub fn name(self) -> &'static str {
        match self {
            SymbolFlag::Local => "LOCAL",
            SymbolFlag::Export => "EXPORT",
            SymbolFlag::Extern => "EXTERN",
        }
    }
}

/// Read a 24-bit little-endian value.
pub fn read24(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) | (u32::from(bytes[1]) << 8) | (u32::from(bytes[2]) << 16)
}

/// Read a 16-bit little-endian value.
pub fn read16(bytes: &[u8]) -> u16 {
    u16::from(bytes[0]) | (u16::from(bytes[1]) << 8)
}

/// Append a 24-bit little-endian value.
pub fn push24(out: &mut Vec<u8>, val: u32) {
    out.push((val & 0xFF) as u8);
    out.push(((val >> 8) & 0xFF) as u8);
    out.push(((val >> 16) & 0xFF) as u8);
}

/// Append a 16-bit little-endian value.
pub fn push16(out: &mut Vec<u8>, val: u16) {
    out.push((val & 0xFF) as u8);
    out.push((val >> 8) as u8);
}

/// Object file header (27 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjHeader {
    pub flags: u8,
    pub code_size: u32,
    pub data_size: u32,
    pub bss_size: u32,
    pub num_symbols: u32,
    pub num_relocs: u32,
    pub num_externs: u32,
    pub strtab_size: u32,
}

/// Header parse failures, distinguished so the linker can report bad magic
/// and unsupported versions separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderError {
    Truncated,
    BadMagic,
    BadVersion(u8),
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderError::Truncated => write!(f, "truncated object header"),
            HeaderError::BadMagic => write!(f, "not a valid object file"),
            HeaderError::BadVersion(v) => write!(f, "unsupported object version {v}"),
        }
    }
}

impl ObjHeader {
    /// Decode and validate a header from the first [`HEADER_SIZE`] bytes.
    pub fn parse(bytes: &[u8]) -> Result<ObjHeader, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated);
        }
        if bytes[0..4] != OBJ_MAGIC {
            return Err(HeaderError::BadMagic);
        }
        if bytes[4] != OBJ_VERSION {
            return Err(HeaderError::BadVersion(bytes[4]));
        }
        Ok(ObjHeader {
            flags: bytes[5],
            code_size: read24(&bytes[6..]),
            data_size: read24(&bytes[9..]),
            bss_size: read24(&bytes[12..]),
            num_symbols: read24(&bytes[15..]),
            num_relocs: read24(&bytes[18..]),
            num_externs: read24(&bytes[21..]),
            strtab_size: read24(&bytes[24..]),
        })
    }

    /// Encode the header into its 27-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        out.extend_from_slice(&OBJ_MAGIC);
        out.push(OBJ_VERSION);
        out.push(self.flags);
        push24(&mut out, self.code_size);
        push24(&mut out, self.data_size);
        push24(&mut out, self.bss_size);
        push24(&mut out, self.num_symbols);
        push24(&mut out, self.num_relocs);
        push24(&mut out, self.num_externs);
        push24(&mut out, self.strtab_size);
        let mut bytes = [0u8; HEADER_SIZE];
        bytes.copy_from_slice(&out);
        bytes
    }

    /// Total on-disk size of the object this header describes. BSS takes no
    /// file space.
    pub fn object_size(&self) -> u64 {
        HEADER_SIZE as u64
            + u64::from(self.code_size)
            + u64::from(self.data_size)
            + u64::from(self.num_symbols) * SYMBOL_SIZE as u64
            + u64::from(self.num_relocs) * RELOC_SIZE as u64
            + u64::from(self.num_externs) * EXTERN_SIZE as u64
            + u64::from(self.strtab_size)
    }
}

/// Symbol table record (10 bytes):
/// name_offset (3), section (1), flags (1), value (3), reserved (2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjSymbolRecord {
    pub name_offset: u32,
    pub section: u8,
    pub flags: u8,
    pub value: u32,
}

impl ObjSymbolRecord {
    pub fn parse(bytes: &[u8]) -> ObjSymbolRecord {
        ObjSymbolRecord {
            name_offset: read24(&bytes[0..]),
            section: bytes[3],
            flags: bytes[4],
            value: read24(&bytes[5..]),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        push24(out, self.name_offset);
        out.push(self.section);
        out.push(self.flags);
        push24(out, self.value);
        out.push(0);
        out.push(0);
    }
}

/// Relocation record (8 bytes):
/// offset (3), section (1), type (1), target_sect (1), ext_index (2).
///
/// `target_sect == 0` marks an external reference addressed by `ext_index`;
/// otherwise the target is the named section of the same object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjRelocRecord {
    pub offset: u32,
    pub section: u8,
    pub reloc_type: u8,
    pub target_sect: u8,
    pub ext_index: u16,
}

impl ObjRelocRecord {
    pub fn parse(bytes: &[u8]) -> ObjRelocRecord {
        ObjRelocRecord {
            offset: read24(&bytes[0..]),
            section: bytes[3],
            reloc_type: bytes[4],
            target_sect: bytes[5],
            ext_index: read16(&bytes[6..]),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        push24(out, self.offset);
        out.push(self.section);
        out.push(self.reloc_type);
        out.push(self.target_sect);
        push16(out, self.ext_index);
    }
}

/// External reference record (6 bytes): name_offset (3), symbol_index (3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjExternRecord {
    pub name_offset: u32,
    pub symbol_index: u32,
}

impl ObjExternRecord {
    pub fn parse(bytes: &[u8]) -> ObjExternRecord {
        ObjExternRecord {
            name_offset: read24(&bytes[0..]),
            symbol_index: read24(&bytes[3..]),
        }
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        push24(out, self.name_offset);
        push24(out, self.symbol_index);
    }
}

/// Fetch a NUL-terminated name from a string table. Returns `None` when the
/// offset is out of range.
pub fn strtab_name(strtab: &[u8], offset: u32) -> Option<&str> {
    let start = offset as usize;
    if start >= strtab.len() {
        return None;
    }
    let end = strtab[start..]
        .iter()
        .position(|&b| b == 0)
        .map(|p| start + p)?;
    std::str::from_utf8(&strtab[start..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = ObjHeader {
            flags: 0,
            code_size: 0x123456,
            data_size: 7,
            bss_size: 0x80,
            num_symbols: 2,
            num_relocs: 3,
            num_externs: 1,
            strtab_size: 25,
        };
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &OBJ_MAGIC);
        assert_eq!(bytes[4], OBJ_VERSION);
        // 24-bit fields are LSB first
        assert_eq!(&bytes[6..9], &[0x56, 0x34, 0x12]);
        assert_eq!(ObjHeader::parse(&bytes), Ok(header));
    }

    #[test]
    fn header_rejects_bad_magic_and_version() {
        let mut bytes = ObjHeader::default().encode();
        bytes[0] = b'X';
        assert_eq!(ObjHeader::parse(&bytes), Err(HeaderError::BadMagic));

        let mut bytes = ObjHeader::default().encode();
        bytes[4] = 2;
        assert_eq!(ObjHeader::parse(&bytes), Err(HeaderError::BadVersion(2)));

        assert_eq!(
            ObjHeader::parse(&bytes[..10]),
            Err(HeaderError::Truncated)
        );
    }

    #[test]
    fn object_size_counts_all_tables() {
        let header = ObjHeader {
            code_size: 16,
            data_size: 4,
            bss_size: 100, // no file space
            num_symbols: 2,
            num_relocs: 1,
            num_externs: 1,
            strtab_size: 12,
            ..ObjHeader::default()
        };
        assert_eq!(
            header.object_size(),
            27 + 16 + 4 + 2 * 10 + 8 + 6 + 12
        );
    }

    #[test]
    fn record_round_trips() {
        let sym = ObjSymbolRecord {
            name_offset: 5,
            section: Section::Data as u8,
            flags: SymbolFlag::Export as u8,
            value: 0x1234,
        };
        let mut bytes = Vec::new();
        sym.encode(&mut bytes);
        assert_eq!(bytes.len(), SYMBOL_SIZE);
        assert_eq!(ObjSymbolRecord::parse(&bytes), sym);

        let reloc = ObjRelocRecord {
            offset: 0x000102,
            section: Section::Code as u8,
            reloc_type: RELOC_ADDR24,
            target_sect: 0,
            ext_index: 3,
        };
        let mut bytes = Vec::new();
        reloc.encode(&mut bytes);
        assert_eq!(bytes.len(), RELOC_SIZE);
        assert_eq!(ObjRelocRecord::parse(&bytes), reloc);

        let ext = ObjExternRecord {
            name_offset: 9,
            symbol_index: 1,
        };
        let mut bytes = Vec::new();
        ext.encode(&mut bytes);
        assert_eq!(bytes.len(), EXTERN_SIZE);
        assert_eq!(ObjExternRecord::parse(&bytes), ext);
    }

    #[test]
    fn strtab_name_lookup() {
        let strtab = b"main\0_printf\0";
        assert_eq!(strtab_name(strtab, 0), Some("main"));
        assert_eq!(strtab_name(strtab, 5), Some("_printf"));
        assert_eq!(strtab_name(strtab, 13), None);
    }
}
