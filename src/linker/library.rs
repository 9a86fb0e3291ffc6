// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Library archives and selective loading.
//!
//! A library is a plain concatenation of object files. Scanning walks the
//! headers to build a member catalog without loading anything; the loading
//! loop then pulls in only those members whose exports intersect the
//! current set of undefined externals, repeating until a full pass loads
//! nothing. Each member loads at most once, so the loop terminates.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::core::objformat::{
    strtab_name, ObjExternRecord, ObjHeader, ObjSymbolRecord, EXTERN_SIZE, HEADER_SIZE,
    RELOC_SIZE, SYMBOL_SIZE,
};

use super::object::read_at;
use super::{Linker, ObjectInfo};

#[derive(Debug, Clone)]
pub struct LibMember {
    pub offset: u64,
    pub size: u64,
    pub loaded: bool,
}

#[derive(Debug, Clone)]
pub struct Library {
    pub filename: PathBuf,
    pub members: Vec<LibMember>,
}

impl Linker {
    /// Resolve `-l NAME`: search each `-L` directory for `libNAME.a`, then
    /// fall back to NAME as a literal path.
    pub fn find_and_add_library(&mut self, name: &str) -> Result<(), ()> {
        let found = self
            .libdirs()
            .iter()
            .map(|dir| dir.join(format!("lib{name}.a")))
            .find(|path| path.is_file());
        if let Some(path) = found {
            self.info(format!("Found library '{name}' as '{}'", path.display()));
            return self.add_library(&path);
        }

        let literal = Path::new(name);
        if literal.is_file() {
            return self.add_library(literal);
        }

        self.error(format!("cannot find library '{name}'"));
        Err(())
    }

    /// Scan a library's headers and record its member catalog. An invalid
    /// magic mid-stream is fatal: the archive is corrupt.
    pub fn add_library(&mut self, path: &Path) -> Result<(), ()> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(_) => {
                self.error(format!("cannot open library '{}'", path.display()));
                return Err(());
            }
        };
        let file_size = match file.metadata() {
            Ok(meta) => meta.len(),
            Err(_) => {
                self.error(format!("cannot stat library '{}'", path.display()));
                return Err(());
            }
        };

        let mut members = Vec::new();
        let mut pos = 0u64;
        while pos < file_size {
            let header_bytes = match read_at(&mut file, pos, HEADER_SIZE) {
                Ok(bytes) => bytes,
                Err(_) => break,
            };
            let header = match ObjHeader::parse(&header_bytes) {
                Ok(header) => header,
                Err(err) => {
                    self.error(format!(
                        "invalid object at offset {pos} in '{}': {err}",
                        path.display()
                    ));
                    return Err(());
                }
            };

            let size = header.object_size();
            members.push(LibMember {
                offset: pos,
                size,
                loaded: false,
            });
            pos += size;
        }

        self.info(format!(
            "Scanned library '{}': {} object(s)",
            path.display(),
            members.len()
        ));
        self.libraries.push(Library {
            filename: path.to_path_buf(),
            members,
        });
        Ok(())
    }

    /// Selective loading fixed point. Returns the number of members loaded.
    pub fn process_libraries(&mut self) -> usize {
        let mut total_loaded = 0;

        if self.libraries.is_empty() {
            return 0;
        }

        loop {
            let undefined = self.collect_undefined();
            if undefined.is_empty() {
                break;
            }

            // Find every unloaded member exporting one of the undefined
            // names, then load them in discovery order.
            let mut pending: Vec<(usize, usize)> = Vec::new();
            for (lib_idx, lib) in self.libraries.iter().enumerate() {
                let Ok(mut file) = File::open(&lib.filename) else {
                    continue;
                };
                for (member_idx, member) in lib.members.iter().enumerate() {
                    if member.loaded {
                        continue;
                    }
                    if member_exports_any(&mut file, member.offset, &undefined) {
                        pending.push((lib_idx, member_idx));
                    }
                }
            }

            if pending.is_empty() {
                break;
            }
            for (lib_idx, member_idx) in pending {
                let path = self.libraries[lib_idx].filename.clone();
                let offset = self.libraries[lib_idx].members[member_idx].offset;
                self.info(format!(
                    "Loading from library '{}' (object at {offset})",
                    path.display()
                ));
                if self.load_object_at(&path, offset).is_ok() {
                    self.libraries[lib_idx].members[member_idx].loaded = true;
                    total_loaded += 1;
                }
            }
        }

        if total_loaded > 0 {
            self.info(format!("Loaded {total_loaded} object(s) from libraries"));
        }
        total_loaded
    }

    /// All external names referenced by loaded objects that the global
    /// table does not yet define, de-duplicated case-insensitively.
    fn collect_undefined(&self) -> Vec<String> {
        let mut undefined: Vec<String> = Vec::new();

        for obj in &self.objects {
            let Ok(mut file) = File::open(&obj.filename) else {
                continue;
            };
            for name in object_externals(&mut file, obj) {
                if self.find_global(&name).is_some() {
                    continue;
                }
                if !undefined.iter().any(|u| u.eq_ignore_ascii_case(&name)) {
                    undefined.push(name);
                }
            }
        }

        undefined
    }
}

/// External names of one loaded object.
fn object_externals(file: &mut File, obj: &ObjectInfo) -> Vec<String> {
    let num_externs = obj.header.num_externs as usize;
    if num_externs == 0 || obj.header.strtab_size == 0 {
        return Vec::new();
    }

    let Ok(strtab) = read_at(file, obj.strtab_pos, obj.header.strtab_size as usize) else {
        return Vec::new();
    };
    let Ok(ext_bytes) = read_at(file, obj.extern_pos, num_externs * EXTERN_SIZE) else {
        return Vec::new();
    };

    ext_bytes
        .chunks_exact(EXTERN_SIZE)
        .filter_map(|chunk| {
            let record = ObjExternRecord::parse(chunk);
            strtab_name(&strtab, record.name_offset).map(str::to_string)
        })
        .collect()
}

/// Does the library member at `offset` export any of the undefined names?
fn member_exports_any(file: &mut File, offset: u64, undefined: &[String]) -> bool {
    let Ok(header_bytes) = read_at(file, offset, HEADER_SIZE) else {
        return false;
    };
    let Ok(header) = ObjHeader::parse(&header_bytes) else {
        return false;
    };
    if header.num_symbols == 0 || header.strtab_size == 0 {
        return false;
    }

    let sym_pos = offset
        + HEADER_SIZE as u64
        + u64::from(header.code_size)
        + u64::from(header.data_size);
    let strtab_pos = sym_pos
        + u64::from(header.num_symbols) * SYMBOL_SIZE as u64
        + u64::from(header.num_relocs) * RELOC_SIZE as u64
        + u64::from(header.num_externs) * EXTERN_SIZE as u64;

    let Ok(strtab) = read_at(file, strtab_pos, header.strtab_size as usize) else {
        return false;
    };
    let Ok(sym_bytes) = read_at(file, sym_pos, header.num_symbols as usize * SYMBOL_SIZE) else {
        return false;
    };

    sym_bytes.chunks_exact(SYMBOL_SIZE).any(|chunk| {
        let record = ObjSymbolRecord::parse(chunk);
        match strtab_name(&strtab, record.name_offset) {
            Some(name) => undefined.iter().any(|u| u.eq_ignore_ascii_case(name)),
            None => false,
        }
    })
}
