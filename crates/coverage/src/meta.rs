// Copyright 2015-2020 Parity Technologies (UK) Ltd.
// This file is part of OpenEthereum.

// OpenEthereum is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// OpenEthereum is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with OpenEthereum.  If not, see <http://www.gnu.org/licenses/>.

//! Instrumentation metadata parsing.
//!
//! A metadata blob describes every instrumentation unit the runtime
//! counts: per package, per function, the source ranges of the counted
//! regions. Layout, little-endian throughout:
//!
//! ```text
//! magic 00 63 76 6d | version u32 | total length u64 | package count u64
//! file hash [16] | string table offset u32, length u32
//! counter mode u8, granularity u8, reserved [2]
//! package table: count × (offset u64, length u64)
//! package blob: hash [16] | path idx ULEB | function count ULEB
//!               function offsets count × u32
//!               string table: count ULEB, then (length ULEB, bytes) each
//!               function: unit count, name idx, file idx (ULEB)
//!                         units × (start line, start col, end line, end col,
//!                         statements — all ULEB), literal flag u8
//! ```

use crate::{error::Error, reader::Reader};
use std::collections::BTreeMap;

/// Magic prefix of a metadata blob.
pub const META_MAGIC: [u8; 4] = [0x00, b'c', b'v', b'm'];

/// Hash identifying a metadata generation.
pub type MetaHash = [u8; 16];

/// Identity of one instrumentation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitKey {
    /// Package index.
    pub pkg: u32,
    /// Function index within the package.
    pub func: u32,
    /// Unit index within the function.
    pub unit: u32,
}

/// Source description of one instrumentation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitInfo {
    /// Import path of the owning package.
    pub package_path: String,
    /// Name of the owning function.
    pub func_name: String,
    /// Source file.
    pub file: String,
    /// First covered line.
    pub start_line: u32,
    /// Last covered line.
    pub end_line: u32,
    /// One key per covered line, `file:line`.
    pub line_keys: Vec<String>,
}

/// Produces the line key set of an inclusive line range; empty when the
/// range is absent or inverted.
pub fn build_line_keys(file: &str, start_line: u32, end_line: u32) -> Vec<String> {
    if start_line == 0 || start_line > end_line {
        return Vec::new();
    }
    (start_line..=end_line)
        .map(|line| format!("{file}:{line}"))
        .collect()
}

/// Parses a metadata blob into its hash and unit descriptions.
pub fn parse_meta(blob: &[u8]) -> Result<(MetaHash, BTreeMap<UnitKey, UnitInfo>), Error> {
    let mut reader = Reader::new(blob);
    let magic = reader.bytes(4, "meta magic")?;
    if magic != META_MAGIC {
        return Err(Error::BadMagic {
            what: "metadata",
            found: [magic[0], magic[1], magic[2], magic[3]],
        });
    }
    let _version = reader.u32_le("meta version")?;
    let total_length = reader.u64_le("meta length")?;
    if total_length != blob.len() as u64 {
        return Err(Error::LengthMismatch {
            recorded: total_length,
            actual: blob.len(),
        });
    }
    let num_packages = reader.u64_le("package count")?;
    let mut file_hash = [0u8; 16];
    file_hash.copy_from_slice(reader.bytes(16, "file hash")?);
    let strtab_offset = reader.u32_le("string table offset")? as usize;
    let strtab_len = reader.u32_le("string table length")? as usize;
    if strtab_offset.checked_add(strtab_len).map_or(true, |end| end > blob.len()) {
        return Err(Error::Truncated {
            what: "file string table",
            offset: strtab_offset,
        });
    }
    let _counter_mode = reader.u8("counter mode")?;
    let _granularity = reader.u8("counter granularity")?;
    reader.skip(2, "header padding")?;

    let mut packages = Vec::with_capacity(num_packages as usize);
    for _ in 0..num_packages {
        let offset = reader.u64_le("package offset")? as usize;
        let length = reader.u64_le("package length")? as usize;
        if offset.checked_add(length).map_or(true, |end| end > blob.len()) {
            return Err(Error::Truncated {
                what: "package blob",
                offset,
            });
        }
        packages.push((offset, length));
    }

    let mut units = BTreeMap::new();
    for (pkg_index, (offset, length)) in packages.into_iter().enumerate() {
        parse_package(
            &blob[offset..offset + length],
            pkg_index as u32,
            &file_hash,
            &mut units,
        )?;
    }
    Ok((file_hash, units))
}

fn parse_package(
    blob: &[u8],
    pkg_index: u32,
    file_hash: &MetaHash,
    units: &mut BTreeMap<UnitKey, UnitInfo>,
) -> Result<(), Error> {
    let mut reader = Reader::new(blob);
    let hash = reader.bytes(16, "package hash")?;
    if hash != file_hash {
        return Err(Error::PackageHashMismatch {
            package: pkg_index as usize,
        });
    }
    let path_index = reader.uleb128()?;
    let num_funcs = reader.uleb128()? as usize;
    let mut func_offsets = Vec::with_capacity(num_funcs);
    for _ in 0..num_funcs {
        func_offsets.push(reader.u32_le("function offset")? as u64);
    }
    let strings = parse_string_table(&mut reader)?;
    let package_path = string_at(&strings, path_index)?.to_owned();

    for (func_index, &offset) in func_offsets.iter().enumerate() {
        if offset as usize >= blob.len() {
            return Err(Error::FunctionOffsetOutOfRange {
                offset,
                len: blob.len(),
            });
        }
        let mut func = Reader::new(&blob[offset as usize..]);
        let num_units = func.uleb128()? as usize;
        let name_index = func.uleb128()?;
        let file_index = func.uleb128()?;
        let func_name = string_at(&strings, name_index)?.to_owned();
        let file = string_at(&strings, file_index)?.to_owned();
        for unit_index in 0..num_units {
            let start_line = func.uleb128()? as u32;
            let _start_col = func.uleb128()?;
            let end_line = func.uleb128()? as u32;
            let _end_col = func.uleb128()?;
            let _num_stmts = func.uleb128()?;
            units.insert(
                UnitKey {
                    pkg: pkg_index,
                    func: func_index as u32,
                    unit: unit_index as u32,
                },
                UnitInfo {
                    package_path: package_path.clone(),
                    func_name: func_name.clone(),
                    file: file.clone(),
                    start_line,
                    end_line,
                    line_keys: build_line_keys(&file, start_line, end_line),
                },
            );
        }
        let _literal = func.u8("literal flag")?;
    }
    Ok(())
}

fn parse_string_table(reader: &mut Reader) -> Result<Vec<String>, Error> {
    let count = reader.uleb128()? as usize;
    let mut strings = Vec::with_capacity(count);
    for _ in 0..count {
        let length = reader.uleb128()? as usize;
        let bytes = reader.bytes(length, "string table entry")?;
        strings.push(String::from_utf8_lossy(bytes).into_owned());
    }
    Ok(strings)
}

fn string_at(strings: &[String], index: u64) -> Result<&str, Error> {
    strings
        .get(index as usize)
        .map(String::as_str)
        .ok_or(Error::StringIndexOutOfRange {
            index,
            len: strings.len(),
        })
}


#[cfg(test)]
mod tests {
    use super::{
        build_line_keys, parse_meta,
        test_builder::{build_meta, FunctionSpec, PackageSpec},
        UnitKey,
    };
    use crate::error::Error;

    fn sample_packages() -> Vec<PackageSpec> {
        vec![
            PackageSpec {
                path: "backend/state",
                functions: vec![
                    FunctionSpec {
                        name: "Get",
                        file: "state.go",
                        units: vec![(10, 1, 12, 2, 3), (14, 1, 14, 40, 1)],
                    },
                    FunctionSpec {
                        name: "Set",
                        file: "state.go",
                        units: vec![(20, 1, 25, 2, 6)],
                    },
                ],
            },
            PackageSpec {
                path: "backend/storage",
                functions: vec![FunctionSpec {
                    name: "Root",
                    file: "storage.go",
                    units: vec![(5, 1, 9, 2, 4)],
                }],
            },
        ]
    }

    #[test]
    fn parses_units_with_line_keys() {
        let hash = [7u8; 16];
        let blob = build_meta(hash, &sample_packages());
        let (parsed_hash, units) = parse_meta(&blob).unwrap();
        assert_eq!(parsed_hash, hash);
        assert_eq!(units.len(), 4);

        let unit = &units[&UnitKey {
            pkg: 0,
            func: 0,
            unit: 0,
        }];
        assert_eq!(unit.package_path, "backend/state");
        assert_eq!(unit.func_name, "Get");
        assert_eq!(unit.file, "state.go");
        assert_eq!(unit.start_line, 10);
        assert_eq!(unit.end_line, 12);
        assert_eq!(
            unit.line_keys,
            vec!["state.go:10", "state.go:11", "state.go:12"]
        );

        let other = &units[&UnitKey {
            pkg: 1,
            func: 0,
            unit: 0,
        }];
        assert_eq!(other.package_path, "backend/storage");
        assert_eq!(other.func_name, "Root");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut blob = build_meta([0u8; 16], &sample_packages());
        blob[1] = b'x';
        assert!(matches!(
            parse_meta(&blob),
            Err(Error::BadMagic { what: "metadata", .. })
        ));
    }

    #[test]
    fn rejects_truncation() {
        let blob = build_meta([0u8; 16], &sample_packages());
        // cutting the blob invalidates the recorded total length first
        assert!(matches!(
            parse_meta(&blob[..blob.len() - 10]),
            Err(Error::LengthMismatch { .. })
        ));
        assert!(parse_meta(&blob[..30]).is_err());
    }

    #[test]
    fn rejects_package_hash_mismatch() {
        let mut blob = build_meta([7u8; 16], &sample_packages());
        // flip one byte of the first package hash (right after header and
        // the 2-entry package table)
        blob[52 + 32] ^= 0xff;
        assert!(matches!(
            parse_meta(&blob),
            Err(Error::PackageHashMismatch { package: 0 })
        ));
    }

    #[test]
    fn line_key_rules() {
        assert_eq!(build_line_keys("f.go", 3, 5).len(), 3);
        assert_eq!(build_line_keys("f.go", 0, 5), Vec::<String>::new());
        assert_eq!(build_line_keys("f.go", 6, 5), Vec::<String>::new());
        assert_eq!(build_line_keys("f.go", 4, 4), vec!["f.go:4"]);
    }
}
