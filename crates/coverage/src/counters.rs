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

//! Counter file parsing.
//!
//! A counter file carries the per-unit execution counters of one run.
//! Layout:
//!
//! ```text
//! header: magic 00 63 77 6d | version u32 | meta hash [16]
//!         flavor u8 | big-endian u8 | reserved [2]
//! segments (one or more):
//!         function entries u64 | string table length u32 | args length u32
//!         string table bytes | args bytes | pad to 4
//!         entries × (counter count, pkg idx, func idx, counters…)
//! footer (16 bytes at the tail): magic | reserved u32 | segments u32 |
//!         reserved u32
//! ```
//!
//! Counter integers are ULEB128 (flavor 1) or fixed-width 32-bit in the
//! header's endianness (flavor 2).

use crate::{
    error::Error,
    meta::{MetaHash, UnitKey},
    reader::Reader,
};
use std::collections::BTreeMap;

/// Magic prefix (and footer marker) of a counter file.
pub const COUNTER_MAGIC: [u8; 4] = [0x00, b'c', b'w', b'm'];

const HEADER_LEN: usize = 28;
const FOOTER_LEN: usize = 16;

/// Counter integers are ULEB128 encoded.
pub const FLAVOR_ULEB128: u8 = 1;
/// Counter integers are fixed-width 32-bit.
pub const FLAVOR_RAW: u8 = 2;

/// A parsed counter file.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterFile {
    /// Hash of the metadata generation the counters belong to.
    pub meta_hash: MetaHash,
    /// Counter vectors keyed by `(package, function)`.
    pub counters: BTreeMap<(u32, u32), Vec<u32>>,
}

impl CounterFile {
    /// Fails unless the counters belong to the given metadata generation.
    pub fn verify_hash(&self, expected: &MetaHash) -> Result<(), Error> {
        if &self.meta_hash != expected {
            return Err(Error::MetaHashMismatch);
        }
        Ok(())
    }

    /// Flattens the per-function vectors into per-unit counters.
    pub fn unit_counters(&self) -> BTreeMap<UnitKey, u32> {
        let mut flat = BTreeMap::new();
        for (&(pkg, func), counters) in &self.counters {
            for (unit, &count) in counters.iter().enumerate() {
                flat.insert(
                    UnitKey {
                        pkg,
                        func,
                        unit: unit as u32,
                    },
                    count,
                );
            }
        }
        flat
    }
}

struct Decoder {
    flavor: u8,
    big_endian: bool,
}

impl Decoder {
    fn integer(&self, reader: &mut Reader, what: &'static str) -> Result<u32, Error> {
        match self.flavor {
            FLAVOR_ULEB128 => Ok(reader.uleb128()? as u32),
            FLAVOR_RAW => {
                if self.big_endian {
                    reader.u32_be(what)
                } else {
                    reader.u32_le(what)
                }
            }
            flavor => Err(Error::UnknownFlavor(flavor)),
        }
    }
}

/// Parses a counter file blob.
pub fn parse_counters(blob: &[u8]) -> Result<CounterFile, Error> {
    if blob.len() < HEADER_LEN + FOOTER_LEN {
        return Err(Error::Truncated {
            what: "counter file",
            offset: blob.len(),
        });
    }
    let mut header = Reader::new(blob);
    let magic = header.bytes(4, "counter magic")?;
    if magic != COUNTER_MAGIC {
        return Err(Error::BadMagic {
            what: "counter",
            found: [magic[0], magic[1], magic[2], magic[3]],
        });
    }
    let _version = header.u32_le("counter version")?;
    let mut meta_hash = [0u8; 16];
    meta_hash.copy_from_slice(header.bytes(16, "meta hash")?);
    let flavor = header.u8("flavor")?;
    if flavor != FLAVOR_ULEB128 && flavor != FLAVOR_RAW {
        return Err(Error::UnknownFlavor(flavor));
    }
    let big_endian = header.u8("endianness")? != 0;
    header.skip(2, "header padding")?;
    let decoder = Decoder { flavor, big_endian };

    let mut footer = Reader::new(&blob[blob.len() - FOOTER_LEN..]);
    let footer_magic = footer.bytes(4, "footer magic")?;
    if footer_magic != COUNTER_MAGIC {
        return Err(Error::BadMagic {
            what: "counter footer",
            found: [
                footer_magic[0],
                footer_magic[1],
                footer_magic[2],
                footer_magic[3],
            ],
        });
    }
    footer.skip(4, "footer padding")?;
    let num_segments = footer.u32_le("segment count")?;

    let mut reader = Reader::new(&blob[..blob.len() - FOOTER_LEN]);
    reader.skip(HEADER_LEN, "counter header")?;
    let mut counters = BTreeMap::new();
    for _ in 0..num_segments {
        let fcn_entries = reader.u64_le("segment entry count")?;
        let str_tab_len = reader.u32_le("segment string table length")? as usize;
        let args_len = reader.u32_le("segment args length")? as usize;
        reader.skip(str_tab_len, "segment string table")?;
        reader.skip(args_len, "segment args")?;
        reader.align4("segment padding")?;
        for _ in 0..fcn_entries {
            let num_counters = decoder.integer(&mut reader, "counter count")? as usize;
            let pkg = decoder.integer(&mut reader, "package index")?;
            let func = decoder.integer(&mut reader, "function index")?;
            let mut values = Vec::with_capacity(num_counters);
            for _ in 0..num_counters {
                values.push(decoder.integer(&mut reader, "counter value")?);
            }
            counters.insert((pkg, func), values);
        }
    }
    Ok(CounterFile {
        meta_hash,
        counters,
    })
}

#[cfg(test)]
pub(crate) mod test_builder {
    //! Builds well-formed counter files for parser and tracker tests.

    use super::{COUNTER_MAGIC, FLAVOR_ULEB128};
    use crate::reader::write_uleb128;

    pub struct CounterSpec {
        pub pkg: u32,
        pub func: u32,
        pub values: Vec<u32>,
    }

    pub fn build_counters(
        hash: [u8; 16],
        flavor: u8,
        big_endian: bool,
        functions: &[CounterSpec],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&COUNTER_MAGIC);
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&hash);
        out.push(flavor);
        out.push(big_endian as u8);
        out.extend_from_slice(&[0, 0]);

        // one segment, empty string table and args
        out.extend_from_slice(&(functions.len() as u64).to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        let mut write = |out: &mut Vec<u8>, value: u32| {
            if flavor == FLAVOR_ULEB128 {
                write_uleb128(out, value as u64);
            } else if big_endian {
                out.extend_from_slice(&value.to_be_bytes());
            } else {
                out.extend_from_slice(&value.to_le_bytes());
            }
        };
        for function in functions {
            write(&mut out, function.values.len() as u32);
            write(&mut out, function.pkg);
            write(&mut out, function.func);
            for &value in &function.values {
                write(&mut out, value);
            }
        }
        while out.len() % 4 != 0 {
            out.push(0);
        }

        out.extend_from_slice(&COUNTER_MAGIC);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }
}
