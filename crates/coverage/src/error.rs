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

//! Coverage parsing and tracking errors.

use std::fmt;

/// Coverage errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A file does not start (or end) with the expected magic.
    BadMagic {
        /// What was being parsed.
        what: &'static str,
        /// The bytes found.
        found: [u8; 4],
    },
    /// The blob ended before a field could be read.
    Truncated {
        /// What was being read.
        what: &'static str,
        /// Read position.
        offset: usize,
    },
    /// A ULEB128 value ran past the end of the blob or its 64-bit range.
    BadVarint {
        /// Read position.
        offset: usize,
    },
    /// The recorded total length does not match the blob.
    LengthMismatch {
        /// Length recorded in the header.
        recorded: u64,
        /// Actual blob length.
        actual: usize,
    },
    /// A package hash does not match the file hash.
    PackageHashMismatch {
        /// Package index.
        package: usize,
    },
    /// A string-table index is out of range.
    StringIndexOutOfRange {
        /// The index.
        index: u64,
        /// Table size.
        len: usize,
    },
    /// A function offset points outside its package blob.
    FunctionOffsetOutOfRange {
        /// The offset.
        offset: u64,
        /// Package blob size.
        len: usize,
    },
    /// A counter file does not belong to the tracked metadata.
    MetaHashMismatch,
    /// The counter flavor is not recognised.
    UnknownFlavor(u8),
    /// A bias state index is out of range.
    StateOutOfRange {
        /// The index.
        state: usize,
        /// Number of states.
        len: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match *self {
            BadMagic { what, found } => write!(f, "bad {what} magic {found:02x?}"),
            Truncated { what, offset } => write!(f, "truncated {what} at offset {offset}"),
            BadVarint { offset } => write!(f, "malformed varint at offset {offset}"),
            LengthMismatch { recorded, actual } => {
                write!(f, "recorded length {recorded} does not match blob length {actual}")
            }
            PackageHashMismatch { package } => {
                write!(f, "package {package} hash does not match the file hash")
            }
            StringIndexOutOfRange { index, len } => {
                write!(f, "string index {index} out of range (table size {len})")
            }
            FunctionOffsetOutOfRange { offset, len } => {
                write!(f, "function offset {offset} out of range (blob size {len})")
            }
            MetaHashMismatch => write!(f, "counter file does not match tracked metadata"),
            UnknownFlavor(flavor) => write!(f, "unknown counter flavor {flavor}"),
            StateOutOfRange { state, len } => {
                write!(f, "state index {state} out of range ({len} states)")
            }
        }
    }
}

impl std::error::Error for Error {}
