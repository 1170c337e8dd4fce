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

//! State-test splitting errors.

use std::{fmt, io};

/// State-test errors.
#[derive(Debug)]
pub enum Error {
    /// A post-entry index points outside its template array.
    IndexOutOfBounds {
        /// Which array.
        array: &'static str,
        /// The index.
        index: u64,
        /// The array length.
        len: usize,
    },
    /// The transaction names no sender and carries no signing key.
    MissingSender,
    /// Sender recovery from the signing key failed.
    SenderRecovery(String),
    /// A pre-London context without any gas price.
    MissingGasPrice,
    /// Discovery was asked for a category this splitter does not serve.
    UnsupportedCategory(&'static str),
    /// Filesystem failure during discovery.
    Io(io::Error),
    /// A test file failed to parse.
    Json {
        /// The offending file.
        file: String,
        /// The parser's message.
        error: serde_json::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match self {
            IndexOutOfBounds { array, index, len } => {
                write!(f, "{array} index {index} out of bounds (length {len})")
            }
            MissingSender => write!(f, "transaction has neither sender nor secret key"),
            SenderRecovery(e) => write!(f, "cannot recover sender: {e}"),
            MissingGasPrice => write!(f, "no gas price and no base fee context"),
            UnsupportedCategory(category) => {
                write!(f, "cannot load {category} tests from a state-test path")
            }
            Io(e) => write!(f, "discovery failed: {e}"),
            Json { file, error } => write!(f, "cannot parse {file}: {error}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
