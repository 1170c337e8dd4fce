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

//! Lenient uint json deserialization for test json files.

use ethereum_types::U256;
use serde::{
    de::{Error, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, str::FromStr};

/// Lenient uint json deserialization for test json files.
///
/// Accepts hex strings, decimal strings, bare JSON numbers, and the
/// degenerate `""`/`"0x"` forms (both parse as zero).
#[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Uint(pub U256);

impl From<Uint> for U256 {
    fn from(val: Uint) -> Self {
        val.0
    }
}

impl From<U256> for Uint {
    fn from(val: U256) -> Self {
        Uint(val)
    }
}

impl From<u64> for Uint {
    fn from(val: u64) -> Self {
        Uint(U256::from(val))
    }
}

impl From<Uint> for u64 {
    fn from(val: Uint) -> Self {
        val.0.low_u64()
    }
}

impl From<Uint> for usize {
    fn from(val: Uint) -> Self {
        val.0.low_u64() as usize
    }
}

impl Serialize for Uint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&format_args!("0x{:x}", self.0))
    }
}

impl<'a> Deserialize<'a> for Uint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        deserializer.deserialize_any(UintVisitor)
    }
}

struct UintVisitor;

impl<'a> Visitor<'a> for UintVisitor {
    type Value = Uint;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a hex encoded or decimal uint")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Ok(Uint(U256::from(value)))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        let value = match value.len() {
            0 => U256::from(0),
            2 if value.starts_with("0x") => U256::from(0),
            _ if value.starts_with("0x") => U256::from_str(&value[2..])
                .map_err(|e| Error::custom(format!("Invalid hex value {value}: {e}").as_str()))?,
            _ => U256::from_dec_str(value).map_err(|e| {
                Error::custom(format!("Invalid decimal value {value}: {e:?}").as_str())
            })?,
        };

        Ok(Uint(value))
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
    where
        E: Error,
    {
        self.visit_str(value.as_ref())
    }
}
