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

//! Lenient bytes json deserialization for test json files.

use rustc_hex::{FromHex, ToHex};
use serde::{
    de::{Error, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, ops::Deref, str::FromStr};

/// Lenient bytes json deserialization for test json files.
#[derive(Default, Debug, PartialEq, Eq, Ord, PartialOrd, Clone)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    /// Creates bytes struct.
    pub fn new(v: Vec<u8>) -> Self {
        Bytes(v)
    }

    /// Consumes the wrapper, yielding the raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl From<Bytes> for Vec<u8> {
    fn from(val: Bytes) -> Self {
        val.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(val: Vec<u8>) -> Self {
        Bytes(val)
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Bytes {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let unprefixed = value.strip_prefix("0x").unwrap_or(value);
        if unprefixed.is_empty() {
            return Ok(Bytes(Vec::new()));
        }
        // Odd digit counts appear in the wild; pad on the left.
        let bytes = if unprefixed.len() % 2 == 1 {
            format!("0{unprefixed}").from_hex()
        } else {
            unprefixed.from_hex()
        };

        bytes
            .map(Bytes)
            .map_err(|e| format!("Invalid hex value {value}: {e}"))
    }
}

impl Serialize for Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&format_args!("0x{}", self.0.to_hex()))
    }
}

impl<'a> Deserialize<'a> for Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        deserializer.deserialize_any(BytesVisitor)
    }
}

struct BytesVisitor;

impl<'a> Visitor<'a> for BytesVisitor {
    type Value = Bytes;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a hex encoded string of bytes")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        Bytes::from_str(value).map_err(Error::custom)
    }

    fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
    where
        E: Error,
    {
        self.visit_str(value.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::Bytes;

    #[test]
    fn bytes_deserialization() {
        let s = r#"["", "0x", "0x12", "1234", "0x001"]"#;
        let deserialized: Vec<Bytes> = serde_json::from_str(s).unwrap();
        assert_eq!(
            deserialized,
            vec![
                Bytes(vec![]),
                Bytes(vec![]),
                Bytes(vec![0x12]),
                Bytes(vec![0x12, 0x34]),
                Bytes(vec![0x00, 0x01]),
            ]
        );
    }

    #[test]
    fn bytes_serialization() {
        let s = serde_json::to_string(&Bytes(vec![0xde, 0xad])).unwrap();
        assert_eq!(s, r#""0xdead""#);
    }

    #[test]
    fn bytes_deserialization_rejects_garbage() {
        assert!(serde_json::from_str::<Bytes>(r#""0xzz""#).is_err());
    }
}
