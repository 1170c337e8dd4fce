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

//! Lenient hash json deserialization for test json files.

use serde::{
    de::{Error, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{fmt, str::FromStr};

macro_rules! impl_hash {
    ($name:ident, $inner:ident) => {
        /// Lenient hash json deserialization for test json files.
        #[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
        pub struct $name(pub ethereum_types::$inner);

        impl From<$name> for ethereum_types::$inner {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl From<ethereum_types::$inner> for $name {
            fn from(val: ethereum_types::$inner) -> Self {
                $name(val)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.collect_str(&format_args!("0x{:x}", self.0))
            }
        }

        impl<'a> Deserialize<'a> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'a>,
            {
                struct HashVisitor;

                impl<'b> Visitor<'b> for HashVisitor {
                    type Value = $name;

                    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                        write!(formatter, "a 0x-prefixed or raw hex encoded hash")
                    }

                    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
                    where
                        E: Error,
                    {
                        let unprefixed = value.strip_prefix("0x").unwrap_or(value);
                        let hash = ethereum_types::$inner::from_str(unprefixed).map_err(|e| {
                            Error::custom(format!("Invalid hex value {value}: {e}").as_str())
                        })?;

                        Ok($name(hash))
                    }

                    fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
                    where
                        E: Error,
                    {
                        self.visit_str(value.as_ref())
                    }
                }

                deserializer.deserialize_any(HashVisitor)
            }
        }
    };
}

impl_hash!(Address, H160);
impl_hash!(H256, H256);

#[cfg(test)]
mod test {
    use super::{Address, H256};
    use std::str::FromStr;

    #[test]
    fn hash_deserialization() {
        let s = r#"["0x5a39ed1020c04d4d84539975b893a4e7c53eab6c2965db8bc3468093a31bc5ae",
                    "5a39ed1020c04d4d84539975b893a4e7c53eab6c2965db8bc3468093a31bc5ae"]"#;
        let deserialized: Vec<H256> = serde_json::from_str(s).unwrap();
        let expected = H256(
            ethereum_types::H256::from_str(
                "5a39ed1020c04d4d84539975b893a4e7c53eab6c2965db8bc3468093a31bc5ae",
            )
            .unwrap(),
        );
        assert_eq!(deserialized, vec![expected, expected]);
    }

    #[test]
    fn address_serialization_is_lowercase_prefixed() {
        let addr = Address(
            ethereum_types::Address::from_str("A94F5374FCE5EDBC8E2A8697C15331677E6EBF0B").unwrap(),
        );
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            r#""0xa94f5374fce5edbc8e2a8697c15331677e6ebf0b""#
        );
    }

    #[test]
    fn hash_deserialization_rejects_bad_length() {
        let s = r#""0xdeadbeef""#;
        assert!(serde_json::from_str::<H256>(s).is_err());
    }
}
