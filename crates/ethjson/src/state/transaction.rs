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

//! State test transaction template deserialization.

use crate::{
    bytes::Bytes,
    hash::{Address, H256},
    maybe::MaybeEmpty,
    uint::Uint,
};

/// An access list, as introduced by EIP-2930.
pub type AccessList = Vec<AccessListEntry>;

/// One entry of an EIP-2930 access list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    /// Accessed account.
    pub address: Address,
    /// Accessed storage slots.
    pub storage_keys: Vec<H256>,
}

/// One entry of an EIP-7702 authorization list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Chain the authorization is valid on.
    pub chain_id: Uint,
    /// Delegation target.
    pub address: Address,
    /// Authority nonce.
    pub nonce: Uint,
    /// Signature y-parity.
    #[serde(alias = "yParity")]
    pub v: Uint,
    /// Signature r.
    pub r: Uint,
    /// Signature s.
    pub s: Uint,
    /// Pre-recovered authority, when the test file provides it.
    #[serde(default)]
    pub signer: Option<Address>,
}

/// State test transaction template.
///
/// The `data`/`gasLimit`/`value` arrays are indexed by each post-entry to
/// select one concrete transaction out of the template.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTransaction {
    /// Call data variants.
    #[serde(default)]
    pub data: Vec<Bytes>,
    /// Access lists, indexed in lockstep with `data`.
    #[serde(default)]
    pub access_lists: Vec<Option<AccessList>>,
    /// Gas limit variants.
    pub gas_limit: Vec<Uint>,
    /// Legacy gas price.
    #[serde(default)]
    pub gas_price: Option<Uint>,
    /// EIP-1559 fee cap.
    #[serde(default)]
    pub max_fee_per_gas: Option<Uint>,
    /// EIP-1559 priority fee.
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<Uint>,
    /// EIP-4844 blob fee cap.
    #[serde(default)]
    pub max_fee_per_blob_gas: Option<Uint>,
    /// EIP-4844 blob versioned hashes.
    #[serde(default)]
    pub blob_versioned_hashes: Vec<H256>,
    /// Sender nonce.
    #[serde(default)]
    pub nonce: Uint,
    /// Signing key; the sender address is recovered from it.
    #[serde(default)]
    pub secret_key: Option<H256>,
    /// Explicit sender, overriding key recovery.
    #[serde(default)]
    pub sender: Option<Address>,
    /// Recipient; the empty string denotes contract creation.
    #[serde(default)]
    pub to: MaybeEmpty<Address>,
    /// Transferred value variants.
    pub value: Vec<Uint>,
    /// EIP-7702 authorization list.
    #[serde(default)]
    pub authorization_list: Option<Vec<Authorization>>,
}

#[cfg(test)]
mod test {
    use super::MultiTransaction;
    use crate::maybe::MaybeEmpty;
    use ethereum_types::U256;

    #[test]
    fn multi_transaction_deserialization() {
        let s = r#"{
            "data": ["", "0x6001"],
            "accessLists": [null, [{"address": "0x0000000000000000000000000000000000001337", "storageKeys": ["0x0000000000000000000000000000000000000000000000000000000000000000"]}]],
            "gasLimit": ["0x061a80"],
            "gasPrice": "0x0a",
            "nonce": "0x00",
            "secretKey": "0x45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8",
            "to": "095e7baea6a6c7c4c2dfeb977efac326af552d87",
            "value": ["0x00", "0x0186a0", "0x"]
        }"#;
        let tx: MultiTransaction = serde_json::from_str(s).unwrap();
        assert_eq!(tx.data.len(), 2);
        assert_eq!(tx.access_lists.len(), 2);
        assert!(tx.access_lists[0].is_none());
        assert_eq!(tx.access_lists[1].as_ref().unwrap().len(), 1);
        assert_eq!(tx.value.len(), 3);
        // "0x" is lenient zero
        assert_eq!(U256::from(tx.value[2]), U256::zero());
        assert!(tx.max_fee_per_gas.is_none());
        assert!(matches!(tx.to, MaybeEmpty::Some(_)));
    }

    #[test]
    fn contract_creation_has_empty_to() {
        let s = r#"{
            "data": [""],
            "gasLimit": ["0x061a80"],
            "gasPrice": "0x0a",
            "nonce": "0x00",
            "to": "",
            "value": ["0x00"]
        }"#;
        let tx: MultiTransaction = serde_json::from_str(s).unwrap();
        assert_eq!(tx.to, MaybeEmpty::None);
    }
}
