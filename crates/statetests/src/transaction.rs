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

//! Composition of one executable message out of a state-test template.

use crate::error::Error;
use crypto::publickey::KeyPair;
use ethereum_types::{Address, H256, U256};
use ethjson::state::{MultiTransaction, PostStateIndexes};

/// One entry of a composed access list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessListItem {
    /// Accessed account.
    pub address: Address,
    /// Accessed storage slots.
    pub storage_keys: Vec<H256>,
}

/// One entry of a composed EIP-7702 authorization list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationItem {
    /// Chain the authorization is valid on.
    pub chain_id: U256,
    /// Delegation target.
    pub address: Address,
    /// Authority nonce.
    pub nonce: u64,
    /// Signature y-parity.
    pub v: U256,
    /// Signature r.
    pub r: U256,
    /// Signature s.
    pub s: U256,
    /// Pre-recovered authority, when the test provides it.
    pub signer: Option<Address>,
}

/// An executable transaction context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sender.
    pub from: Address,
    /// Recipient; none for contract creation.
    pub to: Option<Address>,
    /// Sender nonce.
    pub nonce: U256,
    /// Gas limit.
    pub gas: U256,
    /// Effective gas price.
    pub gas_price: U256,
    /// Transferred value.
    pub value: U256,
    /// Call data.
    pub data: Vec<u8>,
    /// Access list.
    pub access_list: Vec<AccessListItem>,
    /// Authorization list.
    pub authorization_list: Vec<AuthorizationItem>,
    /// Blob versioned hashes.
    pub blob_hashes: Vec<H256>,
    /// Blob fee cap.
    pub max_fee_per_blob_gas: Option<U256>,
}

fn pick<'a, T>(array: &'a [T], index: u64, name: &'static str) -> Result<&'a T, Error> {
    array
        .get(index as usize)
        .ok_or(Error::IndexOutOfBounds {
            array: name,
            index,
            len: array.len(),
        })
}

/// Derives the sender address: explicit `sender` wins, otherwise the
/// public key is recovered from `secretKey`.
fn sender(transaction: &MultiTransaction) -> Result<Address, Error> {
    if let Some(sender) = transaction.sender {
        return Ok(sender.into());
    }
    let secret: ethereum_types::H256 = transaction.secret_key.ok_or(Error::MissingSender)?.into();
    let keypair = KeyPair::from_secret(secret.into())
        .map_err(|e| Error::SenderRecovery(e.to_string()))?;
    Ok(keypair.address())
}

/// The effective gas price of one context.
///
/// With a base fee the EIP-1559 rules apply, legacy `gasPrice` standing in
/// for an absent fee cap; without one the legacy price is mandatory.
fn effective_gas_price(
    transaction: &MultiTransaction,
    base_fee: Option<U256>,
) -> Result<U256, Error> {
    match base_fee {
        Some(base_fee) => {
            let max_fee: U256 = transaction
                .max_fee_per_gas
                .or(transaction.gas_price)
                .map(Into::into)
                .unwrap_or_default();
            let priority: U256 = transaction
                .max_priority_fee_per_gas
                .map(Into::into)
                .unwrap_or(max_fee);
            Ok((priority + base_fee).min(max_fee))
        }
        None => transaction
            .gas_price
            .map(Into::into)
            .ok_or(Error::MissingGasPrice),
    }
}

/// Composes the executable message selected by a post-entry's indexes,
/// under the given base-fee context.
pub fn compose(
    transaction: &MultiTransaction,
    indexes: &PostStateIndexes,
    base_fee: Option<U256>,
) -> Result<Message, Error> {
    let data = pick(&transaction.data, indexes.data, "data")?.clone();
    let gas = *pick(&transaction.gas_limit, indexes.gas, "gasLimit")?;
    let value = *pick(&transaction.value, indexes.value, "value")?;

    let access_list = transaction
        .access_lists
        .get(indexes.data as usize)
        .cloned()
        .flatten()
        .unwrap_or_default()
        .into_iter()
        .map(|entry| AccessListItem {
            address: entry.address.into(),
            storage_keys: entry.storage_keys.into_iter().map(Into::into).collect(),
        })
        .collect();

    let authorization_list = transaction
        .authorization_list
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|auth| AuthorizationItem {
            chain_id: auth.chain_id.into(),
            address: auth.address.into(),
            nonce: auth.nonce.into(),
            v: auth.v.into(),
            r: auth.r.into(),
            s: auth.s.into(),
            signer: auth.signer.map(Into::into),
        })
        .collect();

    Ok(Message {
        from: sender(transaction)?,
        to: Option::<ethjson::hash::Address>::from(transaction.to.clone()).map(Into::into),
        nonce: transaction.nonce.into(),
        gas: gas.into(),
        gas_price: effective_gas_price(transaction, base_fee)?,
        value: value.into(),
        data: data.into(),
        access_list,
        authorization_list,
        blob_hashes: transaction
            .blob_versioned_hashes
            .iter()
            .copied()
            .map(Into::into)
            .collect(),
        max_fee_per_blob_gas: transaction.max_fee_per_blob_gas.map(Into::into),
    })
}

#[cfg(test)]
mod tests {
    use super::compose;
    use crate::error::Error;
    use ethereum_types::{Address, U256};
    use ethjson::state::{MultiTransaction, PostStateIndexes};
    use std::str::FromStr;

    /// The signing key used across the canonical test suites.
    const WELL_KNOWN_SECRET: &str =
        "0x45a915e4d060149eb4365960e6a7a45f334393093061116b197e3240065ff2d8";
    const WELL_KNOWN_SENDER: &str = "a94f5374fce5edbc8e2a8697c15331677e6ebf0b";

    fn template(extra: &str) -> MultiTransaction {
        serde_json::from_str(&format!(
            r#"{{
                {extra}
                "data": ["", "0x6001"],
                "gasLimit": ["0x061a80"],
                "nonce": "0x01",
                "secretKey": "{WELL_KNOWN_SECRET}",
                "to": "095e7baea6a6c7c4c2dfeb977efac326af552d87",
                "value": ["0x00", "0x0186a0"]
            }}"#
        ))
        .unwrap()
    }

    fn indexes(data: u64, gas: u64, value: u64) -> PostStateIndexes {
        PostStateIndexes { data, gas, value }
    }

    #[test]
    fn sender_is_recovered_from_the_secret_key() {
        let tx = template(r#""gasPrice": "0x0a","#);
        let message = compose(&tx, &indexes(0, 0, 0), None).unwrap();
        assert_eq!(
            message.from,
            Address::from_str(WELL_KNOWN_SENDER).unwrap()
        );
        assert_eq!(
            message.to,
            Some(Address::from_str("095e7baea6a6c7c4c2dfeb977efac326af552d87").unwrap())
        );
    }

    #[test]
    fn explicit_sender_wins_over_recovery() {
        let tx = template(
            r#""gasPrice": "0x0a", "sender": "0x00000000000000000000000000000000deadbeef","#,
        );
        let message = compose(&tx, &indexes(0, 0, 0), None).unwrap();
        assert_eq!(
            message.from,
            Address::from_str("00000000000000000000000000000000deadbeef").unwrap()
        );
    }

    #[test]
    fn missing_sender_and_key_is_an_error() {
        let mut tx = template(r#""gasPrice": "0x0a","#);
        tx.secret_key = None;
        assert!(matches!(
            compose(&tx, &indexes(0, 0, 0), None),
            Err(Error::MissingSender)
        ));
    }

    #[test]
    fn indexes_select_template_entries() {
        let tx = template(r#""gasPrice": "0x0a","#);
        let message = compose(&tx, &indexes(1, 0, 1), None).unwrap();
        assert_eq!(message.data, vec![0x60, 0x01]);
        assert_eq!(message.value, U256::from(100_000));

        assert!(matches!(
            compose(&tx, &indexes(2, 0, 0), None),
            Err(Error::IndexOutOfBounds { array: "data", .. })
        ));
        assert!(matches!(
            compose(&tx, &indexes(0, 1, 0), None),
            Err(Error::IndexOutOfBounds { array: "gasLimit", .. })
        ));
        assert!(matches!(
            compose(&tx, &indexes(0, 0, 2), None),
            Err(Error::IndexOutOfBounds { array: "value", .. })
        ));
    }

    #[test]
    fn legacy_pricing_requires_a_gas_price() {
        let tx = template("");
        assert!(matches!(
            compose(&tx, &indexes(0, 0, 0), None),
            Err(Error::MissingGasPrice)
        ));
    }

    #[test]
    fn eip1559_pricing_caps_at_max_fee() {
        // maxFee 100, priority 2, base 10 -> min(2 + 10, 100) = 12
        let tx = template(
            r#""maxFeePerGas": "0x64", "maxPriorityFeePerGas": "0x02","#,
        );
        let message = compose(&tx, &indexes(0, 0, 0), Some(U256::from(10))).unwrap();
        assert_eq!(message.gas_price, U256::from(12));

        // priority defaults to the fee cap: min(100 + 10, 100) = 100
        let tx = template(r#""maxFeePerGas": "0x64","#);
        let message = compose(&tx, &indexes(0, 0, 0), Some(U256::from(10))).unwrap();
        assert_eq!(message.gas_price, U256::from(100));

        // legacy gasPrice stands in for the fee cap
        let tx = template(r#""gasPrice": "0x14","#);
        let message = compose(&tx, &indexes(0, 0, 0), Some(U256::from(10))).unwrap();
        assert_eq!(message.gas_price, U256::from(20));
    }

    #[test]
    fn access_list_follows_the_data_index() {
        let tx = template(
            r#""gasPrice": "0x0a",
               "accessLists": [
                   null,
                   [{"address": "0x0000000000000000000000000000000000001337",
                     "storageKeys": ["0x0000000000000000000000000000000000000000000000000000000000000001"]}]
               ],"#,
        );
        let none = compose(&tx, &indexes(0, 0, 0), None).unwrap();
        assert!(none.access_list.is_empty());
        let some = compose(&tx, &indexes(1, 0, 0), None).unwrap();
        assert_eq!(some.access_list.len(), 1);
        assert_eq!(
            some.access_list[0].address,
            Address::from_str("0000000000000000000000000000000000001337").unwrap()
        );
        assert_eq!(some.access_list[0].storage_keys.len(), 1);
    }

    #[test]
    fn contract_creation_has_no_recipient() {
        let mut tx = template(r#""gasPrice": "0x0a","#);
        tx.to = ethjson::MaybeEmpty::None;
        let message = compose(&tx, &indexes(0, 0, 0), None).unwrap();
        assert_eq!(message.to, None);
    }
}
