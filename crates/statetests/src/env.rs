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

//! Read-only block environment view over a state-test `env` section.

use crate::fork::Fork;
use ethereum_types::{BigEndianHash, Address, H256, U256};
use keccak_hash::keccak;

/// Base fee assumed by post-London test contexts that omit the field.
pub const DEFAULT_BASE_FEE: u64 = 0x0a;

/// Gas limit fallback when the environment records zero.
pub const GENESIS_GAS_LIMIT: u64 = 4_712_388;

/// The block environment one test context executes in, specialised to a
/// fork.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEnv {
    /// Block author.
    pub coinbase: Address,
    /// Recorded difficulty, if any.
    pub difficulty: Option<U256>,
    /// Recorded gas limit.
    pub gas_limit: U256,
    /// Block number.
    pub number: u64,
    /// Block timestamp.
    pub timestamp: u64,
    /// Recorded base fee, if any.
    pub base_fee: Option<U256>,
    /// Recorded randomness beacon value, if any.
    pub random: Option<H256>,
    /// Recorded excess blob gas, if any.
    pub excess_blob_gas: Option<u64>,
    /// The fork the context runs under.
    pub fork: Fork,
}

impl BlockEnv {
    /// Builds the view from a parsed `env` section.
    pub fn from_json(env: &ethjson::state::Env, fork: Fork) -> Self {
        BlockEnv {
            coinbase: env.current_coinbase.into(),
            difficulty: env.current_difficulty.map(Into::into),
            gas_limit: env.current_gas_limit.into(),
            number: env.current_number.into(),
            timestamp: env.current_timestamp.into(),
            base_fee: env.current_base_fee.map(Into::into),
            random: env
                .current_random
                .map(|r| BigEndianHash::from_uint(&r.into())),
            excess_blob_gas: env.current_excess_blob_gas.map(Into::into),
            fork,
        }
    }

    /// EIP-1559 base fee: the recorded value post-London, defaulting to
    /// [`DEFAULT_BASE_FEE`] when absent; none before London.
    pub fn base_fee(&self) -> Option<U256> {
        if !self.fork.is_london() {
            return None;
        }
        Some(self.base_fee.unwrap_or_else(|| DEFAULT_BASE_FEE.into()))
    }

    /// The synthetic hash of an ancestor block.
    pub fn block_hash(number: u64) -> H256 {
        keccak(number.to_string().as_bytes())
    }

    /// Block gas limit, falling back to the genesis default for a zero
    /// record.
    pub fn gas_limit(&self) -> U256 {
        if self.gas_limit.is_zero() {
            GENESIS_GAS_LIMIT.into()
        } else {
            self.gas_limit
        }
    }

    /// Block difficulty: zero once the randomness beacon replaces it.
    pub fn difficulty(&self) -> U256 {
        if self.fork.is_london() && self.random.is_some() {
            return U256::zero();
        }
        self.difficulty.unwrap_or_default()
    }

    /// The randomness beacon value, exposed post-London only.
    pub fn random(&self) -> Option<H256> {
        if self.fork.is_london() {
            self.random
        } else {
            None
        }
    }

    /// EIP-4844 blob base fee; none before Cancun.
    pub fn blob_base_fee(&self) -> Option<U256> {
        if !self.fork.is_cancun() {
            return None;
        }
        let excess = self.excess_blob_gas.unwrap_or(0);
        Some(fake_exponential(
            U256::one(),
            excess.into(),
            self.fork.blob_base_fee_update_fraction().into(),
        ))
    }
}

/// The EIP-4844 `fake_exponential`: approximates
/// `factor * e^(numerator/denominator)` by Taylor expansion in integer
/// arithmetic.
fn fake_exponential(factor: U256, numerator: U256, denominator: U256) -> U256 {
    let mut i = U256::one();
    let mut output = U256::zero();
    let mut accum = factor * denominator;
    while !accum.is_zero() {
        output += accum;
        accum = accum * numerator / (denominator * i);
        i += U256::one();
    }
    output / denominator
}
