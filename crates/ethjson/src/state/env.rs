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

//! State test environment deserialization.

use crate::{hash::Address, uint::Uint};

/// State test environment deserialization.
///
/// Fields introduced by later forks (base fee, random, excess blob gas)
/// are optional; older test files simply omit them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Env {
    /// Block author.
    pub current_coinbase: Address,
    /// Block difficulty. Absent in post-merge test files.
    #[serde(default)]
    pub current_difficulty: Option<Uint>,
    /// Block gas limit.
    pub current_gas_limit: Uint,
    /// Block number.
    pub current_number: Uint,
    /// Block timestamp.
    pub current_timestamp: Uint,
    /// EIP-1559 base fee.
    #[serde(default)]
    pub current_base_fee: Option<Uint>,
    /// Post-merge randomness beacon value.
    #[serde(default)]
    pub current_random: Option<Uint>,
    /// EIP-4844 excess blob gas of the current block.
    #[serde(default)]
    pub current_excess_blob_gas: Option<Uint>,
}
