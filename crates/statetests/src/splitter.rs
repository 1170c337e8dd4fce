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

//! Expansion of a state test into per-(fork, post-entry) contexts.

use crate::{
    env::BlockEnv,
    fork::Fork,
    transaction::{compose, Message},
};
use ethereum_types::H256;
use ethjson::state::StateTest;

/// The expected outcome a context is validated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    /// Expected post-state root.
    pub state_root: H256,
    /// Expected logs hash.
    pub logs_hash: H256,
    /// Expected execution exception, if any.
    pub expect_exception: Option<String>,
    /// Raw signed transaction bytes, when the file carries them.
    pub txbytes: Option<Vec<u8>>,
}

/// One executable context produced by splitting a state test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestTransaction {
    /// Name of the originating test case.
    pub name: String,
    /// The fork the context runs under (public label, `Paris` already
    /// normalised to `Merge`).
    pub fork: Fork,
    /// The block environment view.
    pub env: BlockEnv,
    /// The executable message.
    pub message: Message,
    /// The expected outcome.
    pub expectation: Expectation,
}

/// Expands one test case into a flat list of contexts, one per
/// (fork, post-entry) pair restricted to `forks`.
///
/// A post-entry whose transaction cannot be composed is skipped with a
/// warning; an unknown fork key drops its whole entry list the same way.
pub fn split_test(name: &str, test: &StateTest, forks: &[Fork]) -> Vec<TestTransaction> {
    let mut transactions = Vec::new();
    for (fork_name, entries) in &test.post {
        let fork = match Fork::from_name(fork_name) {
            Some(fork) => fork,
            None => {
                warn!(target: "statetests", "{name}: skipping unknown fork {fork_name}");
                continue;
            }
        };
        if !forks.contains(&fork) {
            continue;
        }
        let env = BlockEnv::from_json(&test.env, fork);
        let base_fee = env.base_fee();
        for (position, entry) in entries.iter().enumerate() {
            let message = match compose(&test.transaction, &entry.indexes, base_fee) {
                Ok(message) => message,
                Err(e) => {
                    warn!(
                        target: "statetests",
                        "{name}: skipping {fork} post entry {position}: {e}"
                    );
                    continue;
                }
            };
            transactions.push(TestTransaction {
                name: name.to_owned(),
                fork,
                env: env.clone(),
                message,
                expectation: Expectation {
                    state_root: entry.hash.into(),
                    logs_hash: entry.logs.into(),
                    expect_exception: entry.expect_exception.clone(),
                    txbytes: entry.txbytes.clone().map(Into::into),
                },
            });
        }
    }
    transactions
}
