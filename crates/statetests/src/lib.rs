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

//! Ethereum state-test splitting.
//!
//! Consumes canonical state-test JSON files and expands each into a flat
//! sequence of executable transaction contexts, one per (fork, post-entry)
//! pair, with correct fee and base-fee semantics.

#[macro_use]
extern crate log;

pub mod discovery;
pub mod env;
pub mod error;
pub mod fork;
pub mod splitter;
pub mod transaction;

pub use self::{
    discovery::{discover, TestCategory},
    env::BlockEnv,
    error::Error,
    fork::Fork,
    splitter::{split_test, Expectation, TestTransaction},
    transaction::{compose, Message},
};
