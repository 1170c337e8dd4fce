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

//! Stochastic StateDB workload synthesis.
//!
//! From a captured statistical profile of StateDB operation traffic this
//! crate synthesises an arbitrarily long, statistically faithful operation
//! stream and drives it against a [`statedb::StateDb`] under test. The
//! profile encodes a first-order Markov chain over encoded operation
//! symbols, empirical distributions over argument reuse behaviour, and
//! empirical distributions over scalar payloads.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub mod arguments;
pub mod distribution;
pub mod markov;
pub mod operations;
pub mod profile;
pub mod replay;
pub mod statedb;

pub use self::{
    markov::MarkovChain,
    operations::{ArgKind, Operation},
    profile::Profile,
    replay::{ReplayConfig, ReplaySummary, Replayer, TransitionSampler},
    statedb::StateDb,
};
