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

//! Coverage-guided feedback for the stochastic replayer.
//!
//! Parses the instrumentation runtime's metadata and counter files, tracks
//! coverage deltas between snapshots, and biases the Markov walk toward
//! transitions that keep uncovering new instrumentation units.

#[macro_use]
extern crate log;

mod reader;

pub mod bias;
pub mod counters;
pub mod error;
pub mod meta;
pub mod tracker;

pub use self::{
    bias::{BiasStats, BiasTunables, CoverageBias},
    counters::{parse_counters, CounterFile},
    error::Error,
    meta::{parse_meta, MetaHash, UnitInfo, UnitKey},
    tracker::{CoverageDelta, CoverageTracker},
};
