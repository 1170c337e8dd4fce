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

//! Argument materialization for synthesised operations.
//!
//! Each argument domain (contract addresses, storage keys, storage values)
//! is an indexed population with a recency queue; the statistical profile
//! decides whether an operation reuses a previous argument, picks a random
//! one, or extends the population.

mod reusable;
mod scalar;
mod single_use;

pub use self::{
    reusable::{ReusableSet, QUEUE_LEN},
    scalar::{ScalarSampler, SnapshotSampler},
    single_use::SingleUseSet,
};

use crate::distribution::{self, Ecdf, Pmf};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use std::fmt;

/// Argument selection errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// `Choose` was called for an absent argument slot.
    ChooseNoArg,
    /// The population cannot grow any further.
    CardinalitySaturated,
    /// A queue position draw fell outside `[1, QUEUE_LEN-1]`.
    QueuePositionOutOfRange(usize),
    /// A removal target is outside the population.
    RemoveOutOfRange(i64),
    /// Removal would shrink the population below its floor.
    BelowMinimumCardinality(i64),
    /// The underlying set produced an index with no translation entry.
    TranslationOutOfRange(i64),
    /// The removal target is not a live argument.
    UnknownArgument(i64),
    /// An invalid empirical distribution was supplied.
    Distribution(distribution::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match *self {
            ChooseNoArg => write!(f, "cannot choose an absent argument"),
            CardinalitySaturated => write!(f, "argument population is saturated"),
            QueuePositionOutOfRange(i) => write!(f, "queue position {i} out of range"),
            RemoveOutOfRange(v) => write!(f, "cannot remove argument {v}: out of range"),
            BelowMinimumCardinality(n) => {
                write!(f, "removal would shrink population below its floor ({n})")
            }
            TranslationOutOfRange(v) => write!(f, "no translation for underlying index {v}"),
            UnknownArgument(v) => write!(f, "argument {v} is not live"),
            Distribution(ref e) => write!(f, "invalid distribution: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<distribution::Error> for Error {
    fn from(e: distribution::Error) -> Self {
        Error::Distribution(e)
    }
}

/// Entropy source for argument selection.
pub trait Randomizer {
    /// Draws an argument index in `[0, n)`; the shifted `sample_arg(n-1)+1`
    /// draws of the argument sets must stay below the population
    /// cardinality.
    fn sample_arg(&mut self, n: i64) -> i64;

    /// Draws a queue position in `[1, QUEUE_LEN - 1]`.
    fn sample_queue(&mut self) -> usize;
}

/// The canonical randomizer: queue positions follow the captured queue
/// distribution (shrunk by its head, which stands for "no recent match"),
/// argument indices follow the captured empirical CDF.
pub struct EmpiricalRandomizer {
    rng: XorShiftRng,
    arg_ecdf: Ecdf,
    queue_pmf: Pmf,
}

impl EmpiricalRandomizer {
    /// Creates a randomizer from profile distributions.
    pub fn new(seed: u64, arg_ecdf: Ecdf, queue_distribution: &Pmf) -> Result<Self, Error> {
        arg_ecdf.check()?;
        queue_distribution.check()?;
        let queue_pmf = queue_distribution.shrink()?;
        Ok(EmpiricalRandomizer {
            rng: XorShiftRng::seed_from_u64(seed),
            arg_ecdf,
            queue_pmf,
        })
    }
}

impl Randomizer for EmpiricalRandomizer {
    fn sample_arg(&mut self, n: i64) -> i64 {
        if n <= 0 {
            return 0;
        }
        self.arg_ecdf.sample(&mut self.rng, n).max(0).min(n - 1)
    }

    fn sample_queue(&mut self) -> usize {
        let u: f64 = self.rng.gen();
        self.queue_pmf.quantile(u) + 1
    }
}

/// A plain uniform randomizer.
pub struct UniformRandomizer {
    rng: XorShiftRng,
}

impl UniformRandomizer {
    /// Creates a seeded uniform randomizer.
    pub fn new(seed: u64) -> Self {
        UniformRandomizer {
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }
}

impl Randomizer for UniformRandomizer {
    fn sample_arg(&mut self, n: i64) -> i64 {
        if n <= 0 {
            return 0;
        }
        self.rng.gen_range(0, n)
    }

    fn sample_queue(&mut self) -> usize {
        self.rng.gen_range(1, QUEUE_LEN)
    }
}
