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

//! Reusable argument population with a recency queue.

use super::{Error, Randomizer};
use crate::operations::ArgKind;
use std::collections::VecDeque;

/// Length of the recency queue.
pub const QUEUE_LEN: usize = 32;

/// The population never shrinks below this multiple of the queue length;
/// random draws that avoid the queue must have room to succeed.
const MIN_CARDINALITY: i64 = 10 * QUEUE_LEN as i64;

/// An argument population of cardinality `n` with a sliding window over the
/// most recent selections.
///
/// Index 0 is the reserved zero argument; live arguments are `1..n`.
pub struct ReusableSet {
    n: i64,
    queue: VecDeque<i64>,
    randomizer: Box<dyn Randomizer>,
}

impl ReusableSet {
    /// Creates a population of at least `MIN_CARDINALITY` arguments and
    /// fills the queue with random selections.
    pub fn new(n: i64, mut randomizer: Box<dyn Randomizer>) -> Self {
        let n = n.max(MIN_CARDINALITY);
        let mut queue = VecDeque::with_capacity(QUEUE_LEN);
        for _ in 0..QUEUE_LEN {
            queue.push_front(randomizer.sample_arg(n - 1) + 1);
        }
        ReusableSet {
            n,
            queue,
            randomizer,
        }
    }

    /// Current population cardinality, including the zero sentinel.
    pub fn size(&self) -> i64 {
        self.n
    }

    /// The recency queue, most recent first.
    pub fn queue(&self) -> &VecDeque<i64> {
        &self.queue
    }

    fn push(&mut self, value: i64) {
        self.queue.push_front(value);
        self.queue.pop_back();
    }

    /// Produces an argument index according to `kind`.
    pub fn choose(&mut self, kind: ArgKind) -> Result<i64, Error> {
        match kind {
            ArgKind::NoArg => Err(Error::ChooseNoArg),
            ArgKind::Zero => Ok(0),
            ArgKind::New => {
                if self.n == i64::MAX {
                    return Err(Error::CardinalitySaturated);
                }
                let value = self.n;
                self.n += 1;
                self.push(value);
                Ok(value)
            }
            ArgKind::Rand => loop {
                let value = self.randomizer.sample_arg(self.n - 1) + 1;
                if !self.queue.contains(&value) {
                    self.push(value);
                    return Ok(value);
                }
            },
            ArgKind::Prev => {
                let value = self.queue[0];
                self.push(value);
                Ok(value)
            }
            ArgKind::Recent => {
                let position = self.randomizer.sample_queue();
                if !(1..QUEUE_LEN).contains(&position) {
                    return Err(Error::QueuePositionOutOfRange(position));
                }
                let value = self.queue[position];
                self.push(value);
                Ok(value)
            }
        }
    }

    /// Shrinks the population by one, repairing queue entries left out of
    /// range by the shrink.
    pub fn remove(&mut self, value: i64) -> Result<(), Error> {
        if value <= 0 || value >= self.n {
            return Err(Error::RemoveOutOfRange(value));
        }
        if self.n - 1 < MIN_CARDINALITY {
            return Err(Error::BelowMinimumCardinality(self.n - 1));
        }
        self.n -= 1;
        let replacement = self.randomizer.sample_arg(self.n - 1) + 1;
        let n = self.n;
        for entry in self.queue.iter_mut() {
            if *entry >= n {
                *entry = replacement;
            }
        }
        Ok(())
    }
}
