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

//! Single-use argument layer for the contract address domain.

use super::{Error, Randomizer, ReusableSet};
use crate::operations::ArgKind;

/// A layer over [`ReusableSet`] that retires removed arguments permanently.
///
/// The underlying set works on a dense index space `1..n`; this layer
/// resolves those indices through a translation table of live argument
/// identities, so a self-destructed address can never be selected again
/// even though the dense space is reused.
pub struct SingleUseSet {
    inner: ReusableSet,
    translation: Vec<i64>,
    next: i64,
}

impl SingleUseSet {
    /// Creates a single-use population over a fresh underlying set.
    pub fn new(n: i64, randomizer: Box<dyn Randomizer>) -> Self {
        let inner = ReusableSet::new(n, randomizer);
        let size = inner.size();
        SingleUseSet {
            inner,
            translation: (1..size).collect(),
            next: size,
        }
    }

    /// Current population cardinality, including the zero sentinel.
    pub fn size(&self) -> i64 {
        self.inner.size()
    }

    /// Produces a live argument identity according to `kind`.
    pub fn choose(&mut self, kind: ArgKind) -> Result<i64, Error> {
        let index = self.inner.choose(kind)?;
        if index == 0 {
            return Ok(0);
        }
        if kind == ArgKind::New {
            // the underlying population grew by one; mirror it with a
            // fresh identity
            self.translation.push(self.next);
            self.next += 1;
        }
        if index < 1 || index as usize > self.translation.len() {
            return Err(Error::TranslationOutOfRange(index));
        }
        Ok(self.translation[(index - 1) as usize])
    }

    /// Retires an argument identity permanently. A no-op for the zero
    /// sentinel.
    pub fn remove(&mut self, value: i64) -> Result<(), Error> {
        if value == 0 {
            return Ok(());
        }
        let position = self
            .translation
            .iter()
            .position(|&live| live == value)
            .ok_or(Error::UnknownArgument(value))?;
        self.translation.remove(position);
        self.inner.remove(position as i64 + 1)
    }
}
