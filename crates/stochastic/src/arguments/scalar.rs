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

//! Scalar payload samplers.

use crate::distribution::{self, Ecdf};
use rand::Rng;

/// Maps an empirical CDF over [0,1] to integers in `[0, limit)`.
///
/// With fewer than two curve points the sampler degrades to uniform draws.
pub struct ScalarSampler {
    ecdf: Option<Ecdf>,
}

impl ScalarSampler {
    /// Creates a sampler from raw ECDF points.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, distribution::Error> {
        if points.len() < 2 {
            return Ok(ScalarSampler { ecdf: None });
        }
        let ecdf = Ecdf(points);
        ecdf.check()?;
        Ok(ScalarSampler { ecdf: Some(ecdf) })
    }

    /// Swaps in a new empirical curve.
    pub fn replace(&mut self, points: Vec<(f64, f64)>) -> Result<(), distribution::Error> {
        *self = ScalarSampler::new(points)?;
        Ok(())
    }

    /// Draws an integer in `[0, limit)`; zero when the limit is
    /// non-positive.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, limit: i64) -> i64 {
        if limit <= 0 {
            return 0;
        }
        match &self.ecdf {
            Some(ecdf) => ecdf.sample(rng, limit).max(0).min(limit - 1),
            None => rng.gen_range(0, limit),
        }
    }
}

/// Sampler for snapshot-stack depths; the same empirical contract as
/// [`ScalarSampler`], specialised to stack positions.
pub struct SnapshotSampler(ScalarSampler);

impl SnapshotSampler {
    /// Creates a depth sampler from raw ECDF points.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, distribution::Error> {
        Ok(SnapshotSampler(ScalarSampler::new(points)?))
    }

    /// Draws a stack position in `[0, depth)`; zero for an empty stack.
    pub fn sample_depth<R: Rng + ?Sized>(&self, rng: &mut R, depth: usize) -> usize {
        self.0.sample(rng, depth as i64) as usize
    }
}
