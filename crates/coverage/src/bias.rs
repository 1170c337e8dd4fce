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

//! Coverage-guided bias over the Markov walk.
//!
//! States whose execution uncovers new instrumentation units receive a
//! weight boost, pulling the walk toward the behaviour that keeps finding
//! new code. A heuristic: the tunables are exposed, no convergence is
//! claimed. Owned by the replay loop; not safe for concurrent use.

use crate::{error::Error, tracker::CoverageDelta};
use stochastic::{markov, replay::TransitionSampler, MarkovChain};

/// Boost and clamp parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasTunables {
    /// Flat boost for any improving delta.
    pub base_boost: f64,
    /// Boost per newly covered unit.
    pub unit_factor: f64,
    /// Boost per newly covered line.
    pub line_factor: f64,
    /// Boost per point of coverage-ratio increase.
    pub coverage_factor: f64,
    /// Lower weight clamp.
    pub min_weight: f64,
    /// Upper weight clamp.
    pub max_weight: f64,
}

impl Default for BiasTunables {
    fn default() -> Self {
        BiasTunables {
            base_boost: 0.05,
            unit_factor: 0.05,
            line_factor: 0.01,
            coverage_factor: 1.0,
            min_weight: 0.1,
            max_weight: 10.0,
        }
    }
}

/// Boost statistics counters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BiasStats {
    /// Number of applied boosts.
    pub total_boosts: u64,
    /// Newly covered units across all boosts.
    pub total_new_units: u64,
    /// Newly covered lines across all boosts.
    pub total_new_lines: u64,
}

/// Per-state weights biasing the Markov walk.
pub struct CoverageBias {
    weights: Vec<f64>,
    tunables: BiasTunables,
    stats: BiasStats,
}

impl CoverageBias {
    /// Creates an unbiased weight vector for `num_states` states.
    pub fn new(num_states: usize) -> Self {
        Self::with_tunables(num_states, BiasTunables::default())
    }

    /// Creates the bias with explicit tunables.
    pub fn with_tunables(num_states: usize, tunables: BiasTunables) -> Self {
        CoverageBias {
            weights: vec![1.0; num_states],
            tunables,
            stats: BiasStats::default(),
        }
    }

    /// The current weight vector.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Rewards `state` for an improving coverage delta; a no-op otherwise.
    pub fn boost(&mut self, state: usize, delta: &CoverageDelta) -> Result<(), Error> {
        let len = self.weights.len();
        let weight = self
            .weights
            .get_mut(state)
            .ok_or(Error::StateOutOfRange { state, len })?;
        if !delta.improved() {
            return Ok(());
        }
        let tunables = &self.tunables;
        let boost = tunables.base_boost
            + delta.new_units as f64 * tunables.unit_factor
            + delta.new_lines as f64 * tunables.line_factor
            + delta.coverage_increase.max(0.0) * tunables.coverage_factor;
        *weight = (*weight + boost)
            .max(tunables.min_weight)
            .min(tunables.max_weight);
        self.stats.total_boosts += 1;
        self.stats.total_new_units += delta.new_units as u64;
        self.stats.total_new_lines += delta.new_lines as u64;
        Ok(())
    }

    /// Returns every weight to 1.0.
    pub fn reset_weights(&mut self) {
        for weight in &mut self.weights {
            *weight = 1.0;
        }
    }

    /// Accumulated boost statistics.
    pub fn stats(&self) -> BiasStats {
        self.stats
    }
}

impl TransitionSampler for CoverageBias {
    fn next_state(
        &mut self,
        chain: &MarkovChain,
        current: usize,
        u: f64,
    ) -> Result<usize, markov::Error> {
        chain.weighted_sample(current, u, &self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::{BiasTunables, CoverageBias};
    use crate::{error::Error, tracker::CoverageDelta};
    use stochastic::{replay::TransitionSampler, MarkovChain};

    fn improving_delta() -> CoverageDelta {
        CoverageDelta {
            new_units: 10,
            new_lines: 5,
            coverage_increase: 0.5,
            coverage_now: 0.5,
        }
    }

    #[test]
    fn boost_accumulates_and_clamps_at_max() {
        let mut bias = CoverageBias::new(3);
        for _ in 0..100 {
            bias.boost(1, &improving_delta()).unwrap();
        }
        assert_eq!(bias.weights()[1], 10.0);
        assert_eq!(bias.weights()[0], 1.0);
        let stats = bias.stats();
        assert_eq!(stats.total_boosts, 100);
        assert_eq!(stats.total_new_units, 1000);
        assert_eq!(stats.total_new_lines, 500);
    }

    #[test]
    fn boost_without_improvement_is_a_no_op() {
        let mut bias = CoverageBias::new(2);
        bias.boost(0, &CoverageDelta::default()).unwrap();
        assert_eq!(bias.weights()[0], 1.0);
        assert_eq!(bias.stats().total_boosts, 0);
    }

    #[test]
    fn boost_rejects_out_of_range_state() {
        let mut bias = CoverageBias::new(2);
        assert!(matches!(
            bias.boost(2, &improving_delta()),
            Err(Error::StateOutOfRange { state: 2, len: 2 })
        ));
    }

    #[test]
    fn reset_restores_unit_weights() {
        let mut bias = CoverageBias::new(2);
        bias.boost(0, &improving_delta()).unwrap();
        assert!(bias.weights()[0] > 1.0);
        bias.reset_weights();
        assert_eq!(bias.weights(), &[1.0, 1.0]);
    }

    #[test]
    fn sampling_follows_boosted_weights() {
        let labels: Vec<String> = (0..3).map(|i| format!("S{i}")).collect();
        let chain = MarkovChain::new(vec![vec![1.0 / 3.0; 3]; 3], labels).unwrap();
        let mut bias = CoverageBias::with_tunables(
            3,
            BiasTunables {
                max_weight: 1_000.0,
                ..BiasTunables::default()
            },
        );
        // drive state 2's weight far above the others
        for _ in 0..500 {
            bias.boost(2, &improving_delta()).unwrap();
        }
        let mut hits = 0;
        for i in 0..100 {
            let u = i as f64 / 100.0;
            if bias.next_state(&chain, 0, u).unwrap() == 2 {
                hits += 1;
            }
        }
        assert!(hits > 90, "only {hits} of 100 draws hit the boosted state");
    }
}
