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

//! Delta coverage measurement between counter snapshots.

use crate::{
    counters::CounterFile,
    error::Error,
    meta::{MetaHash, UnitInfo, UnitKey},
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

/// Coverage movement between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoverageDelta {
    /// Units whose counter moved from zero to positive.
    pub new_units: usize,
    /// Source lines covered for the first time.
    pub new_lines: usize,
    /// Change of the covered-unit ratio.
    pub coverage_increase: f64,
    /// Covered-unit ratio after the snapshot.
    pub coverage_now: f64,
}

impl CoverageDelta {
    /// Whether the delta shows any improvement.
    pub fn improved(&self) -> bool {
        self.new_units > 0 || self.new_lines > 0 || self.coverage_increase > 0.0
    }
}

struct TrackerState {
    last_snapshot: BTreeMap<UnitKey, u32>,
    covered_line_keys: HashSet<String>,
    covered_units: usize,
    last_coverage: f64,
}

/// Tracks which instrumentation units and lines have been covered so far.
///
/// The only component safe for concurrent observation: a mutex serialises
/// snapshot application so monitoring threads may call
/// [`CoverageTracker::snapshot`] in parallel with the replay loop.
pub struct CoverageTracker {
    meta_hash: MetaHash,
    units: BTreeMap<UnitKey, UnitInfo>,
    total_units: usize,
    state: Mutex<TrackerState>,
}

impl CoverageTracker {
    /// Builds a tracker over the units whose package path matches one of
    /// `package_prefixes`, snapshotting the initial counter state.
    ///
    /// When the prefixes filter out every unit the tracker warns once and
    /// falls back to the full unit set.
    pub fn new(
        meta_hash: MetaHash,
        units: BTreeMap<UnitKey, UnitInfo>,
        package_prefixes: &[String],
        initial: &CounterFile,
    ) -> Result<Self, Error> {
        initial.verify_hash(&meta_hash)?;
        let mut retained: BTreeMap<UnitKey, UnitInfo> = if package_prefixes.is_empty() {
            units.clone()
        } else {
            units
                .iter()
                .filter(|(_, info)| {
                    package_prefixes
                        .iter()
                        .any(|prefix| info.package_path.starts_with(prefix.as_str()))
                })
                .map(|(key, info)| (*key, info.clone()))
                .collect()
        };
        if retained.is_empty() && !units.is_empty() {
            warn!(
                target: "coverage",
                "package prefixes {package_prefixes:?} match no instrumentation unit; tracking the full module"
            );
            retained = units;
        }

        let flat = initial.unit_counters();
        let mut last_snapshot = BTreeMap::new();
        let mut covered_line_keys = HashSet::new();
        let mut covered_units = 0;
        for (key, info) in &retained {
            let count = flat.get(key).copied().unwrap_or(0);
            last_snapshot.insert(*key, count);
            if count > 0 {
                covered_units += 1;
                covered_line_keys.extend(info.line_keys.iter().cloned());
            }
        }
        let total_units = retained.len();
        let last_coverage = if total_units > 0 {
            covered_units as f64 / total_units as f64
        } else {
            0.0
        };
        Ok(CoverageTracker {
            meta_hash,
            units: retained,
            total_units,
            state: Mutex::new(TrackerState {
                last_snapshot,
                covered_line_keys,
                covered_units,
                last_coverage,
            }),
        })
    }

    /// Number of tracked units.
    pub fn total_units(&self) -> usize {
        self.total_units
    }

    /// Applies a counter snapshot and reports the delta since the previous
    /// one.
    pub fn snapshot(&self, current: &CounterFile) -> Result<CoverageDelta, Error> {
        current.verify_hash(&self.meta_hash)?;
        let flat = current.unit_counters();
        let mut state = self.state.lock();
        let mut delta = CoverageDelta::default();
        for (key, info) in &self.units {
            let count = flat.get(key).copied().unwrap_or(0);
            let previous = state.last_snapshot.insert(*key, count).unwrap_or(0);
            if previous == 0 && count > 0 {
                delta.new_units += 1;
                state.covered_units += 1;
                for line_key in &info.line_keys {
                    if state.covered_line_keys.insert(line_key.clone()) {
                        delta.new_lines += 1;
                    }
                }
            }
        }
        delta.coverage_now = if self.total_units > 0 {
            state.covered_units as f64 / self.total_units as f64
        } else {
            0.0
        };
        delta.coverage_increase = delta.coverage_now - state.last_coverage;
        state.last_coverage = delta.coverage_now;
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::CoverageTracker;
    use crate::{
        counters::{
            test_builder::{build_counters, CounterSpec},
            parse_counters, CounterFile, FLAVOR_ULEB128,
        },
        error::Error,
        meta::{
            parse_meta,
            test_builder::{build_meta, FunctionSpec, PackageSpec},
        },
    };

    const HASH: [u8; 16] = [9u8; 16];

    /// Two packages; the two units of `Get` overlap on line 12.
    fn sample_units() -> (
        [u8; 16],
        std::collections::BTreeMap<crate::meta::UnitKey, crate::meta::UnitInfo>,
    ) {
        let blob = build_meta(
            HASH,
            &[
                PackageSpec {
                    path: "backend/state",
                    functions: vec![FunctionSpec {
                        name: "Get",
                        file: "state.go",
                        units: vec![(10, 1, 12, 2, 3), (12, 3, 14, 2, 2)],
                    }],
                },
                PackageSpec {
                    path: "other/pkg",
                    functions: vec![FunctionSpec {
                        name: "F",
                        file: "f.go",
                        units: vec![(1, 1, 2, 2, 1)],
                    }],
                },
            ],
        );
        parse_meta(&blob).unwrap()
    }

    fn counter_file(values_get: Vec<u32>, values_f: Vec<u32>) -> CounterFile {
        let blob = build_counters(
            HASH,
            FLAVOR_ULEB128,
            false,
            &[
                CounterSpec {
                    pkg: 0,
                    func: 0,
                    values: values_get,
                },
                CounterSpec {
                    pkg: 1,
                    func: 0,
                    values: values_f,
                },
            ],
        );
        parse_counters(&blob).unwrap()
    }

    #[test]
    fn delta_counts_new_units_and_lines() {
        let (hash, units) = sample_units();
        let tracker =
            CoverageTracker::new(hash, units, &[], &counter_file(vec![0, 0], vec![0])).unwrap();
        assert_eq!(tracker.total_units(), 3);

        // unit (0,0,0) covers lines 10..12
        let delta = tracker.snapshot(&counter_file(vec![1, 0], vec![0])).unwrap();
        assert_eq!(delta.new_units, 1);
        assert_eq!(delta.new_lines, 3);
        assert!((delta.coverage_now - 1.0 / 3.0).abs() < 1e-12);
        assert!((delta.coverage_increase - 1.0 / 3.0).abs() < 1e-12);

        // unit (0,0,1) covers 12..14, line 12 already counted
        let delta = tracker.snapshot(&counter_file(vec![1, 2], vec![0])).unwrap();
        assert_eq!(delta.new_units, 1);
        assert_eq!(delta.new_lines, 2);
        assert!((delta.coverage_now - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn unchanged_counters_yield_zero_delta() {
        let (hash, units) = sample_units();
        let tracker =
            CoverageTracker::new(hash, units, &[], &counter_file(vec![1, 0], vec![0])).unwrap();
        let delta = tracker.snapshot(&counter_file(vec![1, 0], vec![0])).unwrap();
        assert_eq!(delta.new_units, 0);
        assert_eq!(delta.new_lines, 0);
        assert_eq!(delta.coverage_increase, 0.0);
        assert!(!delta.improved());
    }

    #[test]
    fn initially_covered_units_do_not_recount() {
        let (hash, units) = sample_units();
        let tracker =
            CoverageTracker::new(hash, units, &[], &counter_file(vec![5, 0], vec![0])).unwrap();
        // the already-covered unit grows; only the fresh unit counts
        let delta = tracker.snapshot(&counter_file(vec![9, 0], vec![3])).unwrap();
        assert_eq!(delta.new_units, 1);
        assert_eq!(delta.new_lines, 2); // f.go:1, f.go:2
    }

    #[test]
    fn prefix_filter_restricts_tracked_units() {
        let (hash, units) = sample_units();
        let tracker = CoverageTracker::new(
            hash,
            units,
            &["backend/".to_owned()],
            &counter_file(vec![0, 0], vec![0]),
        )
        .unwrap();
        assert_eq!(tracker.total_units(), 2);
        // traffic in the filtered-out package is invisible
        let delta = tracker.snapshot(&counter_file(vec![0, 0], vec![7])).unwrap();
        assert_eq!(delta.new_units, 0);
    }

    #[test]
    fn unmatched_prefixes_fall_back_to_full_module() {
        let (hash, units) = sample_units();
        let tracker = CoverageTracker::new(
            hash,
            units,
            &["no/such/module".to_owned()],
            &counter_file(vec![0, 0], vec![0]),
        )
        .unwrap();
        assert_eq!(tracker.total_units(), 3);
    }

    #[test]
    fn hash_mismatch_is_rejected() {
        let (hash, units) = sample_units();
        let mut wrong = counter_file(vec![0, 0], vec![0]);
        wrong.meta_hash = [1u8; 16];
        assert!(matches!(
            CoverageTracker::new(hash, units.clone(), &[], &wrong),
            Err(Error::MetaHashMismatch)
        ));
        let tracker =
            CoverageTracker::new(hash, units, &[], &counter_file(vec![0, 0], vec![0])).unwrap();
        assert!(matches!(
            tracker.snapshot(&wrong),
            Err(Error::MetaHashMismatch)
        ));
    }
}
