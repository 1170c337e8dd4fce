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

//! First-order Markov chain over labeled states.

use crate::distribution::{quantile_slice, KahanSum, SUM_TOLERANCE};
use std::{collections::HashSet, fmt};

/// Markov chain errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Label list length does not match the matrix dimension.
    LabelCount {
        /// Number of labels supplied.
        labels: usize,
        /// Number of matrix rows.
        rows: usize,
    },
    /// A label occurs more than once.
    DuplicateLabel(String),
    /// A row has the wrong number of columns.
    NotSquare {
        /// Offending row.
        row: usize,
        /// Its column count.
        columns: usize,
        /// Expected column count.
        expected: usize,
    },
    /// A transition probability is NaN or outside [0,1].
    BadProbability {
        /// Offending row.
        row: usize,
        /// Offending column.
        column: usize,
        /// The value.
        value: f64,
    },
    /// A row does not sum to one within tolerance.
    BadRowSum {
        /// Offending row.
        row: usize,
        /// Its sum.
        sum: f64,
    },
    /// A state index is out of range.
    StateOutOfRange(usize),
    /// A uniform draw is outside [0,1).
    UniformOutOfRange(f64),
    /// A weight vector has the wrong length or invalid entries.
    BadWeights,
    /// No stationary distribution exists for the chain.
    NoStationaryDistribution,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match *self {
            LabelCount { labels, rows } => {
                write!(f, "{labels} labels for a {rows}-state matrix")
            }
            DuplicateLabel(ref l) => write!(f, "duplicate state label {l}"),
            NotSquare {
                row,
                columns,
                expected,
            } => write!(f, "row {row} has {columns} columns, expected {expected}"),
            BadProbability { row, column, value } => {
                write!(f, "invalid probability {value} at ({row},{column})")
            }
            BadRowSum { row, sum } => write!(f, "row {row} sums to {sum}, expected 1"),
            StateOutOfRange(i) => write!(f, "state index {i} out of range"),
            UniformOutOfRange(u) => write!(f, "uniform draw {u} outside [0,1)"),
            BadWeights => write!(f, "weight vector does not match the chain"),
            NoStationaryDistribution => write!(f, "chain has no stationary distribution"),
        }
    }
}

impl std::error::Error for Error {}

/// A row-stochastic matrix with one unique label per state.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkovChain {
    labels: Vec<String>,
    matrix: Vec<Vec<f64>>,
}

impl MarkovChain {
    /// Validates and constructs a chain.
    pub fn new(matrix: Vec<Vec<f64>>, labels: Vec<String>) -> Result<Self, Error> {
        let n = matrix.len();
        if labels.len() != n {
            return Err(Error::LabelCount {
                labels: labels.len(),
                rows: n,
            });
        }
        let mut seen = HashSet::with_capacity(n);
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(Error::DuplicateLabel(label.clone()));
            }
        }
        for (i, row) in matrix.iter().enumerate() {
            if row.len() != n {
                return Err(Error::NotSquare {
                    row: i,
                    columns: row.len(),
                    expected: n,
                });
            }
            let mut sum = KahanSum::new();
            for (j, &p) in row.iter().enumerate() {
                if p.is_nan() || !(0.0..=1.0).contains(&p) {
                    return Err(Error::BadProbability {
                        row: i,
                        column: j,
                        value: p,
                    });
                }
                sum.add(p);
            }
            if (sum.value() - 1.0).abs() > SUM_TOLERANCE {
                return Err(Error::BadRowSum {
                    row: i,
                    sum: sum.value(),
                });
            }
        }
        Ok(MarkovChain { labels, matrix })
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the chain has no states.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The ordered state labels.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Draws the successor of state `i` at uniform `u`.
    pub fn sample(&self, i: usize, u: f64) -> Result<usize, Error> {
        if i >= self.len() {
            return Err(Error::StateOutOfRange(i));
        }
        if !(0.0..1.0).contains(&u) {
            return Err(Error::UniformOutOfRange(u));
        }
        Ok(quantile_slice(&self.matrix[i], u))
    }

    /// Draws the successor of state `i` after reweighting the row
    /// elementwise by `weights` and renormalising.
    ///
    /// Falls back to the plain transition row when every reweighted
    /// probability vanishes.
    pub fn weighted_sample(&self, i: usize, u: f64, weights: &[f64]) -> Result<usize, Error> {
        if i >= self.len() {
            return Err(Error::StateOutOfRange(i));
        }
        if !(0.0..1.0).contains(&u) {
            return Err(Error::UniformOutOfRange(u));
        }
        if weights.len() != self.len() || weights.iter().any(|w| w.is_nan() || *w < 0.0) {
            return Err(Error::BadWeights);
        }
        let row = &self.matrix[i];
        let mut total = KahanSum::new();
        let reweighted: Vec<f64> = row
            .iter()
            .zip(weights)
            .map(|(p, w)| {
                let r = p * w;
                total.add(r);
                r
            })
            .collect();
        if total.value() <= 0.0 {
            return self.sample(i, u);
        }
        let scale = 1.0 / total.value();
        let normalised: Vec<f64> = reweighted.iter().map(|r| r * scale).collect();
        Ok(quantile_slice(&normalised, u))
    }

    /// Computes the stationary distribution, the left fixed point `πA = π`
    /// normalised to sum one over magnitudes.
    pub fn stationary(&self) -> Result<Vec<f64>, Error> {
        let n = self.len();
        if n == 0 {
            return Err(Error::NoStationaryDistribution);
        }
        // (Aᵀ - I)π = 0 with the last equation replaced by Σπ = 1
        let mut system = vec![vec![0.0; n + 1]; n];
        for i in 0..n - 1 {
            for j in 0..n {
                system[i][j] = self.matrix[j][i] - if i == j { 1.0 } else { 0.0 };
            }
        }
        for j in 0..n {
            system[n - 1][j] = 1.0;
        }
        system[n - 1][n] = 1.0;

        // Gaussian elimination with partial pivoting
        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&a, &b| {
                    system[a][col]
                        .abs()
                        .partial_cmp(&system[b][col].abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .ok_or(Error::NoStationaryDistribution)?;
            if system[pivot_row][col].abs() < SUM_TOLERANCE {
                return Err(Error::NoStationaryDistribution);
            }
            system.swap(col, pivot_row);
            for row in col + 1..n {
                let factor = system[row][col] / system[col][col];
                for k in col..=n {
                    system[row][k] -= factor * system[col][k];
                }
            }
        }
        let mut pi = vec![0.0; n];
        for row in (0..n).rev() {
            let mut rhs = system[row][n];
            for col in row + 1..n {
                rhs -= system[row][col] * pi[col];
            }
            pi[row] = rhs / system[row][row];
        }
        if pi.iter().any(|p| p.is_nan() || *p < -SUM_TOLERANCE) {
            return Err(Error::NoStationaryDistribution);
        }
        let mut total = KahanSum::new();
        for p in &mut pi {
            *p = p.abs();
            total.add(*p);
        }
        if total.value() <= 0.0 {
            return Err(Error::NoStationaryDistribution);
        }
        let scale = 1.0 / total.value();
        for p in &mut pi {
            *p *= scale;
        }
        Ok(pi)
    }

    /// Finds the index of a state label.
    pub fn find(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// The label of state `i`.
    pub fn label(&self, i: usize) -> Result<&str, Error> {
        self.labels
            .get(i)
            .map(String::as_str)
            .ok_or(Error::StateOutOfRange(i))
    }
}
