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

//! The captured statistical profile of StateDB operation traffic.

use crate::{
    arguments::QUEUE_LEN,
    distribution::{self, Ecdf, Pmf},
    markov::{self, MarkovChain},
    operations,
};
use std::fmt;

/// Profile validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The transition matrix or its labels are invalid.
    Markov(markov::Error),
    /// An embedded distribution is invalid.
    Distribution(distribution::Error),
    /// An operation label does not decode.
    Label(operations::Error),
    /// A queue distribution has the wrong length.
    QueueLength {
        /// The argument domain.
        domain: &'static str,
        /// Its distribution length.
        len: usize,
    },
    /// A scalar maximum is negative.
    NegativeMax {
        /// The scalar domain.
        domain: &'static str,
        /// The recorded maximum.
        max: i64,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Error::*;
        match *self {
            Markov(ref e) => write!(f, "invalid stochastic matrix: {e}"),
            Distribution(ref e) => write!(f, "invalid distribution: {e}"),
            Label(ref e) => write!(f, "invalid operation label: {e}"),
            QueueLength { domain, len } => {
                write!(f, "{domain} queue distribution has length {len}, expected {QUEUE_LEN}")
            }
            NegativeMax { domain, max } => {
                write!(f, "{domain} maximum {max} is negative")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<markov::Error> for Error {
    fn from(e: markov::Error) -> Self {
        Error::Markov(e)
    }
}

impl From<distribution::Error> for Error {
    fn from(e: distribution::Error) -> Self {
        Error::Distribution(e)
    }
}

impl From<operations::Error> for Error {
    fn from(e: operations::Error) -> Self {
        Error::Label(e)
    }
}

/// Reuse statistics of one argument domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentStats {
    /// Population statistics.
    pub counting: Counting,
    /// Recency statistics.
    pub queuing: Queuing,
}

/// Population cardinality and the empirical CDF over argument indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counting {
    /// Captured population cardinality.
    pub n: i64,
    /// Empirical CDF over argument indices.
    pub ecdf: Ecdf,
}

/// Distribution over recency-queue positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Queuing {
    /// PMF over queue positions, head standing for "no recent match".
    pub distribution: Pmf,
}

/// Range and shape of one scalar payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarStats {
    /// Largest captured value.
    pub max: i64,
    /// Empirical CDF over the normalised value range.
    pub ecdf: Ecdf,
}

/// The captured statistical profile.
///
/// The on-disk envelope (versioning, compression) belongs to the driver;
/// this is the semantic payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Encoded opcode labels, one per Markov state.
    pub operations: Vec<String>,
    /// Row-stochastic transition matrix over those labels.
    pub stochastic_matrix: Vec<Vec<f64>>,
    /// Contract address reuse statistics.
    pub contracts: ArgumentStats,
    /// Storage key reuse statistics.
    pub keys: ArgumentStats,
    /// Storage value reuse statistics.
    pub values: ArgumentStats,
    /// Empirical CDF over snapshot-stack depths.
    pub snapshot_ecdf: Ecdf,
    /// Balance payload statistics.
    pub balance: ScalarStats,
    /// Nonce payload statistics.
    pub nonce: ScalarStats,
    /// Code size payload statistics.
    pub code_size: ScalarStats,
}

impl Profile {
    /// Validates the profile before a run: matrix shape and stochasticity,
    /// label decodability, distribution well-formedness.
    pub fn check(&self) -> Result<(), Error> {
        self.markov_chain()?;
        for label in &self.operations {
            operations::decode_label(label)?;
        }
        for (domain, stats) in [
            ("contracts", &self.contracts),
            ("keys", &self.keys),
            ("values", &self.values),
        ] {
            stats.counting.ecdf.check()?;
            stats.queuing.distribution.check()?;
            if stats.queuing.distribution.len() != QUEUE_LEN {
                return Err(Error::QueueLength {
                    domain,
                    len: stats.queuing.distribution.len(),
                });
            }
        }
        self.snapshot_ecdf.check()?;
        for (domain, scalar) in [
            ("balance", &self.balance),
            ("nonce", &self.nonce),
            ("codeSize", &self.code_size),
        ] {
            scalar.ecdf.check()?;
            if scalar.max < 0 {
                return Err(Error::NegativeMax {
                    domain,
                    max: scalar.max,
                });
            }
        }
        Ok(())
    }

    /// Builds the Markov chain over the profile's operation labels.
    pub fn markov_chain(&self) -> Result<MarkovChain, markov::Error> {
        MarkovChain::new(self.stochastic_matrix.clone(), self.operations.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::Profile;
    use crate::arguments::QUEUE_LEN;

    fn sample_json() -> String {
        let uniform_queue: Vec<String> = (0..QUEUE_LEN)
            .map(|_| format!("{}", 1.0 / QUEUE_LEN as f64))
            .collect();
        let queue = uniform_queue.join(",");
        format!(
            r#"{{
                "operations": ["BS", "EB"],
                "stochasticMatrix": [[0.0, 1.0], [1.0, 0.0]],
                "contracts": {{
                    "counting": {{ "n": 512, "ecdf": [[0.0,0.0],[1.0,1.0]] }},
                    "queuing": {{ "distribution": [{queue}] }}
                }},
                "keys": {{
                    "counting": {{ "n": 512, "ecdf": [[0.0,0.0],[1.0,1.0]] }},
                    "queuing": {{ "distribution": [{queue}] }}
                }},
                "values": {{
                    "counting": {{ "n": 512, "ecdf": [[0.0,0.0],[1.0,1.0]] }},
                    "queuing": {{ "distribution": [{queue}] }}
                }},
                "snapshotEcdf": [[0.0,0.0],[1.0,1.0]],
                "balance": {{ "max": 1000000, "ecdf": [[0.0,0.0],[1.0,1.0]] }},
                "nonce": {{ "max": 1000, "ecdf": [[0.0,0.0],[1.0,1.0]] }},
                "codeSize": {{ "max": 24576, "ecdf": [[0.0,0.0],[1.0,1.0]] }}
            }}"#
        )
    }

    #[test]
    fn profile_round_trips_through_json() {
        let profile: Profile = serde_json::from_str(&sample_json()).unwrap();
        profile.check().unwrap();
        let encoded = serde_json::to_string(&profile).unwrap();
        let decoded: Profile = serde_json::from_str(&encoded).unwrap();
        assert_eq!(profile, decoded);
    }

    #[test]
    fn check_rejects_bad_matrix() {
        let mut profile: Profile = serde_json::from_str(&sample_json()).unwrap();
        profile.stochastic_matrix[0][1] = 0.5;
        assert!(profile.check().is_err());
    }

    #[test]
    fn check_rejects_bad_labels() {
        let mut profile: Profile = serde_json::from_str(&sample_json()).unwrap();
        profile.operations[0] = "??".to_owned();
        profile.stochastic_matrix = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        assert!(profile.check().is_err());
    }

    #[test]
    fn check_rejects_short_queue_distribution() {
        let mut profile: Profile = serde_json::from_str(&sample_json()).unwrap();
        profile.keys.queuing.distribution.0 = vec![0.5, 0.5];
        assert!(profile.check().is_err());
    }
}
