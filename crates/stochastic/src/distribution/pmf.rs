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

//! Discrete probability mass functions.

use super::{Error, KahanSum, SUM_TOLERANCE};

/// A discrete PMF over indices `0..len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pmf(pub Vec<f64>);

impl Pmf {
    /// Validates that every entry is a probability and that the masses sum
    /// to one within tolerance.
    pub fn check(&self) -> Result<(), Error> {
        let mut sum = KahanSum::new();
        for &p in &self.0 {
            if p.is_nan() || !(0.0..=1.0).contains(&p) {
                return Err(Error::OutOfRange(p));
            }
            sum.add(p);
        }
        if (sum.value() - 1.0).abs() > SUM_TOLERANCE {
            return Err(Error::BadSum(sum.value()));
        }
        Ok(())
    }

    /// Number of indices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the PMF has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the smallest index whose cumulative mass reaches `u`.
    pub fn quantile(&self, u: f64) -> usize {
        quantile_slice(&self.0, u)
    }

    /// Drops the head probability and renormalises the remainder.
    pub fn shrink(&self) -> Result<Pmf, Error> {
        let head = *self.0.first().unwrap_or(&0.0);
        if (1.0 - head).abs() < SUM_TOLERANCE {
            return Err(Error::DegenerateShrink(head));
        }
        let scale = 1.0 / (1.0 - head);
        let shrunk = Pmf(self.0[1..].iter().map(|p| p * scale).collect());
        shrunk.check()?;
        Ok(shrunk)
    }
}

/// Quantile of an unnormalised probability row: first index whose Kahan
/// cumulative reaches `u`, 0 when all masses vanish, and the last strictly
/// positive index when floating-point drift leaves `u` unreached.
pub(crate) fn quantile_slice(probabilities: &[f64], u: f64) -> usize {
    let mut sum = KahanSum::new();
    let mut last_positive = None;
    for (i, &p) in probabilities.iter().enumerate() {
        if p > 0.0 {
            last_positive = Some(i);
        }
        sum.add(p);
        if sum.value() >= u {
            return i;
        }
    }
    last_positive.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::Pmf;

    #[test]
    fn check_accepts_unit_mass() {
        Pmf(vec![0.25, 0.25, 0.5]).check().unwrap();
        Pmf(vec![1.0]).check().unwrap();
    }

    #[test]
    fn check_rejects_bad_masses() {
        assert!(Pmf(vec![0.5, 0.6]).check().is_err());
        assert!(Pmf(vec![-0.1, 1.1]).check().is_err());
        assert!(Pmf(vec![f64::NAN, 1.0]).check().is_err());
    }

    #[test]
    fn quantile_picks_first_reaching_index() {
        let f = Pmf(vec![0.2, 0.3, 0.5]);
        assert_eq!(f.quantile(0.0), 0);
        assert_eq!(f.quantile(0.2), 0);
        assert_eq!(f.quantile(0.21), 1);
        assert_eq!(f.quantile(0.5), 1);
        assert_eq!(f.quantile(0.51), 2);
        assert_eq!(f.quantile(1.0), 2);
    }

    #[test]
    fn quantile_of_zero_masses_is_zero() {
        assert_eq!(Pmf(vec![0.0, 0.0, 0.0]).quantile(0.5), 0);
    }

    #[test]
    fn quantile_drift_falls_back_to_last_positive() {
        // u beyond the accumulated total lands on the last positive index
        let f = Pmf(vec![0.5, 0.5, 0.0]);
        assert_eq!(f.quantile(1.5), 1);
    }

    #[test]
    fn shrink_renormalises_tail() {
        let f = Pmf(vec![0.5, 0.25, 0.25]);
        let shrunk = f.shrink().unwrap();
        assert_eq!(shrunk.len(), 2);
        shrunk.check().unwrap();
        assert!((shrunk.0[0] - 0.5).abs() < 1e-12);
        assert!((shrunk.0[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn shrink_rejects_degenerate_head() {
        assert!(Pmf(vec![1.0, 0.0]).shrink().is_err());
    }
}
