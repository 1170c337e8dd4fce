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

//! Weibull distribution truncated on [0,1].

use super::{Ecdf, Error};
use rand::Rng;

/// Weibull distribution with rate `lambda` and shape `k`, truncated on
/// [0,1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedWeibull {
    /// Rate parameter (inverse scale).
    pub lambda: f64,
    /// Shape parameter.
    pub k: f64,
}

impl TruncatedWeibull {
    /// Creates the distribution.
    pub fn new(lambda: f64, k: f64) -> Self {
        TruncatedWeibull { lambda, k }
    }

    /// Mass of the untruncated distribution on [0,1].
    fn truncation(&self) -> f64 {
        1.0 - (-(self.lambda.powf(self.k))).exp()
    }

    /// CDF `(1 - exp(-(λx)^k)) / (1 - exp(-λ^k))`.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        (1.0 - (-((self.lambda * x).powf(self.k))).exp()) / self.truncation()
    }

    /// Quantile `(-ln(1 - p·(1 - exp(-λ^k))))^{1/k} / λ`.
    pub fn quantile(&self, p: f64) -> f64 {
        (-(1.0 - p * self.truncation()).ln()).powf(1.0 / self.k) / self.lambda
    }

    /// Draws an index in `[0, n-1]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: i64) -> i64 {
        let u: f64 = rng.gen();
        let v = (n as f64 * self.quantile(u)) as i64;
        v.max(0).min(n - 1)
    }
}

/// Fits a truncated Weibull to empirical CDF points from the quartiles of
/// the curve: `ln(-ln(1-p)) = k·(ln λ + ln x)` evaluated at p = 1/4 and
/// p = 3/4.
pub fn approximate_weibull(points: &[(f64, f64)]) -> Result<TruncatedWeibull, Error> {
    if points.len() < 2 {
        return Err(Error::NotEnoughData);
    }
    let curve = Ecdf(points.to_vec());
    let (p1, p2) = (0.25, 0.75);
    let (x1, x2) = (curve.quantile(p1), curve.quantile(p2));
    if x1 <= 0.0 || x2 <= 0.0 || x1 == x2 {
        return Err(Error::NotEnoughData);
    }
    let a1 = (-(1.0 - p1).ln()).ln();
    let a2 = (-(1.0 - p2).ln()).ln();
    let k = (a2 - a1) / (x2.ln() - x1.ln());
    if !k.is_finite() || k <= 0.0 {
        return Err(Error::NotEnoughData);
    }
    let lambda = (a1 / k - x1.ln()).exp();
    if !lambda.is_finite() || lambda <= 0.0 {
        return Err(Error::NotEnoughData);
    }
    Ok(TruncatedWeibull::new(lambda, k))
}

#[cfg(test)]
mod tests {
    use super::{approximate_weibull, TruncatedWeibull};
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn cdf_endpoints() {
        let d = TruncatedWeibull::new(2.0, 1.5);
        assert_eq!(d.cdf(0.0), 0.0);
        assert_eq!(d.cdf(1.0), 1.0);
    }

    #[test]
    fn quantile_inverts_cdf() {
        let d = TruncatedWeibull::new(2.0, 1.5);
        for i in 1..100 {
            let x = i as f64 / 100.0;
            let p = d.cdf(x);
            assert!((d.quantile(p) - x).abs() < 1e-9, "x={x}");
        }
    }

    #[test]
    fn sample_clamps_to_range() {
        let d = TruncatedWeibull::new(4.0, 0.8);
        let mut rng = XorShiftRng::seed_from_u64(9);
        for _ in 0..10_000 {
            let v = d.sample(&mut rng, 20);
            assert!((0..20).contains(&v));
        }
    }

    #[test]
    fn approximate_weibull_recovers_shape() {
        // large λ^k keeps truncation mass near one, where the quartile fit
        // is exact
        let d = TruncatedWeibull::new(6.0, 1.8);
        let points: Vec<(f64, f64)> =
            (0..=1_000).map(|i| i as f64 / 1_000.0).map(|x| (x, d.cdf(x))).collect();
        let fit = approximate_weibull(&points).unwrap();
        assert!((fit.k - d.k).abs() < 0.05, "k={}", fit.k);
        assert!((fit.lambda - d.lambda).abs() < 0.2, "lambda={}", fit.lambda);
    }

    #[test]
    fn approximate_weibull_needs_points() {
        assert!(approximate_weibull(&[(0.0, 0.0)]).is_err());
    }
}
