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

//! Exponential distribution truncated on [0,1].

use super::Error;
use rand::Rng;

const NEWTON_TOLERANCE: f64 = 1e-9;
const NEWTON_MAX_STEPS: usize = 10_000;

/// Exponential distribution with rate `lambda`, truncated on [0,1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedExponential {
    /// Rate parameter.
    pub lambda: f64,
}

impl TruncatedExponential {
    /// Creates the distribution.
    pub fn new(lambda: f64) -> Self {
        TruncatedExponential { lambda }
    }

    /// Closed-form CDF `(exp(-λx) - 1) / (exp(-λ) - 1)`.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        ((-self.lambda * x).exp() - 1.0) / ((-self.lambda).exp() - 1.0)
    }

    /// Closed-form quantile `ln(p·exp(-λ) - p + 1) / (-λ)`.
    pub fn quantile(&self, p: f64) -> f64 {
        (p * (-self.lambda).exp() - p + 1.0).ln() / -self.lambda
    }

    /// Draws an index in `[0, n-1]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: i64) -> i64 {
        let u: f64 = rng.gen();
        let v = (n as f64 * self.quantile(u)) as i64;
        v.max(0).min(n - 1)
    }
}

/// Estimates the rate of a truncated exponential from empirical CDF points
/// by Newton iteration on the MLE equation `1/λ − 1/(exp(λ)-1) = mean`.
///
/// Starts at λ = 1 and falls back to the symbolic large-λ limit whenever an
/// intermediate term overflows to NaN or infinity.
pub fn approximate_lambda(points: &[(f64, f64)]) -> Result<f64, Error> {
    if points.len() < 2 {
        return Err(Error::NotEnoughData);
    }
    let mean = curve_mean(points);
    let mut lambda: f64 = 1.0;
    for _ in 0..NEWTON_MAX_STEPS {
        let (g, dg) = mle_terms(lambda, mean);
        let step = g / dg;
        if !step.is_finite() {
            break;
        }
        lambda -= step;
        if lambda == 0.0 {
            lambda = NEWTON_TOLERANCE;
        }
        if step.abs() < NEWTON_TOLERANCE {
            break;
        }
    }
    Ok(lambda)
}

/// MLE residual and its derivative at `lambda`, with symbolic limits for the
/// regime where `exp(λ)` is no longer representable.
fn mle_terms(lambda: f64, mean: f64) -> (f64, f64) {
    let e = lambda.exp();
    if e.is_finite() && e > 1.0 {
        let g = 1.0 / lambda - 1.0 / (e - 1.0) - mean;
        let dg = -1.0 / (lambda * lambda) + e / ((e - 1.0) * (e - 1.0));
        if g.is_nan() || dg.is_nan() {
            return (1.0 / lambda - mean, -1.0 / (lambda * lambda));
        }
        (g, dg)
    } else if e.is_infinite() {
        // 1/(exp(λ)-1) vanishes
        (1.0 / lambda - mean, -1.0 / (lambda * lambda))
    } else {
        // λ ≤ 0: exp(λ) ≤ 1, the 1/(e-1) pole dominates
        let g = 1.0 / lambda - 1.0 / (e - 1.0) - mean;
        let dg = -1.0 / (lambda * lambda) + e / ((e - 1.0) * (e - 1.0));
        (g, dg)
    }
}

/// Mean of the distribution described by a piecewise-linear CDF, by
/// trapezoidal integration of `x dF`.
fn curve_mean(points: &[(f64, f64)]) -> f64 {
    let mut mean = 0.0;
    for pair in points.windows(2) {
        let (x1, y1) = pair[0];
        let (x2, y2) = pair[1];
        mean += (x1 + x2) / 2.0 * (y2 - y1);
    }
    mean
}

#[cfg(test)]
mod tests {
    use super::{approximate_lambda, TruncatedExponential};
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn cdf_endpoints() {
        let d = TruncatedExponential::new(5.0);
        assert_eq!(d.cdf(0.0), 0.0);
        assert_eq!(d.cdf(1.0), 1.0);
        assert_eq!(d.cdf(-1.0), 0.0);
        assert_eq!(d.cdf(2.0), 1.0);
    }

    #[test]
    fn quantile_inverts_cdf() {
        let d = TruncatedExponential::new(3.5);
        for i in 1..100 {
            let x = i as f64 / 100.0;
            let p = d.cdf(x);
            assert!((d.quantile(p) - x).abs() < 1e-9, "x={x}");
        }
    }

    #[test]
    fn sample_clamps_to_range() {
        let d = TruncatedExponential::new(10.0);
        let mut rng = XorShiftRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let v = d.sample(&mut rng, 50);
            assert!((0..50).contains(&v));
        }
    }

    #[test]
    fn approximate_lambda_recovers_rate() {
        for &lambda in &[0.5, 2.0, 7.5] {
            let d = TruncatedExponential::new(lambda);
            let points: Vec<(f64, f64)> =
                (0..=1_000).map(|i| i as f64 / 1_000.0).map(|x| (x, d.cdf(x))).collect();
            let estimate = approximate_lambda(&points).unwrap();
            assert!(
                (estimate - lambda).abs() < 1e-3,
                "lambda={lambda} estimate={estimate}"
            );
        }
    }

    #[test]
    fn approximate_lambda_needs_points() {
        assert!(approximate_lambda(&[(0.0, 0.0)]).is_err());
    }
}
