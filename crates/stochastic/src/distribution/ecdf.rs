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

//! Piecewise-linear empirical CDFs.

use super::{Error, KahanSum, SUM_TOLERANCE};
use rand::Rng;

/// Maximum number of points retained when compressing a raw PDF into an
/// empirical CDF.
pub const NUM_ECDF_POINTS: usize = 300;

/// A piecewise-linear empirical CDF over [0,1].
///
/// The point list runs from (0,0) to (1,1) and every adjacent pair advances
/// strictly in at least one coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ecdf(pub Vec<(f64, f64)>);

impl Ecdf {
    /// Validates the invariants of the curve.
    pub fn check(&self) -> Result<(), Error> {
        let points = &self.0;
        if points.len() < 2 {
            return Err(Error::TooFewPoints(points.len()));
        }
        for &(x, y) in points {
            if !(0.0..=1.0).contains(&x) || x.is_nan() {
                return Err(Error::OutOfRange(x));
            }
            if !(0.0..=1.0).contains(&y) || y.is_nan() {
                return Err(Error::OutOfRange(y));
            }
        }
        let (x0, y0) = points[0];
        if x0 != 0.0 || y0 != 0.0 {
            return Err(Error::BadLowerEndpoint(x0, y0));
        }
        let (xn, yn) = points[points.len() - 1];
        if xn != 1.0 || yn != 1.0 {
            return Err(Error::BadUpperEndpoint(xn, yn));
        }
        for (i, pair) in points.windows(2).enumerate() {
            let (x1, y1) = pair[0];
            let (x2, y2) = pair[1];
            if x2 <= x1 && y2 <= y1 {
                return Err(Error::NotMonotone { index: i });
            }
        }
        Ok(())
    }

    /// Evaluates the CDF at `x`.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= 0.0 {
            return 0.0;
        }
        if x >= 1.0 {
            return 1.0;
        }
        let points = &self.0;
        for pair in points.windows(2) {
            let (x1, y1) = pair[0];
            let (x2, y2) = pair[1];
            if x2 >= x {
                if x2 == x1 {
                    return y2;
                }
                return y1 + (y2 - y1) * (x - x1) / (x2 - x1);
            }
        }
        1.0
    }

    /// Evaluates the quantile function at `y`; the symmetric inverse of
    /// [`Ecdf::cdf`].
    pub fn quantile(&self, y: f64) -> f64 {
        if y <= 0.0 {
            return 0.0;
        }
        if y >= 1.0 {
            return 1.0;
        }
        let points = &self.0;
        for pair in points.windows(2) {
            let (x1, y1) = pair[0];
            let (x2, y2) = pair[1];
            if y2 >= y {
                if y2 == y1 {
                    return x1;
                }
                return x1 + (x2 - x1) * (y - y1) / (y2 - y1);
            }
        }
        1.0
    }

    /// Draws `⌊n·quantile(u)⌋` for a uniform `u` in [0,1).
    ///
    /// The result lies in `[0, n]`; callers clamp when a half-open range is
    /// needed.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, n: i64) -> i64 {
        let u: f64 = rng.gen();
        (n as f64 * self.quantile(u)) as i64
    }

    /// Builds a compressed ECDF from raw PDF points `(x, probability)`.
    ///
    /// The running cumulative sum is computed with Kahan compensation, the
    /// endpoints are snapped within the summation tolerance, and the curve
    /// is thinned to [`NUM_ECDF_POINTS`] by Visvalingam-Whyatt retention of
    /// the most significant vertices.
    pub fn from_pdf(pdf: &[(f64, f64)]) -> Result<Ecdf, Error> {
        let mut points = Vec::with_capacity(pdf.len() + 1);
        points.push((0.0, 0.0));
        let mut sum = KahanSum::new();
        for &(x, p) in pdf {
            sum.add(p);
            points.push((x, sum.value()));
        }
        if let Some(last) = points.last_mut() {
            if (last.0 - 1.0).abs() <= SUM_TOLERANCE {
                last.0 = 1.0;
            }
            if (last.1 - 1.0).abs() <= SUM_TOLERANCE {
                last.1 = 1.0;
            }
        }
        simplify(&mut points, NUM_ECDF_POINTS);
        let ecdf = Ecdf(points);
        ecdf.check().map_err(|_| Error::CompressionCollapse)?;
        Ok(ecdf)
    }
}

/// Visvalingam-Whyatt line simplification: repeatedly drops the interior
/// vertex spanning the smallest triangle until `max_points` remain.
fn simplify(points: &mut Vec<(f64, f64)>, max_points: usize) {
    while points.len() > max_points {
        let mut min_area = f64::INFINITY;
        let mut min_idx = 1;
        for i in 1..points.len() - 1 {
            let area = triangle_area(points[i - 1], points[i], points[i + 1]);
            if area < min_area {
                min_area = area;
                min_idx = i;
            }
        }
        points.remove(min_idx);
    }
}

fn triangle_area(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    ((b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)).abs() / 2.0
}
