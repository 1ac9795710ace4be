//! Least-squares polynomial fitting used for tabulated buckling curves

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};

/// A polynomial fitted over a bounded abscissa range.
///
/// The abscissa is normalised to [-1, 1] before evaluation so that high degree fits over
/// large ranges (slenderness 20..250) stay well conditioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    /// Coefficients in ascending powers of the normalised abscissa
    pub coefficients: Vec<f64>,
    center: f64,
    half_width: f64,
}

impl Polynomial {
    /// Fit a polynomial of the given degree through `points` by least squares
    pub fn fit(points: &[(f64, f64)], degree: usize) -> FormResult<Self> {
        if points.len() <= degree {
            return Err(FormError::InvalidInput(format!(
                "polynomial of degree {degree} needs more than {} points",
                points.len()
            )));
        }

        let (min, max) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| {
                (lo.min(x), hi.max(x))
            });
        let center = 0.5 * (min + max);
        let half_width = (0.5 * (max - min)).max(f64::EPSILON);

        let vandermonde = DMatrix::from_fn(points.len(), degree + 1, |row, power| {
            ((points[row].0 - center) / half_width).powi(power as i32)
        });
        let targets = DVector::from_iterator(points.len(), points.iter().map(|&(_, y)| y));

        let coefficients = vandermonde
            .svd(true, true)
            .solve(&targets, 1e-12)
            .map_err(|e| FormError::InvalidInput(format!("polynomial fit failed: {e}")))?;

        Ok(Self {
            coefficients: coefficients.iter().copied().collect(),
            center,
            half_width,
        })
    }

    /// Evaluate with Horner's scheme
    pub fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.half_width;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * t + c)
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }
}
