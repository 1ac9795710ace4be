//! Circular hollow sections for members

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};

/// Smallest inner diameter (cm) a tube may shrink to during resizing
pub const MIN_INNER_DIAMETER: f64 = 0.1;

/// Thin-walled circular tube, diameters in cm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TubeSection {
    /// Outer diameter
    pub outer: f64,
    /// Inner diameter
    pub inner: f64,
}

/// Derived properties handed to the stiffness solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionProperties {
    pub a: f64,
    pub iy: f64,
    pub iz: f64,
    pub j: f64,
}

impl TubeSection {
    pub fn new(outer: f64, inner: f64) -> Self {
        Self { outer, inner }
    }

    /// Reject sections the formulas cannot handle
    pub fn validate(&self) -> FormResult<()> {
        if !(self.inner > 0.0 && self.inner < self.outer && self.outer.is_finite()) {
            return Err(FormError::InvalidInput(format!(
                "tube needs 0 < inner < outer, got outer {} inner {}",
                self.outer, self.inner
            )));
        }
        Ok(())
    }

    /// Cross-sectional area
    pub fn area(&self) -> f64 {
        PI * ((self.outer / 2.0).powi(2) - (self.inner / 2.0).powi(2))
    }

    /// Second moment of area, equal about both axes
    pub fn inertia(&self) -> f64 {
        PI * (self.outer.powi(4) - self.inner.powi(4)) / 64.0
    }

    /// Torsional constant
    pub fn torsion(&self) -> f64 {
        PI * (self.outer.powi(4) - self.inner.powi(4)) / 32.0
    }

    pub fn radius_of_gyration(&self) -> f64 {
        (self.inertia() / self.area()).sqrt()
    }

    /// Elastic section modulus for bending
    pub fn wy(&self) -> f64 {
        self.inertia() / (self.outer / 2.0)
    }

    /// Section modulus for torsion
    pub fn wj(&self) -> f64 {
        self.torsion() / (self.outer / 2.0)
    }

    /// Weight per unit length (kN/cm) for a specific weight in kN/cm³
    pub fn weight_per_length(&self, density: f64) -> f64 {
        self.area() * density
    }

    pub fn properties(&self) -> SectionProperties {
        let i = self.inertia();
        SectionProperties {
            a: self.area(),
            iy: i,
            iz: i,
            j: self.torsion(),
        }
    }

    /// Scale both diameters, then apply the inner-diameter floor.
    ///
    /// When the floor triggers the outer diameter keeps the previous outer/inner ratio.
    /// Returns the new section and whether the floor was applied.
    pub fn scaled(&self, factor: f64) -> (Self, bool) {
        let ratio = self.outer / self.inner;
        let inner = self.inner * factor;
        if inner.is_finite() && inner >= MIN_INNER_DIAMETER {
            return (Self::new(self.outer * factor, inner), false);
        }
        (
            Self::new(MIN_INNER_DIAMETER * ratio, MIN_INNER_DIAMETER),
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn annulus_properties() {
        let s = TubeSection::new(6.0, 5.0);
        assert_relative_eq!(s.area(), PI * (9.0 - 6.25), epsilon = 1e-12);
        assert_relative_eq!(s.inertia(), PI * (1296.0 - 625.0) / 64.0, epsilon = 1e-12);
        assert_relative_eq!(s.torsion(), 2.0 * s.inertia(), epsilon = 1e-12);
        assert_relative_eq!(s.wy(), s.inertia() / 3.0, epsilon = 1e-12);
        assert_relative_eq!(s.wj(), s.torsion() / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn invalid_tubes_are_rejected() {
        assert!(TubeSection::new(6.0, 5.0).validate().is_ok());
        assert!(TubeSection::new(5.0, 6.0).validate().is_err());
        assert!(TubeSection::new(6.0, 0.0).validate().is_err());
    }

    #[test]
    fn scaling_keeps_ratio() {
        let (s, clamped) = TubeSection::new(6.0, 5.0).scaled(1.2);
        assert!(!clamped);
        assert_relative_eq!(s.outer, 7.2, epsilon = 1e-12);
        assert_relative_eq!(s.inner, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn floor_resets_inner_and_rescales_outer() {
        let (s, clamped) = TubeSection::new(0.3, 0.2).scaled(0.1);
        assert!(clamped);
        assert_eq!(s.inner, MIN_INNER_DIAMETER);
        assert_relative_eq!(s.outer / s.inner, 1.5, epsilon = 1e-12);
    }
}
