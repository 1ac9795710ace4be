//! Material properties and buckling curves
//!
//! Units: kN and cm. Stiffness and allowable stresses in kN/cm², specific weight in kN/cm³.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::FormResult;
use crate::math::Polynomial;

/// Degree of the least-squares fit through a buckling table
pub const BUCKLING_FIT_DEGREE: usize = 6;
/// Up to this slenderness no buckling reduction applies
pub const STOCKY_LIMIT: f64 = 20.0;
/// Beyond this slenderness a compressed member always counts as overstressed
pub const SLENDER_LIMIT: f64 = 250.0;

/// Allowable stresses of a material in kN/cm²
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allowables {
    /// Longitudinal (normal) stress
    pub sigma: f64,
    /// Flexural shear stress
    pub shear: f64,
    /// Torsional shear stress
    pub torsion: f64,
    /// Combined (von Mises) stress
    pub combined: f64,
}

/// Tabulated allowable compressive stress over slenderness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucklingCurve {
    /// (slenderness, allowable stress) pairs for 20 <= λ <= 250
    pub table: Vec<(f64, f64)>,
    #[serde(skip)]
    fit: OnceLock<Polynomial>,
}

impl BucklingCurve {
    pub fn new(table: Vec<(f64, f64)>) -> Self {
        Self {
            table,
            fit: OnceLock::new(),
        }
    }

    /// Fitted polynomial, computed on first use
    pub fn polynomial(&self) -> FormResult<&Polynomial> {
        if let Some(poly) = self.fit.get() {
            return Ok(poly);
        }
        let poly = Polynomial::fit(&self.table, BUCKLING_FIT_DEGREE)?;
        Ok(self.fit.get_or_init(|| poly))
    }
}

impl PartialEq for BucklingCurve {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
    }
}

/// Material of members and quads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Modulus of elasticity
    pub e: f64,
    /// Shear modulus
    pub g: f64,
    /// Specific weight (kN/cm³)
    pub density: f64,
    pub allowables: Allowables,
    pub buckling: BucklingCurve,
}

impl Material {
    /// Poisson's ratio derived from E and G
    pub fn poisson(&self) -> f64 {
        (self.e / (2.0 * self.g) - 1.0).clamp(0.0, 0.49)
    }

    /// Allowable longitudinal stress reduced for buckling at slenderness `lambda`.
    ///
    /// Returns `None` when the member is too slender to carry compression at all.
    pub fn buckling_allowable(&self, lambda: f64) -> FormResult<Option<f64>> {
        if lambda <= STOCKY_LIMIT {
            return Ok(Some(self.allowables.sigma));
        }
        if lambda > SLENDER_LIMIT {
            return Ok(None);
        }
        let reduced = self.buckling.polynomial()?.eval(lambda);
        Ok(Some(reduced.clamp(f64::EPSILON, self.allowables.sigma)))
    }

    /// Structural steel S235
    pub fn steel_s235() -> Self {
        Self {
            name: "steel_S235".to_string(),
            e: 21000.0,
            g: 8100.0,
            density: 7.85e-5,
            allowables: Allowables {
                sigma: 16.5,
                shear: 9.5,
                torsion: 10.5,
                combined: 23.5,
            },
            buckling: BucklingCurve::new(tabulate(&S235_CURVE)),
        }
    }

    /// Structural steel S355
    pub fn steel_s355() -> Self {
        Self {
            name: "steel_S355".to_string(),
            e: 21000.0,
            g: 8100.0,
            density: 7.85e-5,
            allowables: Allowables {
                sigma: 24.75,
                shear: 14.25,
                torsion: 15.75,
                combined: 35.25,
            },
            buckling: BucklingCurve::new(tabulate(&S355_CURVE)),
        }
    }

    /// Aluminium alloy EN AW-6082 T6
    pub fn aluminium() -> Self {
        Self {
            name: "aluminium".to_string(),
            e: 7000.0,
            g: 2700.0,
            density: 2.7e-5,
            allowables: Allowables {
                sigma: 14.0,
                shear: 8.1,
                torsion: 8.9,
                combined: 20.0,
            },
            buckling: BucklingCurve::new(tabulate(&ALUMINIUM_CURVE)),
        }
    }

    /// Glued laminated timber GL24h
    pub fn glulam_gl24h() -> Self {
        Self {
            name: "glulam_GL24h".to_string(),
            e: 1150.0,
            g: 65.0,
            density: 4.2e-6,
            allowables: Allowables {
                sigma: 1.5,
                shear: 0.2,
                torsion: 0.2,
                combined: 1.5,
            },
            buckling: BucklingCurve::new(tabulate(&GL24H_CURVE)),
        }
    }

    /// Shared preset table keyed by name
    pub fn presets() -> &'static BTreeMap<String, Material> {
        static PRESETS: OnceLock<BTreeMap<String, Material>> = OnceLock::new();
        PRESETS.get_or_init(|| {
            [
                Self::steel_s235(),
                Self::steel_s355(),
                Self::aluminium(),
                Self::glulam_gl24h(),
            ]
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect()
        })
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<&'static Material> {
        Self::presets().get(name)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::steel_s235()
    }
}

fn tabulate(values: &[f64; 24]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (20.0 + 10.0 * i as f64, v))
        .collect()
}

// Allowable compressive stress at λ = 20, 30, ..., 250 (kN/cm²)
#[rustfmt::skip]
const S235_CURVE: [f64; 24] = [
    16.500, 16.099, 15.651, 15.122, 14.472, 13.657, 12.653, 11.492, 10.262, 9.072, 7.990, 7.042,
    6.227, 5.530, 4.934, 4.426, 3.987, 3.609, 3.281, 2.996, 2.745, 2.523, 2.328, 2.154,
];
#[rustfmt::skip]
const S355_CURVE: [f64; 24] = [
    24.750, 23.958, 23.007, 21.785, 20.175, 18.147, 15.876, 13.653, 11.678, 10.013, 8.636, 7.502,
    6.565, 5.788, 5.136, 4.586, 4.119, 3.718, 3.373, 3.073, 2.812, 2.581, 2.379, 2.198,
];
#[rustfmt::skip]
const ALUMINIUM_CURVE: [f64; 24] = [
    14.000, 13.203, 12.053, 10.443, 8.598, 6.922, 5.584, 4.559, 3.776, 3.171, 2.697, 2.321,
    2.017, 1.768, 1.562, 1.391, 1.245, 1.122, 1.016, 0.923, 0.844, 0.774, 0.712, 0.658,
];
#[rustfmt::skip]
const GL24H_CURVE: [f64; 24] = [
    1.500, 1.469, 1.424, 1.344, 1.197, 0.995, 0.805, 0.655, 0.538, 0.450, 0.381, 0.327,
    0.283, 0.248, 0.219, 0.194, 0.173, 0.156, 0.141, 0.128, 0.117, 0.107, 0.098, 0.091,
];
