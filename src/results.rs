//! Raw solver output and interpreted frame results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::quad::ShellResultants;

/// Number of evenly spaced sampling stations along a member (x = L/10 · i)
pub const STATIONS: usize = 11;

/// Internal forces at one station in member axes (kN, kN·cm).
///
/// Axial force is positive in tension and negative in compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StationForces {
    /// Distance from the i-node (cm)
    pub x: f64,
    pub axial: f64,
    pub shear_y: f64,
    pub shear_z: f64,
    pub torque: f64,
    pub moment_y: f64,
    pub moment_z: f64,
}

/// Sampled output for one member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRaw {
    /// Source edge id
    pub edge: usize,
    /// Length in model units
    pub length: f64,
    pub stations: Vec<StationForces>,
    /// Global displacement at each station (cm)
    pub deflection: Vec<[f64; 3]>,
}

/// Centre resultants of one quad
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadRaw {
    /// Source face id
    pub face: usize,
    pub resultants: ShellResultants,
}

/// Everything a solver returns for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAnalysis {
    /// Global nodal displacements [DX, DY, DZ, RX, RY, RZ] by node index
    pub displacements: Vec<[f64; 6]>,
    /// Members by edge id
    pub members: BTreeMap<usize, MemberRaw>,
    /// Quads by face id
    pub quads: BTreeMap<usize, QuadRaw>,
    /// P-Delta iterations used (0 for a single solve)
    pub iterations: usize,
}

impl RawAnalysis {
    /// Largest translation of any node (cm)
    pub fn max_translation(&self) -> f64 {
        self.displacements
            .iter()
            .map(|d| (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt())
            .fold(0.0, f64::max)
    }
}

/// Derived quantities at one member station
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StationResult {
    pub forces: StationForces,
    /// Resultant bending moment sqrt(My² + Mz²)
    pub moment: f64,
    /// Longitudinal stress
    pub sigma: f64,
    /// Flexural shear stress
    pub tau_shear: f64,
    /// Torsional shear stress
    pub tau_torsion: f64,
    /// Flexural plus torsional shear stress
    pub sum_tau: f64,
    /// Combined (von Mises) stress
    pub sigma_v: f64,
    /// Deflected station position in mesh units
    pub deflected: [f64; 3],
}

/// Signed extrema over the stations of a member
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberExtrema {
    pub axial: f64,
    pub shear_y: f64,
    pub shear_z: f64,
    pub torque: f64,
    pub moment_y: f64,
    pub moment_z: f64,
    pub moment: f64,
    pub sigma: f64,
    pub tau_shear: f64,
    pub tau_torsion: f64,
    pub sum_tau: f64,
    pub sigma_v: f64,
    pub strain_energy: f64,
}

/// Interpreted result of one member in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResult {
    pub edge: usize,
    pub length: f64,
    pub stations: Vec<StationResult>,
    pub extrema: MemberExtrema,
    /// Strain energy of the ten segments between stations
    pub strain_energy: Vec<f64>,
    /// Slenderness, `None` unless the member is compressed
    pub slenderness: Option<f64>,
    /// Longitudinal allowable after buckling reduction
    pub allowable: f64,
    pub overstress: bool,
    pub utilization: f64,
}

/// Interpreted result of one quad in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadResult {
    pub face: usize,
    pub thickness: f64,
    pub resultants: ShellResultants,
    /// Normal stresses, governing fibre (top or bottom)
    pub sigma_x: f64,
    pub sigma_y: f64,
    pub tau_xy: f64,
    /// Transverse shear stress
    pub tau_shear: f64,
    pub sigma_v: f64,
    pub overstress: bool,
    pub utilization: f64,
}

/// Interpreted structural result of one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub members: BTreeMap<usize, MemberResult>,
    pub quads: BTreeMap<usize, QuadResult>,
    /// Largest nodal translation in mesh units
    pub max_deflection: f64,
}

impl FrameAnalysis {
    pub fn overstressed(&self) -> bool {
        self.members.values().any(|m| m.overstress) || self.quads.values().any(|q| q.overstress)
    }

    /// Mean of |longitudinal stress extremum| over members, 0 without members
    pub fn average_stress(&self) -> f64 {
        mean(self.members.values().map(|m| m.extrema.sigma.abs()))
    }

    /// Mean of the strain energy extremum over members, 0 without members
    pub fn average_strain_energy(&self) -> f64 {
        mean(self.members.values().map(|m| m.extrema.strain_energy))
    }

    pub fn max_utilization(&self) -> f64 {
        self.members
            .values()
            .map(|m| m.utilization)
            .chain(self.quads.values().map(|q| q.utilization))
            .fold(0.0, f64::max)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
