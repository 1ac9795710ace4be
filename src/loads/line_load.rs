//! Uniform line loads on members

use serde::{Deserialize, Serialize};

use crate::math::{Mat3, Vec3};

/// Axes a line load is expressed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadAxes {
    #[default]
    Global,
    /// Member axes: x along the member, y horizontal, z completing the triad
    Local,
}

/// A uniform line load on the member of a mesh edge (kN/m)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineLoad {
    pub edge: usize,
    #[serde(default)]
    pub wx: f64,
    #[serde(default)]
    pub wy: f64,
    #[serde(default)]
    pub wz: f64,
    #[serde(default)]
    pub axes: LoadAxes,
}

impl LineLoad {
    pub fn global(edge: usize, wx: f64, wy: f64, wz: f64) -> Self {
        Self {
            edge,
            wx,
            wy,
            wz,
            axes: LoadAxes::Global,
        }
    }

    pub fn local(edge: usize, wx: f64, wy: f64, wz: f64) -> Self {
        Self {
            axes: LoadAxes::Local,
            ..Self::global(edge, wx, wy, wz)
        }
    }
}

/// Uniform load on a prepared member (kN/cm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemberLoad {
    pub w: [f64; 3],
    pub axes: LoadAxes,
}

impl MemberLoad {
    pub fn global(w: [f64; 3]) -> Self {
        Self {
            w,
            axes: LoadAxes::Global,
        }
    }

    /// Downward self-weight for a weight per length (kN/cm)
    pub fn self_weight(weight_per_length: f64) -> Self {
        Self::global([0.0, 0.0, -weight_per_length])
    }

    /// Load intensity in member axes
    pub fn local_vector(&self, rotation: &Mat3) -> Vec3 {
        let w = Vec3::from(self.w);
        match self.axes {
            LoadAxes::Global => rotation * w,
            LoadAxes::Local => w,
        }
    }

    /// Load intensity in global axes
    pub fn global_vector(&self, rotation: &Mat3) -> Vec3 {
        let w = Vec3::from(self.w);
        match self.axes {
            LoadAxes::Global => w,
            LoadAxes::Local => rotation.transpose() * w,
        }
    }
}
