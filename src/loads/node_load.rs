//! Loads applied directly to vertices / nodes

use serde::{Deserialize, Serialize};

/// A load on a mesh vertex in global axes (kN, kN·cm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexLoad {
    pub vertex: usize,
    #[serde(default)]
    pub fx: f64,
    #[serde(default)]
    pub fy: f64,
    #[serde(default)]
    pub fz: f64,
    #[serde(default)]
    pub mx: f64,
    #[serde(default)]
    pub my: f64,
    #[serde(default)]
    pub mz: f64,
}

impl VertexLoad {
    /// Create a force-only vertex load
    pub fn force(vertex: usize, fx: f64, fy: f64, fz: f64) -> Self {
        Self {
            vertex,
            fx,
            fy,
            fz,
            mx: 0.0,
            my: 0.0,
            mz: 0.0,
        }
    }

    /// Get the load as an array [FX, FY, FZ, MX, MY, MZ]
    pub fn as_array(&self) -> [f64; 6] {
        [self.fx, self.fy, self.fz, self.mx, self.my, self.mz]
    }
}

/// A load on a node of a prepared model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeLoad {
    /// Index into the model's node list
    pub node: usize,
    /// [FX, FY, FZ, MX, MY, MZ]
    pub values: [f64; 6],
}

impl NodeLoad {
    pub fn new(node: usize, values: [f64; 6]) -> Self {
        Self { node, values }
    }

    /// Create a force-only node load
    pub fn force(node: usize, force: [f64; 3]) -> Self {
        Self::new(node, [force[0], force[1], force[2], 0.0, 0.0, 0.0])
    }
}
