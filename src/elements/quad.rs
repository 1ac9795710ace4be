//! Four-node shell elements on quadrilateral faces

use serde::{Deserialize, Serialize};

use super::member::default_material;

/// User definition of a shell on a mesh face; `thickness` (cm) is the first thickness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadDefinition {
    pub thickness: f64,
    #[serde(default = "default_material")]
    pub material: String,
}

impl QuadDefinition {
    pub fn new(thickness: f64, material: &str) -> Self {
        Self {
            thickness,
            material: material.to_string(),
        }
    }
}

/// Quad of a prepared model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    /// Source face id
    pub face: usize,
    /// Indices into the model's node list, counter-clockwise
    pub nodes: [usize; 4],
    pub material: String,
    pub e: f64,
    /// Poisson's ratio
    pub nu: f64,
    pub thickness: f64,
}
