//! Tubular frame members

use serde::{Deserialize, Serialize};

use super::section::{SectionProperties, TubeSection};
use crate::loads::MemberLoad;

/// User definition of a member on a mesh edge.
///
/// `section` is the first section; each frame starts from it until resizing changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDefinition {
    pub section: TubeSection,
    /// Material name, either a preset or an entry of the structure's material table
    #[serde(default = "default_material")]
    pub material: String,
}

pub(crate) fn default_material() -> String {
    "steel_S235".to_string()
}

impl MemberDefinition {
    pub fn new(section: TubeSection, material: &str) -> Self {
        Self {
            section,
            material: material.to_string(),
        }
    }
}

/// Member of a prepared model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Source edge id
    pub edge: usize,
    /// Indices into the model's node list (i-node, j-node)
    pub nodes: [usize; 2],
    pub material: String,
    /// Modulus of elasticity
    pub e: f64,
    /// Shear modulus
    pub g: f64,
    pub section: TubeSection,
    /// Uniform loads along the member (kN/cm)
    pub loads: Vec<MemberLoad>,
}

impl Member {
    pub fn properties(&self) -> SectionProperties {
        self.section.properties()
    }
}
