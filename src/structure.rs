//! Structural definition attached to a mesh, and the per-frame section state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::elements::{Material, MemberDefinition, QuadDefinition, Support, TubeSection};
use crate::error::{FormError, FormResult};
use crate::geometry::Mesh;
use crate::loads::LoadDefinition;

/// Members, quads, supports and loads keyed by mesh element ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    /// Member definitions by edge id
    #[serde(default)]
    pub members: BTreeMap<usize, MemberDefinition>,
    /// Quad definitions by face id
    #[serde(default)]
    pub quads: BTreeMap<usize, QuadDefinition>,
    /// Supports by vertex id
    #[serde(default)]
    pub supports: BTreeMap<usize, Support>,
    #[serde(default)]
    pub loads: Vec<LoadDefinition>,
    /// Custom materials; names not found here fall back to the presets
    #[serde(default)]
    pub materials: BTreeMap<String, Material>,
}

impl StructureDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&mut self, edge: usize, definition: MemberDefinition) {
        self.members.insert(edge, definition);
    }

    pub fn add_quad(&mut self, face: usize, definition: QuadDefinition) {
        self.quads.insert(face, definition);
    }

    /// Add a support; a support without any restraint removes the vertex from the set
    pub fn add_support(&mut self, vertex: usize, support: Support) {
        if support.is_free() {
            self.supports.remove(&vertex);
        } else {
            self.supports.insert(vertex, support);
        }
    }

    pub fn add_load(&mut self, load: LoadDefinition) {
        self.loads.push(load);
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    /// Supports that restrain at least one DOF
    pub fn active_supports(&self) -> impl Iterator<Item = (usize, &Support)> {
        self.supports
            .iter()
            .filter(|(_, s)| !s.is_free())
            .map(|(&v, s)| (v, s))
    }

    pub fn material(&self, name: &str) -> FormResult<&Material> {
        self.materials
            .get(name)
            .or_else(|| Material::preset(name))
            .ok_or_else(|| FormError::InvalidInput(format!("unknown material '{name}'")))
    }

    /// Check ids against the mesh, materials and first sections
    pub fn validate(&self, mesh: &Mesh) -> FormResult<()> {
        for (&edge, member) in &self.members {
            mesh.edge(edge)?;
            self.material(&member.material)?;
            member.section.validate()?;
        }
        for (&face, quad) in &self.quads {
            let corners = mesh.face(face)?;
            if corners.len() != 4 {
                return Err(FormError::InvalidGeometry(format!(
                    "quad on face {face} needs 4 vertices, face has {}",
                    corners.len()
                )));
            }
            self.material(&quad.material)?;
            if quad.thickness <= 0.0 {
                return Err(FormError::InvalidInput(format!(
                    "quad on face {face} has thickness {}",
                    quad.thickness
                )));
            }
        }
        for &vertex in self.supports.keys() {
            if vertex >= mesh.vertices.len() {
                return Err(FormError::VertexNotFound(vertex));
            }
        }
        Ok(())
    }
}

/// Section state of one frame.
///
/// Entries missing for a member or quad fall back to its first value from the definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSections {
    pub members: BTreeMap<usize, TubeSection>,
    /// Quad thickness by face id
    pub quads: BTreeMap<usize, f64>,
}

impl FrameSections {
    /// Copy the first values forward
    pub fn initial(structure: &StructureDefinition) -> Self {
        Self {
            members: structure
                .members
                .iter()
                .map(|(&edge, m)| (edge, m.section))
                .collect(),
            quads: structure
                .quads
                .iter()
                .map(|(&face, q)| (face, q.thickness))
                .collect(),
        }
    }

    pub fn member(&self, edge: usize, definition: &MemberDefinition) -> TubeSection {
        self.members.get(&edge).copied().unwrap_or(definition.section)
    }

    pub fn quad(&self, face: usize, definition: &QuadDefinition) -> f64 {
        self.quads.get(&face).copied().unwrap_or(definition.thickness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_supports_are_dropped() {
        let mut s = StructureDefinition::new();
        s.add_support(0, Support::fixed());
        s.add_support(1, Support::pinned());
        s.add_support(0, Support::new());
        assert_eq!(s.supports.len(), 1);
        assert!(s.supports.contains_key(&1));
    }

    #[test]
    fn custom_materials_shadow_presets() {
        let mut s = StructureDefinition::new();
        let mut soft = Material::steel_s235();
        soft.e = 100.0;
        s.add_material(soft);
        assert_eq!(s.material("steel_S235").unwrap().e, 100.0);
        assert_eq!(s.material("steel_S355").unwrap().e, 21000.0);
        assert!(s.material("paper").is_err());
    }

    #[test]
    fn sections_fall_back_to_first_values() {
        let mut s = StructureDefinition::new();
        s.add_member(3, MemberDefinition::new(TubeSection::new(6.0, 5.0), "steel_S235"));
        let mut sections = FrameSections::default();
        assert_eq!(sections.member(3, &s.members[&3]).outer, 6.0);
        sections = FrameSections::initial(&s);
        sections.members.insert(3, TubeSection::new(8.0, 7.0));
        assert_eq!(sections.member(3, &s.members[&3]).outer, 8.0);
    }
}
