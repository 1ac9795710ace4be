//! Deformation of a base mesh by a chromosome

use serde::{Deserialize, Serialize};

use super::Mesh;
use crate::error::{FormError, FormResult};

/// Source of candidate shapes.
///
/// The implicit basis parameter is not part of the chromosome; an all-zero chromosome
/// yields the basis shape.
pub trait ShapeSource: Send + Sync {
    /// Number of genes a chromosome must carry
    fn gene_count(&self) -> usize;

    /// Mesh deformed by the chromosome
    fn deform(&self, chromosome: &[f64]) -> FormResult<Mesh>;

    /// Check the source before any chromosome is deformed
    fn validate(&self) -> FormResult<()> {
        Ok(())
    }
}

/// Base mesh plus one target vertex set per gene (blend shapes).
///
/// deformed = basis + Σ gene · (target − basis)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeKeyMesh {
    pub basis: Mesh,
    pub keys: Vec<ShapeKey>,
}

/// One named deformation target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeKey {
    pub name: String,
    pub positions: Vec<[f64; 3]>,
}

impl ShapeKeyMesh {
    pub fn new(basis: Mesh) -> Self {
        Self {
            basis,
            keys: Vec::new(),
        }
    }

    pub fn with_key(mut self, name: &str, positions: Vec<[f64; 3]>) -> Self {
        self.keys.push(ShapeKey {
            name: name.to_string(),
            positions,
        });
        self
    }

    /// Every key must move the same vertex set as the basis
    pub fn validate(&self) -> FormResult<()> {
        self.basis.validate()?;
        for key in &self.keys {
            if key.positions.len() != self.basis.vertices.len() {
                return Err(FormError::InvalidInput(format!(
                    "shape key '{}' has {} positions, mesh has {} vertices",
                    key.name,
                    key.positions.len(),
                    self.basis.vertices.len()
                )));
            }
        }
        Ok(())
    }
}

impl ShapeSource for ShapeKeyMesh {
    fn gene_count(&self) -> usize {
        self.keys.len()
    }

    fn validate(&self) -> FormResult<()> {
        ShapeKeyMesh::validate(self)
    }

    fn deform(&self, chromosome: &[f64]) -> FormResult<Mesh> {
        if chromosome.len() != self.keys.len() {
            return Err(FormError::ChromosomeLength {
                expected: self.keys.len(),
                actual: chromosome.len(),
            });
        }
        let mut mesh = self.basis.clone();
        for (key, &gene) in self.keys.iter().zip(chromosome) {
            if gene == 0.0 {
                continue;
            }
            for (vertex, (base, target)) in mesh
                .vertices
                .iter_mut()
                .zip(self.basis.vertices.iter().zip(&key.positions))
            {
                for axis in 0..3 {
                    vertex[axis] += gene * (target[axis] - base[axis]);
                }
            }
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifted_point() -> ShapeKeyMesh {
        let basis = Mesh::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], vec![[0, 1]], vec![]);
        ShapeKeyMesh::new(basis)
            .with_key("lift", vec![[0.0, 0.0, 0.0], [1.0, 0.0, 2.0]])
            .with_key("push", vec![[0.5, 0.0, 0.0], [1.0, 0.0, 0.0]])
    }

    #[test]
    fn zero_chromosome_is_the_basis() {
        let shape = lifted_point();
        assert_eq!(shape.deform(&[0.0, 0.0]).unwrap(), shape.basis);
    }

    #[test]
    fn genes_blend_linearly() {
        let mesh = lifted_point().deform(&[0.5, 1.0]).unwrap();
        assert_eq!(mesh.vertices[1], [1.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[0], [0.5, 0.0, 0.0]);
    }

    #[test]
    fn wrong_chromosome_length_is_an_error() {
        assert!(matches!(
            lifted_point().deform(&[0.1]),
            Err(FormError::ChromosomeLength {
                expected: 2,
                actual: 1
            })
        ));
    }
}
