//! Mesh geometry supplied by the host
//!
//! Vertex, edge and face ids are their indices. Coordinates are local mesh coordinates in
//! metres; `transform` maps them to world space.

mod shape;

use std::collections::BTreeMap;

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};
use crate::math::Vec3;

pub use shape::{ShapeKey, ShapeKeyMesh, ShapeSource};

fn identity() -> [[f64; 4]; 4] {
    [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Polygon mesh with a world transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<[f64; 3]>,
    #[serde(default)]
    pub edges: Vec<[usize; 2]>,
    /// Vertex loops, counter-clockwise seen from outside
    #[serde(default)]
    pub faces: Vec<Vec<usize>>,
    /// Row-major 4x4 world transform
    #[serde(default = "identity")]
    pub transform: [[f64; 4]; 4],
}

impl Mesh {
    pub fn new(vertices: Vec<[f64; 3]>, edges: Vec<[usize; 2]>, faces: Vec<Vec<usize>>) -> Self {
        Self {
            vertices,
            edges,
            faces,
            transform: identity(),
        }
    }

    pub fn with_transform(mut self, transform: [[f64; 4]; 4]) -> Self {
        self.transform = transform;
        self
    }

    /// Check that edges and faces only reference existing vertices
    pub fn validate(&self) -> FormResult<()> {
        let n = self.vertices.len();
        for &[a, b] in &self.edges {
            if a >= n || b >= n {
                return Err(FormError::VertexNotFound(a.max(b)));
            }
        }
        for face in &self.faces {
            if face.len() < 3 {
                return Err(FormError::InvalidGeometry(format!(
                    "face with {} vertices",
                    face.len()
                )));
            }
            if let Some(&v) = face.iter().find(|&&v| v >= n) {
                return Err(FormError::VertexNotFound(v));
            }
        }
        Ok(())
    }

    /// All vertex positions in world space (applies the transform once)
    pub fn world_positions(&self) -> Vec<Vec3> {
        let m = Matrix4::from_fn(|r, c| self.transform[r][c]);
        self.vertices
            .iter()
            .map(|v| {
                let p = m * Vector4::new(v[0], v[1], v[2], 1.0);
                let w = if p.w.abs() > f64::EPSILON { p.w } else { 1.0 };
                Vec3::new(p.x / w, p.y / w, p.z / w)
            })
            .collect()
    }

    pub fn edge(&self, id: usize) -> FormResult<[usize; 2]> {
        self.edges.get(id).copied().ok_or(FormError::EdgeNotFound(id))
    }

    pub fn face(&self, id: usize) -> FormResult<&[usize]> {
        self.faces
            .get(id)
            .map(Vec::as_slice)
            .ok_or(FormError::FaceNotFound(id))
    }

    /// Map from sorted vertex pair to edge id
    pub fn edge_lookup(&self) -> BTreeMap<(usize, usize), usize> {
        self.edges
            .iter()
            .enumerate()
            .map(|(id, &[a, b])| ((a.min(b), a.max(b)), id))
            .collect()
    }

    /// Edge ids bounding a face, in loop order (sides without an edge are left out)
    pub fn face_edges(&self, id: usize, lookup: &BTreeMap<(usize, usize), usize>) -> FormResult<Vec<usize>> {
        let face = self.face(id)?;
        Ok((0..face.len())
            .filter_map(|k| {
                let a = face[k];
                let b = face[(k + 1) % face.len()];
                lookup.get(&(a.min(b), a.max(b))).copied()
            })
            .collect())
    }
}

/// Length of the segment between two vertex positions
pub fn edge_length(positions: &[Vec3], edge: [usize; 2]) -> f64 {
    (positions[edge[1]] - positions[edge[0]]).norm()
}

/// Newell vector of a polygon: normal direction with twice the area as length
fn newell(positions: &[Vec3], face: &[usize]) -> Vec3 {
    let mut n = Vec3::zeros();
    for k in 0..face.len() {
        let a = positions[face[k]];
        let b = positions[face[(k + 1) % face.len()]];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Area of a (nearly planar) polygon
pub fn face_area(positions: &[Vec3], face: &[usize]) -> f64 {
    0.5 * newell(positions, face).norm()
}

/// Unit normal of a polygon, zero for degenerate faces
pub fn face_normal(positions: &[Vec3], face: &[usize]) -> Vec3 {
    let n = newell(positions, face);
    let len = n.norm();
    if len > f64::EPSILON {
        n / len
    } else {
        Vec3::zeros()
    }
}

/// Area of the polygon projected on the XY plane (shoelace formula)
pub fn projected_area(positions: &[Vec3], face: &[usize]) -> f64 {
    let mut twice = 0.0;
    for k in 0..face.len() {
        let a = positions[face[k]];
        let b = positions[face[(k + 1) % face.len()]];
        twice += a.x * b.y - b.x * a.y;
    }
    0.5 * twice.abs()
}

/// Enclosed volume by the divergence theorem; open meshes give an approximate value
pub fn volume(positions: &[Vec3], faces: &[Vec<usize>]) -> f64 {
    let mut six = 0.0;
    for face in faces {
        let origin = positions[face[0]];
        for k in 1..face.len().saturating_sub(1) {
            let b = positions[face[k]];
            let c = positions[face[k + 1]];
            six += origin.dot(&b.cross(&c));
        }
    }
    (six / 6.0).abs()
}

/// Sum of all face areas
pub fn total_area(positions: &[Vec3], faces: &[Vec<usize>]) -> f64 {
    faces.iter().map(|f| face_area(positions, f)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_cube() -> Mesh {
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        let faces = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![1, 2, 6, 5],
            vec![2, 3, 7, 6],
            vec![3, 0, 4, 7],
        ];
        Mesh::new(vertices, vec![], faces)
    }

    #[test]
    fn cube_volume_and_area() {
        let mesh = unit_cube();
        let p = mesh.world_positions();
        assert_relative_eq!(volume(&p, &mesh.faces), 1.0, epsilon = 1e-12);
        assert_relative_eq!(total_area(&p, &mesh.faces), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn transform_scales_world_positions() {
        let mut t = identity();
        t[0][0] = 2.0;
        t[2][3] = 5.0;
        let mesh = unit_cube().with_transform(t);
        let p = mesh.world_positions();
        assert_relative_eq!(p[6], Vec3::new(2.0, 1.0, 6.0), epsilon = 1e-12);
        assert_relative_eq!(volume(&p, &mesh.faces), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn sloped_face_projects_smaller() {
        let p = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let face = [0, 1, 2, 3];
        assert_relative_eq!(face_area(&p, &face), 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(projected_area(&p, &face), 1.0, epsilon = 1e-12);
        let n = face_normal(&p, &face);
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        assert!(n.z > 0.0);
    }

    #[test]
    fn face_edges_follow_loop() {
        let mesh = Mesh::new(
            vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1], [2, 1], [3, 2]],
            vec![vec![0, 1, 2, 3]],
        );
        let lookup = mesh.edge_lookup();
        assert_eq!(mesh.face_edges(0, &lookup).unwrap(), vec![0, 1, 2]);
        assert!(mesh.face_edges(1, &lookup).is_err());
    }

    #[test]
    fn dangling_edge_fails_validation() {
        let mesh = Mesh::new(vec![[0.0; 3]], vec![[0, 4]], vec![]);
        assert!(matches!(mesh.validate(), Err(FormError::VertexNotFound(4))));
    }
}
