//! Analysis nodes created from mesh vertices

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// A node of the structural model, positioned in model units (cm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Source vertex id
    pub vertex: usize,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Node {
    pub fn new(vertex: usize, position: [f64; 3]) -> Self {
        let [x, y, z] = position;
        Self { vertex, x, y, z }
    }

    /// Get the coordinates as an array
    pub fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Calculate distance to another node
    pub fn distance_to(&self, other: &Node) -> f64 {
        (other.position() - self.position()).norm()
    }
}
