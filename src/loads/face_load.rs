//! Area loads on mesh faces

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Area load on a face (kN/m²).
///
/// Each component is signed along its axis:
/// - `normal` acts along the face normal over the true face area (wind, pressure)
/// - `projected` acts along global Z over the area projected on the XY plane (snow)
/// - `area_z` acts along global Z over the true face area (dead load of a cover)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceLoad {
    pub face: usize,
    #[serde(default)]
    pub normal: f64,
    #[serde(default)]
    pub projected: f64,
    #[serde(default)]
    pub area_z: f64,
}

impl FaceLoad {
    /// Total force on the face (kN) for areas in m² and a unit normal
    pub fn resultant(&self, area: f64, projected_area: f64, normal: &Vec3) -> Vec3 {
        normal * (self.normal * area)
            + Vec3::z() * (self.projected * projected_area + self.area_z * area)
    }
}

/// Split a face resultant over the member edges bounding the face.
///
/// `edges` holds (edge id, length) of every bounding edge that carries a member. Each edge
/// takes a share proportional to its length, so every edge ends up with the same intensity
/// `resultant / perimeter` per unit length. Returns `None` when the perimeter vanishes.
pub fn split_by_perimeter(resultant: &Vec3, edges: &[(usize, f64)]) -> Option<Vec<(usize, Vec3)>> {
    let perimeter: f64 = edges.iter().map(|&(_, length)| length).sum();
    if perimeter <= f64::EPSILON {
        return None;
    }
    let intensity = resultant / perimeter;
    Some(edges.iter().map(|&(edge, _)| (edge, intensity)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn resultant_combines_components() {
        let load = FaceLoad {
            face: 0,
            normal: 1.0,
            projected: -0.5,
            area_z: -2.0,
        };
        let n = Vec3::new(1.0, 0.0, 0.0);
        let f = load.resultant(4.0, 3.0, &n);
        assert_relative_eq!(f, Vec3::new(4.0, 0.0, -1.5 - 8.0), epsilon = 1e-12);
    }

    #[test]
    fn split_preserves_total_force() {
        let total = Vec3::new(0.0, 0.0, -12.0);
        let edges = [(0, 1.0), (1, 2.0), (2, 3.0)];
        let parts = split_by_perimeter(&total, &edges).unwrap();
        let sum = parts
            .iter()
            .zip(&edges)
            .fold(Vec3::zeros(), |acc, ((_, w), (_, l))| acc + w * *l);
        assert_relative_eq!(sum, total, epsilon = 1e-12);
    }

    #[test]
    fn no_perimeter_means_no_distribution() {
        assert!(split_by_perimeter(&Vec3::z(), &[]).is_none());
        assert!(split_by_perimeter(&Vec3::z(), &[(3, 0.0)]).is_none());
    }
}
