//! Flat four-node shell element.
//!
//! - Bilinear membrane (plane stress) with 2x2 Gauss integration
//! - Mindlin plate bending with 2x2 Gauss integration and one-point reduced integration of
//!   the transverse shear term (avoids shear locking on thin quads)
//! - A small drilling stiffness on θz so nodes carried only by shells stay stable
//!
//! 4 nodes with 6 DOFs each: DX, DY, DZ, RX, RY, RZ (24x24 in total).

use nalgebra::{Matrix2, Matrix3, SMatrix};
use serde::{Deserialize, Serialize};

use super::{Mat24, Mat3, Vec24, Vec3};
use crate::error::{FormError, FormResult};

/// Natural coordinates of the corners, counter-clockwise
const CORNERS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
const GAUSS: f64 = 0.577_350_269_189_625_8;
const SHEAR_CORRECTION: f64 = 5.0 / 6.0;
const DRILLING_RATIO: f64 = 1e-3;

type Bm = SMatrix<f64, 3, 24>;
type Bs = SMatrix<f64, 2, 24>;

/// Planar frame of a quad: rotation to local axes and in-plane corner coordinates
#[derive(Debug, Clone)]
pub struct QuadFrame {
    /// Rows are the local x, y, z axes in global coordinates
    pub rotation: Mat3,
    /// Corner coordinates in the local x-y plane
    pub local: [[f64; 2]; 4],
    pub center: Vec3,
}

impl QuadFrame {
    /// Project four corners onto their mean plane.
    ///
    /// The normal follows the diagonals, so corners listed counter-clockwise around the
    /// normal map to counter-clockwise local coordinates. Warping out of the mean plane is
    /// ignored.
    pub fn new(corners: &[Vec3; 4]) -> FormResult<Self> {
        let center = corners.iter().fold(Vec3::zeros(), |acc, c| acc + c) / 4.0;
        let normal = (corners[2] - corners[0]).cross(&(corners[3] - corners[1]));
        if normal.norm() < 1e-12 {
            return Err(FormError::InvalidGeometry(
                "quad has collinear diagonals".to_string(),
            ));
        }
        let z = normal.normalize();
        let edge = corners[1] - corners[0];
        let x_raw = edge - z * edge.dot(&z);
        if x_raw.norm() < 1e-12 {
            return Err(FormError::InvalidGeometry("quad has a zero-length edge".to_string()));
        }
        let x = x_raw.normalize();
        let y = z.cross(&x);

        let mut local = [[0.0; 2]; 4];
        for (slot, corner) in local.iter_mut().zip(corners) {
            let rel = corner - center;
            *slot = [rel.dot(&x), rel.dot(&y)];
        }

        Ok(Self {
            rotation: Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]),
            local,
            center,
        })
    }

    /// Area of the projected quad (shoelace in local coordinates)
    pub fn area(&self) -> f64 {
        let mut twice = 0.0;
        for i in 0..4 {
            let [x0, y0] = self.local[i];
            let [x1, y1] = self.local[(i + 1) % 4];
            twice += x0 * y1 - x1 * y0;
        }
        0.5 * twice.abs()
    }

    /// Shape functions and their x/y derivatives at a natural point, plus det(J)
    fn derivatives(&self, xi: f64, eta: f64) -> FormResult<ShapeAt> {
        let mut n = [0.0; 4];
        let mut dxi = [0.0; 4];
        let mut deta = [0.0; 4];
        for (k, &(xk, ek)) in CORNERS.iter().enumerate() {
            n[k] = 0.25 * (1.0 + xi * xk) * (1.0 + eta * ek);
            dxi[k] = 0.25 * xk * (1.0 + eta * ek);
            deta[k] = 0.25 * ek * (1.0 + xi * xk);
        }

        let mut jac = Matrix2::<f64>::zeros();
        for k in 0..4 {
            jac[(0, 0)] += dxi[k] * self.local[k][0];
            jac[(0, 1)] += dxi[k] * self.local[k][1];
            jac[(1, 0)] += deta[k] * self.local[k][0];
            jac[(1, 1)] += deta[k] * self.local[k][1];
        }
        let det = jac.determinant();
        if det <= 1e-14 {
            return Err(FormError::InvalidGeometry(
                "quad is concave or has inverted corner order".to_string(),
            ));
        }

        let mut dx = [0.0; 4];
        let mut dy = [0.0; 4];
        for k in 0..4 {
            dx[k] = (jac[(1, 1)] * dxi[k] - jac[(0, 1)] * deta[k]) / det;
            dy[k] = (-jac[(1, 0)] * dxi[k] + jac[(0, 0)] * deta[k]) / det;
        }
        Ok(ShapeAt { n, dx, dy, det })
    }
}

struct ShapeAt {
    n: [f64; 4],
    dx: [f64; 4],
    dy: [f64; 4],
    det: f64,
}

impl ShapeAt {
    fn membrane(&self) -> Bm {
        let mut b = Bm::zeros();
        for k in 0..4 {
            let u = 6 * k;
            b[(0, u)] = self.dx[k];
            b[(1, u + 1)] = self.dy[k];
            b[(2, u)] = self.dy[k];
            b[(2, u + 1)] = self.dx[k];
        }
        b
    }

    /// Curvatures with βx = θy and βy = -θx
    fn bending(&self) -> Bm {
        let mut b = Bm::zeros();
        for k in 0..4 {
            let rx = 6 * k + 3;
            let ry = 6 * k + 4;
            b[(0, ry)] = self.dx[k];
            b[(1, rx)] = -self.dy[k];
            b[(2, ry)] = self.dy[k];
            b[(2, rx)] = -self.dx[k];
        }
        b
    }

    fn shear(&self) -> Bs {
        let mut b = Bs::zeros();
        for k in 0..4 {
            let w = 6 * k + 2;
            b[(0, w)] = self.dx[k];
            b[(0, w + 2)] = self.n[k];
            b[(1, w)] = self.dy[k];
            b[(1, w + 1)] = -self.n[k];
        }
        b
    }
}

fn plane_stress(e: f64, nu: f64) -> Matrix3<f64> {
    let c = e / (1.0 - nu * nu);
    Matrix3::new(c, c * nu, 0.0, c * nu, c, 0.0, 0.0, 0.0, c * (1.0 - nu) / 2.0)
}

/// Constitutive matrices of a homogeneous shell of thickness `t`
struct ShellRigidity {
    membrane: Matrix3<f64>,
    bending: Matrix3<f64>,
    shear: Matrix2<f64>,
}

impl ShellRigidity {
    fn new(e: f64, nu: f64, t: f64) -> Self {
        let base = plane_stress(e, nu);
        let g = e / (2.0 * (1.0 + nu));
        Self {
            membrane: base * t,
            bending: base * (t.powi(3) / 12.0),
            shear: Matrix2::identity() * (SHEAR_CORRECTION * g * t),
        }
    }
}

/// Local 24x24 stiffness of the shell element
pub fn quad_local_stiffness(frame: &QuadFrame, e: f64, nu: f64, t: f64) -> FormResult<Mat24> {
    let rigidity = ShellRigidity::new(e, nu, t);
    let mut k = Mat24::zeros();

    for &xi in &[-GAUSS, GAUSS] {
        for &eta in &[-GAUSS, GAUSS] {
            let at = frame.derivatives(xi, eta)?;
            let bm = at.membrane();
            let bb = at.bending();
            k += bm.transpose() * rigidity.membrane * bm * at.det;
            k += bb.transpose() * rigidity.bending * bb * at.det;
        }
    }

    let center = frame.derivatives(0.0, 0.0)?;
    let bs = center.shear();
    k += bs.transpose() * rigidity.shear * bs * (4.0 * center.det);

    let drilling = (0..4)
        .flat_map(|node| [k[(6 * node + 3, 6 * node + 3)], k[(6 * node + 4, 6 * node + 4)]])
        .fold(f64::INFINITY, f64::min)
        * DRILLING_RATIO;
    for node in 0..4 {
        k[(6 * node + 5, 6 * node + 5)] += drilling;
    }

    Ok(k)
}

/// Block diagonal 24x24 transformation built from the quad rotation
pub fn quad_transformation(r: &Mat3) -> Mat24 {
    let mut t = Mat24::zeros();
    for block in 0..8 {
        t.fixed_view_mut::<3, 3>(block * 3, block * 3).copy_from(r);
    }
    t
}

/// Stress resultants at the element centre (per unit length)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellResultants {
    /// Membrane forces [nx, ny, nxy]
    pub membrane: [f64; 3],
    /// Bending moments [mx, my, mxy]
    pub moments: [f64; 3],
    /// Transverse shear forces [qx, qy]
    pub shear: [f64; 2],
}

/// Recover centre resultants from local nodal displacements
pub fn quad_resultants(
    frame: &QuadFrame,
    e: f64,
    nu: f64,
    t: f64,
    d_local: &Vec24,
) -> FormResult<ShellResultants> {
    let rigidity = ShellRigidity::new(e, nu, t);
    let at = frame.derivatives(0.0, 0.0)?;
    let n = rigidity.membrane * (at.membrane() * d_local);
    let m = rigidity.bending * (at.bending() * d_local);
    let q = rigidity.shear * (at.shear() * d_local);
    Ok(ShellResultants {
        membrane: [n[0], n[1], n[2]],
        moments: [m[0], m[1], m[2]],
        shear: [q[0], q[1]],
    })
}
