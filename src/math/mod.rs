//! Matrix helpers for frame and shell stiffness assembly

pub mod polyfit;
pub mod quad;

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, SVector, Vector3};

use crate::error::{FormError, FormResult};

pub use polyfit::Polynomial;

pub type Mat = DMatrix<f64>;
pub type Vector = DVector<f64>;
pub type Mat3 = Matrix3<f64>;
pub type Vec3 = Vector3<f64>;

/// 12x12 matrix for member stiffness
pub type Mat12 = SMatrix<f64, 12, 12>;
/// 12-element vector for member end forces/displacements
pub type Vec12 = SVector<f64, 12>;
/// 24x24 matrix for quad stiffness
pub type Mat24 = SMatrix<f64, 24, 24>;
/// 24-element vector for quad nodal forces/displacements
pub type Vec24 = SVector<f64, 24>;

const ZERO_LENGTH: f64 = 1e-10;

/// Direction cosine matrix of a member (rows are the local x, y, z axes in global coordinates).
///
/// The global Z axis points up. Local x runs from the i-node to the j-node, local y is
/// horizontal and local z completes the right-handed triad, so for any non-vertical member
/// local z has a positive global Z component. Vertical members take global Y as local y.
pub fn member_rotation(i_node: &Vec3, j_node: &Vec3) -> FormResult<Mat3> {
    let axis = j_node - i_node;
    let length = axis.norm();
    if length < ZERO_LENGTH {
        return Err(FormError::InvalidGeometry(format!(
            "member has zero length at ({:.4}, {:.4}, {:.4})",
            i_node.x, i_node.y, i_node.z
        )));
    }
    let x = axis / length;

    let horizontal = Vec3::z().cross(&x);
    let y = if horizontal.norm() < 1e-9 {
        Vec3::y()
    } else {
        horizontal.normalize()
    };
    let z = x.cross(&y);

    Ok(Mat3::from_rows(&[x.transpose(), y.transpose(), z.transpose()]))
}

/// Expand a 3x3 rotation into the block diagonal 12x12 member transformation
pub fn member_transformation(r: &Mat3) -> Mat12 {
    let mut t = Mat12::zeros();
    for block in 0..4 {
        t.fixed_view_mut::<3, 3>(block * 3, block * 3).copy_from(r);
    }
    t
}

/// Local 12x12 stiffness of a prismatic 3D frame member.
///
/// DOF order per end: [u, v, w, θx, θy, θz].
pub fn member_local_stiffness(
    e: f64,
    g: f64,
    a: f64,
    iy: f64,
    iz: f64,
    j: f64,
    length: f64,
) -> Mat12 {
    let mut k = Mat12::zeros();
    let l = length;

    // axial and torsion are two-node springs
    spring(&mut k, 0, 6, e * a / l);
    spring(&mut k, 3, 9, g * j / l);

    // bending in the local x-y plane: v with θz
    bending_plane(&mut k, [1, 5, 7, 11], e * iz, l, 1.0);
    // bending in the local x-z plane: w with θy (rotation sign flips)
    bending_plane(&mut k, [2, 4, 8, 10], e * iy, l, -1.0);

    k
}

fn spring(k: &mut Mat12, a: usize, b: usize, stiffness: f64) {
    k[(a, a)] += stiffness;
    k[(b, b)] += stiffness;
    k[(a, b)] -= stiffness;
    k[(b, a)] -= stiffness;
}

/// Scatter the Euler-Bernoulli bending block for one plane.
/// `dofs` = [translation i, rotation i, translation j, rotation j].
fn bending_plane(k: &mut Mat12, dofs: [usize; 4], ei: f64, l: f64, sign: f64) {
    let l2 = l * l;
    let l3 = l2 * l;
    let c = sign;
    #[rustfmt::skip]
    let block = [
        [ 12.0 * ei / l3,      c * 6.0 * ei / l2, -12.0 * ei / l3,      c * 6.0 * ei / l2],
        [ c * 6.0 * ei / l2,   4.0 * ei / l,      -c * 6.0 * ei / l2,   2.0 * ei / l],
        [-12.0 * ei / l3,     -c * 6.0 * ei / l2,  12.0 * ei / l3,     -c * 6.0 * ei / l2],
        [ c * 6.0 * ei / l2,   2.0 * ei / l,      -c * 6.0 * ei / l2,   4.0 * ei / l],
    ];
    for (r, &row) in dofs.iter().enumerate() {
        for (s, &col) in dofs.iter().enumerate() {
            k[(row, col)] += block[r][s];
        }
    }
}

/// Geometric stiffness for P-Delta iterations.
///
/// `n` is the axial force with tension positive; tension stiffens the member, compression
/// softens it.
pub fn member_geometric_stiffness(n: f64, a: f64, iy: f64, iz: f64, length: f64) -> Mat12 {
    let mut kg = Mat12::zeros();
    if n.abs() < 1e-12 {
        return kg;
    }
    let l = length;
    let p = n / l;

    spring(&mut kg, 0, 6, p);
    spring(&mut kg, 3, 9, p * (iy + iz) / a);

    for (dofs, c) in [([1, 5, 7, 11], 1.0), ([2, 4, 8, 10], -1.0)] {
        #[rustfmt::skip]
        let block = [
            [ 6.0 / 5.0,      c * l / 10.0,  -6.0 / 5.0,      c * l / 10.0],
            [ c * l / 10.0,   2.0 * l * l / 15.0, -c * l / 10.0, -l * l / 30.0],
            [-6.0 / 5.0,     -c * l / 10.0,   6.0 / 5.0,     -c * l / 10.0],
            [ c * l / 10.0,  -l * l / 30.0,  -c * l / 10.0,   2.0 * l * l / 15.0],
        ];
        for (r, &row) in dofs.iter().enumerate() {
            for (s, &col) in dofs.iter().enumerate() {
                kg[(row, col)] += p * block[r][s];
            }
        }
    }
    kg
}

/// Fixed end reactions of a uniform load given in local member axes.
///
/// Member end forces are `K * d + fer`.
pub fn fer_uniform(w_local: &Vec3, length: f64) -> Vec12 {
    let l = length;
    let l2 = l * l;
    let mut fer = Vec12::zeros();

    fer[0] = -w_local.x * l / 2.0;
    fer[6] = -w_local.x * l / 2.0;

    fer[1] = -w_local.y * l / 2.0;
    fer[5] = -w_local.y * l2 / 12.0;
    fer[7] = -w_local.y * l / 2.0;
    fer[11] = w_local.y * l2 / 12.0;

    fer[2] = -w_local.z * l / 2.0;
    fer[4] = w_local.z * l2 / 12.0;
    fer[8] = -w_local.z * l / 2.0;
    fer[10] = -w_local.z * l2 / 12.0;

    fer
}

/// Add an element matrix into the global matrix through its DOF map
pub fn scatter<const N: usize>(global: &mut Mat, element: &SMatrix<f64, N, N>, dofs: &[usize; N]) {
    for (r, &row) in dofs.iter().enumerate() {
        for (c, &col) in dofs.iter().enumerate() {
            global[(row, col)] += element[(r, c)];
        }
    }
}

/// Global DOF indices of an element whose nodes carry six DOFs each
pub fn element_dofs<const N: usize>(nodes: &[usize]) -> [usize; N] {
    let mut dofs = [0; N];
    for (slot, dof) in dofs.iter_mut().enumerate() {
        *dof = nodes[slot / 6] * 6 + slot % 6;
    }
    dofs
}

/// Solve a (normally) symmetric positive definite system, falling back to LU
pub fn solve_linear_system(a: &Mat, b: &Vector) -> Option<Vector> {
    if let Some(chol) = a.clone().cholesky() {
        return Some(chol.solve(b));
    }
    a.clone().lu().solve(b)
}
