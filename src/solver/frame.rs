//! Direct stiffness analysis of 3D frames with optional flat shells
//!
//! Member end forces are `K_local * d_local + FER`; equivalent nodal loads of uniform member
//! loads enter the load vector as `-Tᵀ * FER`.

use log::{debug, warn};

use super::{FrameMode, StructuralSolver};
use crate::elements::SectionProperties;
use crate::error::{FormError, FormResult};
use crate::math::quad::{quad_local_stiffness, quad_resultants, quad_transformation, QuadFrame};
use crate::math::{
    element_dofs, fer_uniform, member_geometric_stiffness, member_local_stiffness,
    member_rotation, member_transformation, scatter, solve_linear_system, Mat, Mat12, Mat24,
    Mat3, Vec12, Vec24, Vec3, Vector,
};
use crate::model::PreparedModel;
use crate::results::{MemberRaw, QuadRaw, RawAnalysis, StationForces, STATIONS};

const DOF_NAMES: [&str; 6] = ["DX", "DY", "DZ", "RX", "RY", "RZ"];

/// 6-DOF frame solver
#[derive(Debug, Clone, Copy)]
pub struct FrameSolver {
    mode: FrameMode,
}

impl FrameSolver {
    pub fn new(mode: FrameMode) -> Self {
        Self { mode }
    }
}

/// Member data kept from assembly for force recovery
struct MemberFrame {
    edge: usize,
    rotation: Mat3,
    transform: Mat12,
    k_local: Mat12,
    fer: Vec12,
    w_local: Vec3,
    length: f64,
    e: f64,
    props: SectionProperties,
    dofs: [usize; 12],
}

impl MemberFrame {
    fn local_displacements(&self, d: &Vector) -> Vec12 {
        let global = Vec12::from_fn(|r, _| d[self.dofs[r]]);
        self.transform * global
    }

    fn end_forces(&self, d_local: &Vec12, kg_local: Option<&Mat12>) -> Vec12 {
        let mut f = self.k_local * d_local + self.fer;
        if let Some(kg) = kg_local {
            f += kg * d_local;
        }
        f
    }

    /// Mean axial force, tension positive
    fn axial(&self, d: &Vector) -> f64 {
        let f = self.end_forces(&self.local_displacements(d), None);
        0.5 * (f[6] - f[0])
    }

    /// Internal forces at the stations from the i-end forces and the uniform load
    fn stations(&self, f: &Vec12) -> Vec<StationForces> {
        let w = self.w_local;
        (0..STATIONS)
            .map(|i| {
                let x = self.length * i as f64 / (STATIONS - 1) as f64;
                StationForces {
                    x,
                    axial: -(f[0] + w.x * x),
                    shear_y: -(f[1] + w.y * x),
                    shear_z: -(f[2] + w.z * x),
                    torque: -f[3],
                    moment_y: -(f[4] + x * f[2] + x * x * w.z / 2.0),
                    moment_z: -(f[5] - x * f[1] - x * x * w.y / 2.0),
                }
            })
            .collect()
    }

    /// Global displacement at the stations: Hermite interpolation of the end displacements
    /// plus the fixed-end deflection of the uniform load
    fn deflection(&self, d: &Vec12) -> Vec<[f64; 3]> {
        let l = self.length;
        let w = self.w_local;
        let ea = self.e * self.props.a;
        let eiy = self.e * self.props.iy;
        let eiz = self.e * self.props.iz;
        (0..STATIONS)
            .map(|i| {
                let s = i as f64 / (STATIONS - 1) as f64;
                let x = s * l;
                let n1 = 1.0 - 3.0 * s * s + 2.0 * s.powi(3);
                let n2 = (s - 2.0 * s * s + s.powi(3)) * l;
                let n3 = 3.0 * s * s - 2.0 * s.powi(3);
                let n4 = (-s * s + s.powi(3)) * l;
                let bubble = x * x * (l - x) * (l - x) / 24.0;

                let u = d[0] * (1.0 - s) + d[6] * s + w.x * x * (l - x) / (2.0 * ea);
                let v = n1 * d[1] + n2 * d[5] + n3 * d[7] + n4 * d[11] + w.y * bubble / eiz;
                let wz = n1 * d[2] - n2 * d[4] + n3 * d[8] - n4 * d[10] + w.z * bubble / eiy;

                let global = self.rotation.transpose() * Vec3::new(u, v, wz);
                [global.x, global.y, global.z]
            })
            .collect()
    }
}

struct ShellFrame {
    face: usize,
    frame: QuadFrame,
    transform: Mat24,
    e: f64,
    nu: f64,
    thickness: f64,
    dofs: [usize; 24],
}

struct Assembly {
    k: Mat,
    p: Vector,
    members: Vec<MemberFrame>,
    shells: Vec<ShellFrame>,
}

fn node_position(model: &PreparedModel, index: usize) -> FormResult<Vec3> {
    model
        .nodes
        .get(index)
        .map(|n| n.position())
        .ok_or_else(|| FormError::InvalidInput(format!("element references missing node {index}")))
}

fn assemble(model: &PreparedModel) -> FormResult<Assembly> {
    let n = model.dof_count();
    let mut k = Mat::zeros(n, n);
    let mut p = Vector::zeros(n);

    for load in &model.node_loads {
        if load.node >= model.nodes.len() {
            return Err(FormError::InvalidInput(format!(
                "load on missing node {}",
                load.node
            )));
        }
        for (c, value) in load.values.iter().enumerate() {
            p[load.node * 6 + c] += value;
        }
    }

    let mut members = Vec::with_capacity(model.members.len());
    for member in &model.members {
        let pi = node_position(model, member.nodes[0])?;
        let pj = node_position(model, member.nodes[1])?;
        let rotation = member_rotation(&pi, &pj)?;
        let length = (pj - pi).norm();
        let props = member.properties();

        let k_local = member_local_stiffness(
            member.e, member.g, props.a, props.iy, props.iz, props.j, length,
        );
        let transform = member_transformation(&rotation);
        let w_local = member
            .loads
            .iter()
            .fold(Vec3::zeros(), |acc, load| acc + load.local_vector(&rotation));
        let fer = fer_uniform(&w_local, length);
        let dofs = element_dofs::<12>(&member.nodes);

        scatter(&mut k, &(transform.transpose() * k_local * transform), &dofs);
        let equivalent = transform.transpose() * fer;
        for (r, &dof) in dofs.iter().enumerate() {
            p[dof] -= equivalent[r];
        }

        members.push(MemberFrame {
            edge: member.edge,
            rotation,
            transform,
            k_local,
            fer,
            w_local,
            length,
            e: member.e,
            props,
            dofs,
        });
    }

    let mut shells = Vec::with_capacity(model.quads.len());
    for quad in &model.quads {
        let mut corners = [Vec3::zeros(); 4];
        for (corner, &node) in corners.iter_mut().zip(&quad.nodes) {
            *corner = node_position(model, node)?;
        }
        let frame = QuadFrame::new(&corners)?;
        let k_local = quad_local_stiffness(&frame, quad.e, quad.nu, quad.thickness)?;
        let transform = quad_transformation(&frame.rotation);
        let dofs = element_dofs::<24>(&quad.nodes);
        scatter(&mut k, &(transform.transpose() * k_local * transform), &dofs);

        shells.push(ShellFrame {
            face: quad.face,
            frame,
            transform,
            e: quad.e,
            nu: quad.nu,
            thickness: quad.thickness,
            dofs,
        });
    }

    Ok(Assembly {
        k,
        p,
        members,
        shells,
    })
}

/// Solve K11 * D1 = P1 on the free DOFs and expand to the full displacement vector
fn solve_free(k: &Mat, p: &Vector, free: &[usize]) -> FormResult<Vector> {
    let nf = free.len();
    let k11 = Mat::from_fn(nf, nf, |r, c| k[(free[r], free[c])]);
    let p1 = Vector::from_fn(nf, |r, _| p[free[r]]);

    let d1 = solve_linear_system(&k11, &p1).ok_or(FormError::SingularMatrix)?;
    if d1.iter().any(|v| !v.is_finite()) {
        return Err(FormError::SingularMatrix);
    }

    let mut d = Vector::zeros(k.nrows());
    for (r, &dof) in free.iter().enumerate() {
        d[dof] = d1[r];
    }
    Ok(d)
}

/// Every free DOF needs stiffness of its own
fn check_stability(model: &PreparedModel, k: &Mat, free: &[usize]) -> FormResult<()> {
    if model.supports.is_empty() {
        return Err(FormError::Unstable("structure has no supports".to_string()));
    }
    let max_diag = free.iter().map(|&d| k[(d, d)].abs()).fold(0.0, f64::max);
    if max_diag <= 0.0 {
        return Err(FormError::Unstable("structure has no stiffness".to_string()));
    }
    for &dof in free {
        if k[(dof, dof)].abs() <= 1e-12 * max_diag {
            let node = &model.nodes[dof / 6];
            return Err(FormError::Unstable(format!(
                "vertex {} has no stiffness in {}",
                node.vertex,
                DOF_NAMES[dof % 6]
            )));
        }
    }
    Ok(())
}

/// Residual of the free-DOF equilibrium relative to the applied loads
fn check_statics(k: &Mat, p: &Vector, d: &Vector, free: &[usize]) -> FormResult<()> {
    let kd = k * d;
    let (residual, load) = free.iter().fold((0.0, 0.0), |(r, l), &dof| {
        let diff = kd[dof] - p[dof];
        (r + diff * diff, l + p[dof] * p[dof])
    });
    let (residual, load) = (residual.sqrt(), load.sqrt());
    if residual > 1e-6 * load.max(1.0) {
        return Err(FormError::Unstable(format!(
            "equilibrium residual {residual:.3e} for load {load:.3e}"
        )));
    }
    Ok(())
}

impl FrameSolver {
    /// P-Delta iteration; returns displacements, converged geometric stiffness per member
    /// and the number of iterations
    fn p_delta(
        &self,
        model: &PreparedModel,
        asm: &Assembly,
        free: &[usize],
    ) -> FormResult<(Vector, Vec<Mat12>, usize)> {
        let options = &model.options;
        let mut d = solve_free(&asm.k, &asm.p, free)?;

        for iteration in 1..=options.max_iterations {
            let mut kg_global = Mat::zeros(asm.k.nrows(), asm.k.ncols());
            let mut kg_locals = Vec::with_capacity(asm.members.len());
            for member in &asm.members {
                let kg = member_geometric_stiffness(
                    member.axial(&d),
                    member.props.a,
                    member.props.iy,
                    member.props.iz,
                    member.length,
                );
                scatter(
                    &mut kg_global,
                    &(member.transform.transpose() * kg * member.transform),
                    &member.dofs,
                );
                kg_locals.push(kg);
            }

            let k = &asm.k + &kg_global;
            let next = solve_free(&k, &asm.p, free)?;
            let max_diff = (&next - &d).amax();
            d = next;
            debug!("P-Delta iteration {iteration}: max displacement change {max_diff:.3e}");
            if max_diff < options.tolerance {
                return Ok((d, kg_locals, iteration));
            }
        }

        Err(FormError::ConvergenceFailed(options.max_iterations))
    }
}

impl StructuralSolver for FrameSolver {
    fn solve(&self, model: &PreparedModel) -> FormResult<RawAnalysis> {
        let asm = assemble(model)?;
        let restrained = model.restrained_dofs();
        let free: Vec<usize> = (0..model.dof_count()).filter(|&d| !restrained[d]).collect();
        if free.is_empty() {
            warn!("model has no free degrees of freedom");
        }

        let checks = self.mode == FrameMode::FirstOrder;
        if checks && model.options.check_stability {
            check_stability(model, &asm.k, &free)?;
        }

        let (d, kg_locals, iterations) = match self.mode {
            FrameMode::SecondOrder => self.p_delta(model, &asm, &free)?,
            FrameMode::FirstOrder | FrameMode::FirstOrderLinear => {
                (solve_free(&asm.k, &asm.p, &free)?, Vec::new(), 0)
            }
        };

        if checks && model.options.check_statics {
            check_statics(&asm.k, &asm.p, &d, &free)?;
        }

        let displacements = (0..model.nodes.len())
            .map(|node| {
                let mut values = [0.0; 6];
                for (c, value) in values.iter_mut().enumerate() {
                    *value = d[node * 6 + c];
                }
                values
            })
            .collect();

        let mut raw = RawAnalysis {
            displacements,
            iterations,
            ..RawAnalysis::default()
        };

        for (index, member) in asm.members.iter().enumerate() {
            let d_local = member.local_displacements(&d);
            let forces = member.end_forces(&d_local, kg_locals.get(index));
            raw.members.insert(
                member.edge,
                MemberRaw {
                    edge: member.edge,
                    length: member.length,
                    stations: member.stations(&forces),
                    deflection: member.deflection(&d_local),
                },
            );
        }

        for shell in &asm.shells {
            let global = Vec24::from_fn(|r, _| d[shell.dofs[r]]);
            let d_local = shell.transform * global;
            let resultants =
                quad_resultants(&shell.frame, shell.e, shell.nu, shell.thickness, &d_local)?;
            raw.quads.insert(
                shell.face,
                QuadRaw {
                    face: shell.face,
                    resultants,
                },
            );
        }

        Ok(raw)
    }
}
