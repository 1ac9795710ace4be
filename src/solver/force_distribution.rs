//! Pin-jointed force distribution
//!
//! Members carry axial force only. Nodal equilibrium in every unsupported translational
//! direction gives one equation `Σ N_m · e_m + F = 0`, where `e_m` is the unit vector from
//! the node along member `m`. The system is solved by least squares (minimum norm for
//! indeterminate trusses); a residual means the loads cannot be carried by axial forces.

use log::{debug, warn};

use super::StructuralSolver;
use crate::error::{FormError, FormResult};
use crate::math::{member_rotation, Mat, Vec3, Vector};
use crate::model::PreparedModel;
use crate::results::{MemberRaw, RawAnalysis, StationForces, STATIONS};

/// Direct axial force solve
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceDistributionSolver;

impl StructuralSolver for ForceDistributionSolver {
    fn solve(&self, model: &PreparedModel) -> FormResult<RawAnalysis> {
        if !model.quads.is_empty() {
            warn!(
                "force distribution ignores {} quad(s); their loads still act on the nodes",
                model.quads.len()
            );
        }

        let node_count = model.nodes.len();
        let mut loads = vec![Vec3::zeros(); node_count];
        for load in &model.node_loads {
            let slot = loads.get_mut(load.node).ok_or_else(|| {
                FormError::InvalidInput(format!("load on missing node {}", load.node))
            })?;
            *slot += Vec3::new(load.values[0], load.values[1], load.values[2]);
        }

        let mut directions = Vec::with_capacity(model.members.len());
        let mut lengths = Vec::with_capacity(model.members.len());
        for member in &model.members {
            let [a, b] = member.nodes;
            let (pa, pb) = match (model.nodes.get(a), model.nodes.get(b)) {
                (Some(pa), Some(pb)) => (pa.position(), pb.position()),
                _ => {
                    return Err(FormError::InvalidInput(format!(
                        "member on edge {} references a missing node",
                        member.edge
                    )))
                }
            };
            let rotation = member_rotation(&pa, &pb)?;
            let length = (pb - pa).norm();

            // line loads are lumped half to each end
            for load in &member.loads {
                let half = load.global_vector(&rotation) * (length / 2.0);
                loads[a] += half;
                loads[b] += half;
            }
            directions.push((pb - pa) / length);
            lengths.push(length);
        }

        let restrained = model.restrained_dofs();
        let rows: Vec<(usize, usize)> = (0..node_count)
            .flat_map(|node| (0..3).map(move |axis| (node, axis)))
            .filter(|&(node, axis)| !restrained[node * 6 + axis])
            .collect();

        let mut forces = Vector::zeros(model.members.len());
        if !rows.is_empty() && !model.members.is_empty() {
            let row_of = |node: usize, axis: usize| rows.iter().position(|&r| r == (node, axis));
            let mut a = Mat::zeros(rows.len(), model.members.len());
            for (col, member) in model.members.iter().enumerate() {
                let [i, j] = member.nodes;
                for axis in 0..3 {
                    if let Some(row) = row_of(i, axis) {
                        a[(row, col)] += directions[col][axis];
                    }
                    if let Some(row) = row_of(j, axis) {
                        a[(row, col)] -= directions[col][axis];
                    }
                }
            }
            let b = Vector::from_fn(rows.len(), |r, _| -loads[rows[r].0][rows[r].1]);

            forces = a
                .clone()
                .svd(true, true)
                .solve(&b, 1e-10)
                .map_err(|_| FormError::SingularMatrix)?;

            let residual = (&a * &forces - &b).norm();
            let tolerance = model.options.tolerance.max(1e-9) * b.norm().max(1.0);
            if !residual.is_finite() || residual > tolerance {
                debug!("force distribution residual {residual:.3e} exceeds {tolerance:.3e}");
                return Err(FormError::SingularMatrix);
            }
        }

        let mut raw = RawAnalysis {
            displacements: vec![[0.0; 6]; node_count],
            ..RawAnalysis::default()
        };
        for ((member, &length), &axial) in model.members.iter().zip(&lengths).zip(forces.iter()) {
            let stations = (0..STATIONS)
                .map(|i| StationForces {
                    x: length * i as f64 / (STATIONS - 1) as f64,
                    axial,
                    ..StationForces::default()
                })
                .collect();
            raw.members.insert(
                member.edge,
                MemberRaw {
                    edge: member.edge,
                    length,
                    stations,
                    deflection: vec![[0.0; 3]; STATIONS],
                },
            );
        }
        Ok(raw)
    }
}
