//! Stresses, buckling checks, utilization and strain energy from raw solver output

use log::debug;

use crate::elements::{Material, TubeSection, SLENDER_LIMIT};
use crate::error::{FormError, FormResult};
use crate::model::PreparedModel;
use crate::results::{
    FrameAnalysis, MemberExtrema, MemberRaw, MemberResult, QuadRaw, QuadResult, RawAnalysis,
    StationResult,
};
use crate::structure::StructureDefinition;

/// Margin on allowable stresses before a member counts as overstressed
pub const OVERSTRESS_MARGIN: f64 = 1.05;
/// Shear shape factor of a thin circular tube
pub const TUBE_SHEAR_FACTOR: f64 = 1.333;
/// Effective length factor for buckling (both ends fixed)
pub const EFFECTIVE_LENGTH_FACTOR: f64 = 0.5;
/// Shear shape factor of a solid rectangular plate strip
const PLATE_SHEAR_FACTOR: f64 = 1.5;

/// The value farthest from zero, keeping its sign.
///
/// Compares |min| and |max| of the list: `[-5, 3]` gives `-5`, `[-2, 7]` gives `7`.
/// An empty list gives 0.
pub fn max_diff_to_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if min.abs() > max.abs() {
        min
    } else {
        max
    }
}

fn extremum_of(stations: &[StationResult], field: impl Fn(&StationResult) -> f64) -> f64 {
    let values: Vec<f64> = stations.iter().map(field).collect();
    max_diff_to_zero(&values)
}

/// Blend an undeformed and a deflected point for display
pub fn blend_deflection(undeformed: [f64; 3], deflected: [f64; 3], scale: f64) -> [f64; 3] {
    [
        undeformed[0] + (deflected[0] - undeformed[0]) * scale,
        undeformed[1] + (deflected[1] - undeformed[1]) * scale,
        undeformed[2] + (deflected[2] - undeformed[2]) * scale,
    ]
}

/// Interpret every member and quad of a solved frame
pub fn interpret(
    model: &PreparedModel,
    raw: &RawAnalysis,
    structure: &StructureDefinition,
) -> FormResult<FrameAnalysis> {
    let mut analysis = FrameAnalysis {
        max_deflection: raw.max_translation() / model.length_scale,
        ..FrameAnalysis::default()
    };

    for member in &model.members {
        let raw_member = raw.members.get(&member.edge).ok_or_else(|| {
            FormError::InvalidInput(format!("no solver output for member {}", member.edge))
        })?;
        let material = structure.material(&member.material)?;
        let [i, j] = member.nodes;
        let ends = [model.nodes[i].coords(), model.nodes[j].coords()];
        let result = interpret_member(
            raw_member,
            &member.section,
            material,
            ends,
            model.length_scale,
        )?;
        analysis.members.insert(member.edge, result);
    }

    if !model.backend.is_pin_jointed() {
        for quad in &model.quads {
            let raw_quad = raw.quads.get(&quad.face).ok_or_else(|| {
                FormError::InvalidInput(format!("no solver output for quad {}", quad.face))
            })?;
            let material = structure.material(&quad.material)?;
            analysis
                .quads
                .insert(quad.face, interpret_quad(raw_quad, quad.thickness, material));
        }
    }

    Ok(analysis)
}

/// Station stresses, extrema, buckling and strain energy of one member.
///
/// `ends` are the node positions in model units.
pub fn interpret_member(
    raw: &MemberRaw,
    section: &TubeSection,
    material: &Material,
    ends: [[f64; 3]; 2],
    length_scale: f64,
) -> FormResult<MemberResult> {
    let a = section.area();
    let wy = section.wy();
    let wj = section.wj();
    let length = raw.length;

    let stations: Vec<StationResult> = raw
        .stations
        .iter()
        .enumerate()
        .map(|(k, forces)| {
            let moment = forces.moment_y.hypot(forces.moment_z);
            let sigma = if forces.axial > 0.0 {
                forces.axial / a + moment / wy
            } else {
                forces.axial / a - moment / wy
            };
            let tau_shear = TUBE_SHEAR_FACTOR * forces.shear_y.hypot(forces.shear_z) / a;
            let tau_torsion = forces.torque.abs() / wj;
            let sum_tau = tau_shear + tau_torsion;
            let sigma_v = (sigma * sigma + 3.0 * sum_tau * sum_tau).sqrt();

            let t = if length > 0.0 { forces.x / length } else { 0.0 };
            let offset = raw.deflection.get(k).copied().unwrap_or([0.0; 3]);
            let mut deflected = [0.0; 3];
            for axis in 0..3 {
                let base = ends[0][axis] + (ends[1][axis] - ends[0][axis]) * t;
                deflected[axis] = (base + offset[axis]) / length_scale;
            }

            StationResult {
                forces: *forces,
                moment,
                sigma,
                tau_shear,
                tau_torsion,
                sum_tau,
                sigma_v,
                deflected,
            }
        })
        .collect();

    let segments = stations.len().saturating_sub(1);
    let strain_energy: Vec<f64> = stations
        .iter()
        .take(segments)
        .map(|s| {
            let dl = length / segments as f64;
            let f = &s.forces;
            let normal = f.axial * f.axial * dl / (2.0 * material.e * a);
            let bending = (f.moment_y * f.moment_y + f.moment_z * f.moment_z) * dl
                / (material.e * wy * section.outer);
            normal + bending
        })
        .collect();

    let extrema = MemberExtrema {
        axial: extremum_of(&stations, |s| s.forces.axial),
        shear_y: extremum_of(&stations, |s| s.forces.shear_y),
        shear_z: extremum_of(&stations, |s| s.forces.shear_z),
        torque: extremum_of(&stations, |s| s.forces.torque),
        moment_y: extremum_of(&stations, |s| s.forces.moment_y),
        moment_z: extremum_of(&stations, |s| s.forces.moment_z),
        moment: extremum_of(&stations, |s| s.moment),
        sigma: extremum_of(&stations, |s| s.sigma),
        tau_shear: extremum_of(&stations, |s| s.tau_shear),
        tau_torsion: extremum_of(&stations, |s| s.tau_torsion),
        sum_tau: extremum_of(&stations, |s| s.sum_tau),
        sigma_v: extremum_of(&stations, |s| s.sigma_v),
        strain_energy: max_diff_to_zero(&strain_energy),
    };

    let compressed = stations.first().is_some_and(|s| s.forces.axial < 0.0);
    let (slenderness, allowable, too_slender) = if compressed {
        let lambda = EFFECTIVE_LENGTH_FACTOR * length / section.radius_of_gyration();
        match material.buckling_allowable(lambda)? {
            Some(reduced) => (Some(lambda), reduced, false),
            None => {
                let limit = material
                    .buckling_allowable(SLENDER_LIMIT)?
                    .unwrap_or(material.allowables.sigma);
                (Some(lambda), limit, true)
            }
        }
    } else {
        (None, material.allowables.sigma, false)
    };

    let mut utilization = extrema.sigma.abs() / allowable;
    if too_slender {
        // keeps resizing growing the tube until it leaves the slender range
        if let Some(lambda) = slenderness {
            utilization = utilization.max(lambda / SLENDER_LIMIT);
        }
    }

    let allowables = &material.allowables;
    let overstress = too_slender
        || extrema.sum_tau.abs() > OVERSTRESS_MARGIN * allowables.shear
        || extrema.tau_torsion.abs() > OVERSTRESS_MARGIN * allowables.torsion
        || extrema.sigma_v.abs() > OVERSTRESS_MARGIN * allowables.combined
        || extrema.sigma.abs() > OVERSTRESS_MARGIN * allowable;

    if overstress {
        debug!(
            "member {} overstressed: sigma {:.3}, allowable {:.3}, slenderness {:?}",
            raw.edge, extrema.sigma, allowable, slenderness
        );
    }

    Ok(MemberResult {
        edge: raw.edge,
        length: length / length_scale,
        stations,
        extrema,
        strain_energy,
        slenderness,
        allowable,
        overstress,
        utilization,
    })
}

/// Fibre stresses of a shell from its centre resultants.
///
/// Buckling is not checked for shells.
pub fn interpret_quad(raw: &QuadRaw, thickness: f64, material: &Material) -> QuadResult {
    let r = &raw.resultants;
    let t = thickness;
    let fibre = |side: f64| {
        let sx = r.membrane[0] / t + side * 6.0 * r.moments[0] / (t * t);
        let sy = r.membrane[1] / t + side * 6.0 * r.moments[1] / (t * t);
        let txy = r.membrane[2] / t + side * 6.0 * r.moments[2] / (t * t);
        let sv = (sx * sx - sx * sy + sy * sy + 3.0 * txy * txy).sqrt();
        (sx, sy, txy, sv)
    };
    let top = fibre(1.0);
    let bottom = fibre(-1.0);

    let sigma_x = max_diff_to_zero(&[top.0, bottom.0]);
    let sigma_y = max_diff_to_zero(&[top.1, bottom.1]);
    let tau_xy = max_diff_to_zero(&[top.2, bottom.2]);
    let sigma_v = top.3.max(bottom.3);
    let tau_shear = PLATE_SHEAR_FACTOR * r.shear[0].hypot(r.shear[1]) / t;

    let allowables = &material.allowables;
    let normal = sigma_x.abs().max(sigma_y.abs());
    let overstress = sigma_v > OVERSTRESS_MARGIN * allowables.combined
        || tau_shear > OVERSTRESS_MARGIN * allowables.shear
        || normal > OVERSTRESS_MARGIN * allowables.sigma;

    QuadResult {
        face: raw.face,
        thickness,
        resultants: *r,
        sigma_x,
        sigma_y,
        tau_xy,
        tau_shear,
        sigma_v,
        overstress,
        utilization: normal / allowables.sigma,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::quad::ShellResultants;
    use crate::results::{StationForces, STATIONS};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn uniform_member(length: f64, forces: StationForces) -> MemberRaw {
        MemberRaw {
            edge: 0,
            length,
            stations: (0..STATIONS)
                .map(|i| StationForces {
                    x: length * i as f64 / 10.0,
                    ..forces
                })
                .collect(),
            deflection: vec![[0.0; 3]; STATIONS],
        }
    }

    fn axial(n: f64) -> StationForces {
        StationForces {
            axial: n,
            ..StationForces::default()
        }
    }

    fn run(raw: &MemberRaw) -> MemberResult {
        let ends = [[0.0; 3], [raw.length, 0.0, 0.0]];
        interpret_member(raw, &TubeSection::new(6.0, 5.0), &Material::steel_s235(), ends, 100.0)
            .unwrap()
    }

    #[test]
    fn extremum_keeps_the_sign_of_the_larger_magnitude() {
        assert_eq!(max_diff_to_zero(&[-5.0, 3.0]), -5.0);
        assert_eq!(max_diff_to_zero(&[-2.0, 7.0]), 7.0);
        assert_eq!(max_diff_to_zero(&[1.0, 2.0, 3.0]), 3.0);
        assert_eq!(max_diff_to_zero(&[-1.0, -4.0, -2.0]), -4.0);
        assert_eq!(max_diff_to_zero(&[]), 0.0);
    }

    #[test]
    fn compressed_bar_stress() {
        let result = run(&uniform_member(500.0, axial(-10.0)));
        let a = TubeSection::new(6.0, 5.0).area();
        assert_relative_eq!(result.extrema.sigma, -10.0 / a, epsilon = 1e-12);
        assert_relative_eq!(result.extrema.sigma, -1.157, epsilon = 1e-3);
        assert!(!result.overstress);
        assert!(result.slenderness.is_some());
        assert!(result.allowable < 16.5);
        assert_eq!(result.length, 5.0);
    }

    #[test]
    fn bending_adds_to_tension_and_subtracts_in_compression() {
        let s = TubeSection::new(6.0, 5.0);
        let bent = |n| StationForces {
            axial: n,
            moment_y: 30.0,
            moment_z: 40.0,
            ..StationForces::default()
        };
        let tension = run(&uniform_member(100.0, bent(10.0)));
        assert_relative_eq!(tension.extrema.sigma, 10.0 / s.area() + 50.0 / s.wy(), epsilon = 1e-12);
        let compression = run(&uniform_member(100.0, bent(-10.0)));
        assert_relative_eq!(compression.extrema.sigma, -10.0 / s.area() - 50.0 / s.wy(), epsilon = 1e-12);
    }

    #[test]
    fn stocky_member_uses_nominal_allowable() {
        // λ = 0.5 · 60 / 1.95 ≈ 15
        let result = run(&uniform_member(60.0, axial(-10.0)));
        assert!(result.slenderness.unwrap() <= 20.0);
        assert_eq!(result.allowable, 16.5);
    }

    #[test]
    fn very_slender_member_is_always_overstressed() {
        // λ = 0.5 · 1100 / 1.95 ≈ 282
        let result = run(&uniform_member(1100.0, axial(-0.01)));
        assert!(result.slenderness.unwrap() > 250.0);
        assert!(result.overstress);
        assert!(result.utilization > 1.0);
    }

    #[test]
    fn tension_skips_buckling() {
        let result = run(&uniform_member(1100.0, axial(10.0)));
        assert!(result.slenderness.is_none());
        assert_eq!(result.allowable, 16.5);
        assert!(!result.overstress);
    }

    #[test]
    fn shear_and_torsion_stresses() {
        let s = TubeSection::new(6.0, 5.0);
        let forces = StationForces {
            shear_y: 3.0,
            shear_z: 4.0,
            torque: -20.0,
            ..StationForces::default()
        };
        let result = run(&uniform_member(100.0, forces));
        let tau = 1.333 * 5.0 / s.area();
        let tors = 20.0 / s.wj();
        assert_relative_eq!(result.extrema.tau_shear, tau, epsilon = 1e-12);
        assert_relative_eq!(result.extrema.tau_torsion, tors, epsilon = 1e-12);
        assert_relative_eq!(result.extrema.sum_tau, tau + tors, epsilon = 1e-12);
        assert_relative_eq!(result.extrema.sigma_v, 3f64.sqrt() * (tau + tors), epsilon = 1e-12);
    }

    #[test]
    fn strain_energy_per_segment() {
        let s = TubeSection::new(6.0, 5.0);
        let result = run(&uniform_member(100.0, axial(10.0)));
        assert_eq!(result.strain_energy.len(), 10);
        let expected = 100.0 * 10.0 / (2.0 * 21000.0 * s.area());
        assert_relative_eq!(result.extrema.strain_energy, expected, epsilon = 1e-12);
    }

    #[test]
    fn overstress_uses_the_margin() {
        let s = TubeSection::new(6.0, 5.0);
        // tension at exactly the allowable is not yet overstressed
        let at_limit = run(&uniform_member(100.0, axial(16.5 * s.area())));
        assert!(!at_limit.overstress);
        assert_relative_eq!(at_limit.utilization, 1.0, epsilon = 1e-12);
        let beyond = run(&uniform_member(100.0, axial(1.06 * 16.5 * s.area())));
        assert!(beyond.overstress);
    }

    #[test]
    fn plate_fibre_stresses() {
        let raw = QuadRaw {
            face: 2,
            resultants: ShellResultants {
                membrane: [2.0, 0.0, 0.0],
                moments: [1.0, 0.0, 0.0],
                shear: [0.0, 0.3],
            },
        };
        let q = interpret_quad(&raw, 1.0, &Material::steel_s235());
        assert_relative_eq!(q.sigma_x, 8.0, epsilon = 1e-12);
        assert_relative_eq!(q.sigma_v, 8.0, epsilon = 1e-12);
        assert_relative_eq!(q.tau_shear, 0.45, epsilon = 1e-12);
        assert!(!q.overstress);
    }

    #[test]
    fn deflection_blends_linearly() {
        let p = blend_deflection([0.0, 0.0, 1.0], [0.0, 0.0, 0.5], 10.0);
        assert_eq!(p, [0.0, 0.0, -4.0]);
    }

    proptest! {
        #[test]
        fn extremum_is_a_member_with_maximal_magnitude(values in prop::collection::vec(-1e6f64..1e6, 1..30)) {
            let e = max_diff_to_zero(&values);
            prop_assert!(values.contains(&e));
            for v in &values {
                prop_assert!(e.abs() >= v.abs());
            }
        }

        #[test]
        fn stocky_allowable_ignores_the_curve(lambda in 0.0f64..=20.0) {
            let steel = Material::steel_s235();
            prop_assert_eq!(steel.buckling_allowable(lambda).unwrap(), Some(16.5));
        }
    }
}
