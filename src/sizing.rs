//! Sectional resizing between solves

use log::{debug, warn};

use crate::config::SectionOptimization;
use crate::results::FrameAnalysis;
use crate::structure::{FrameSections, StructureDefinition};

/// Smallest quad thickness a resize may produce (cm)
pub const MIN_THICKNESS: f64 = 0.1;

/// Diameter (or thickness) factor for one element.
///
/// `ratio` is the element's utilization: extremum stress over its buckling-reduced
/// allowable, raised for members beyond the slenderness limit.
pub fn scale_factor(kind: SectionOptimization, ratio: f64, overstress: bool) -> f64 {
    match kind {
        SectionOptimization::None => 1.0,
        SectionOptimization::Simple => {
            if ratio.abs() > 1.0 {
                1.2
            } else {
                0.8
            }
        }
        SectionOptimization::Utilization => ratio.abs().cbrt(),
        SectionOptimization::Complex => {
            let area_factor = if overstress {
                1.0 + (ratio - 1.0) * 0.36
            } else {
                0.5 + 0.6 * ((ratio - 0.5) * 2.4).tanh()
            };
            area_factor.abs().cbrt()
        }
        SectionOptimization::Approximate => {
            if overstress {
                1.05
            } else {
                0.95
            }
        }
    }
}

/// Sections of the next iteration for a solved frame.
///
/// Elements without a result keep their current section.
pub fn resize(
    kind: SectionOptimization,
    analysis: &FrameAnalysis,
    sections: &FrameSections,
    structure: &StructureDefinition,
) -> FrameSections {
    let mut next = sections.clone();
    if kind == SectionOptimization::None {
        return next;
    }

    for (&edge, definition) in &structure.members {
        let Some(result) = analysis.members.get(&edge) else {
            continue;
        };
        let current = sections.member(edge, definition);
        let factor = scale_factor(kind, result.utilization, result.overstress);
        let (resized, clamped) = current.scaled(factor);
        if clamped {
            warn!(
                "member {edge}: inner diameter clamped to the floor, outer {:.3} cm",
                resized.outer
            );
        }
        debug!(
            "member {edge}: utilization {:.3}, factor {factor:.3}, Do {:.3} -> {:.3}",
            result.utilization, current.outer, resized.outer
        );
        next.members.insert(edge, resized);
    }

    for (&face, definition) in &structure.quads {
        let Some(result) = analysis.quads.get(&face) else {
            continue;
        };
        let current = sections.quad(face, definition);
        let factor = scale_factor(kind, result.utilization, result.overstress);
        let mut thickness = current * factor;
        if !thickness.is_finite() || thickness < MIN_THICKNESS {
            warn!("quad {face}: thickness clamped to {MIN_THICKNESS} cm");
            thickness = MIN_THICKNESS;
        }
        next.quads.insert(face, thickness);
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{MemberDefinition, TubeSection, MIN_INNER_DIAMETER};
    use crate::results::{MemberExtrema, MemberResult};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn result(edge: usize, utilization: f64, overstress: bool) -> MemberResult {
        MemberResult {
            edge,
            length: 1.0,
            stations: Vec::new(),
            extrema: MemberExtrema::default(),
            strain_energy: Vec::new(),
            slenderness: None,
            allowable: 16.5,
            overstress,
            utilization,
        }
    }

    fn one_member(section: TubeSection) -> StructureDefinition {
        let mut structure = StructureDefinition::new();
        structure.add_member(0, MemberDefinition::new(section, "steel_S235"));
        structure
    }

    #[test]
    fn simple_scales_overloaded_members_up() {
        let structure = one_member(TubeSection::new(6.0, 5.0));
        let mut analysis = FrameAnalysis::default();
        analysis.members.insert(0, result(0, 1.5, true));

        let sections = FrameSections::initial(&structure);
        let next = resize(SectionOptimization::Simple, &analysis, &sections, &structure);
        assert_relative_eq!(next.members[&0].outer, 7.2, epsilon = 1e-12);
        assert_relative_eq!(next.members[&0].inner, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn simple_shrinks_underused_members() {
        assert_eq!(scale_factor(SectionOptimization::Simple, 0.4, false), 0.8);
        assert_eq!(scale_factor(SectionOptimization::Simple, 1.0, false), 0.8);
    }

    #[test]
    fn utilization_takes_the_cube_root() {
        assert_relative_eq!(
            scale_factor(SectionOptimization::Utilization, 8.0, true),
            2.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            scale_factor(SectionOptimization::Utilization, 0.125, false),
            0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn complex_damps_the_area_change() {
        // overstressed: a = 1 + 1 · 0.36
        assert_relative_eq!(
            scale_factor(SectionOptimization::Complex, 2.0, true),
            1.36f64.cbrt(),
            epsilon = 1e-12
        );
        // at half utilization the area factor is 0.5
        assert_relative_eq!(
            scale_factor(SectionOptimization::Complex, 0.5, false),
            0.5f64.cbrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn approximate_nudges_by_five_percent() {
        assert_eq!(scale_factor(SectionOptimization::Approximate, 3.0, true), 1.05);
        assert_eq!(scale_factor(SectionOptimization::Approximate, 3.0, false), 0.95);
    }

    #[test]
    fn none_keeps_sections() {
        let structure = one_member(TubeSection::new(6.0, 5.0));
        let mut analysis = FrameAnalysis::default();
        analysis.members.insert(0, result(0, 9.0, true));
        let sections = FrameSections::initial(&structure);
        assert_eq!(
            resize(SectionOptimization::None, &analysis, &sections, &structure),
            sections
        );
    }

    #[test]
    fn quad_thickness_has_a_floor() {
        let mut structure = StructureDefinition::new();
        structure.add_quad(3, crate::elements::QuadDefinition::new(0.11, "steel_S235"));
        let mut analysis = FrameAnalysis::default();
        analysis.quads.insert(
            3,
            crate::results::QuadResult {
                face: 3,
                thickness: 0.11,
                resultants: Default::default(),
                sigma_x: 0.0,
                sigma_y: 0.0,
                tau_xy: 0.0,
                tau_shear: 0.0,
                sigma_v: 0.0,
                overstress: false,
                utilization: 0.0,
            },
        );
        let sections = FrameSections::initial(&structure);
        let next = resize(SectionOptimization::Simple, &analysis, &sections, &structure);
        assert_eq!(next.quads[&3], MIN_THICKNESS);
    }

    proptest! {
        #[test]
        fn repeated_resizing_keeps_a_valid_tube(
            utilizations in prop::collection::vec(0.0f64..5.0, 1..20),
            outer in 1.0f64..20.0,
            wall in 0.05f64..0.9,
        ) {
            let section = TubeSection::new(outer, outer * (1.0 - wall));
            let structure = one_member(section);
            let mut sections = FrameSections::initial(&structure);
            for u in utilizations {
                let before = sections.members[&0];
                let mut analysis = FrameAnalysis::default();
                analysis.members.insert(0, result(0, u, u > 1.05));
                sections = resize(SectionOptimization::Utilization, &analysis, &sections, &structure);
                let after = sections.members[&0];
                prop_assert!(after.inner >= MIN_INNER_DIAMETER - 1e-12);
                prop_assert!(after.inner < after.outer);
                prop_assert!(
                    (after.outer / after.inner - before.outer / before.inner).abs() < 1e-9
                );
            }
        }
    }
}
