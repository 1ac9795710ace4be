//! Translation of a deformed mesh into a solver-ready model plus geometric metrics

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::EvaluationSettings;
use crate::elements::{Member, Node, Quad};
use crate::error::{FormError, FormResult};
use crate::geometry::{self, Mesh};
use crate::loads::{split_by_perimeter, LoadDefinition, MemberLoad, NodeLoad};
use crate::math::Vec3;
use crate::model::PreparedModel;
use crate::structure::{FrameSections, StructureDefinition};

/// Solver-independent metrics of one frame.
///
/// Lengths, areas and volumes are in mesh units, weight in kN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryMetrics {
    pub volume: f64,
    pub area: f64,
    pub member_length: f64,
    pub weight: f64,
    pub rise: f64,
    /// Largest distance between two supports
    pub span: f64,
    /// Largest distance from any vertex to its nearest support
    pub cantilever: f64,
}

/// Output of one translation
#[derive(Debug, Clone)]
pub struct Translation {
    /// `None` for geometry-only evaluation
    pub model: Option<PreparedModel>,
    pub metrics: GeometryMetrics,
}

/// Build the structural model and metrics of one deformed mesh
pub fn translate(
    mesh: &Mesh,
    structure: &StructureDefinition,
    sections: &FrameSections,
    settings: &EvaluationSettings,
) -> FormResult<Translation> {
    mesh.validate()?;
    let positions = mesh.world_positions();
    let metrics = measure(mesh, &positions, structure, sections, settings.length_scale)?;

    let model = match settings.calculation.backend() {
        None => None,
        Some(backend) => {
            let mut model =
                PreparedModel::new(backend, settings.analysis.clone(), settings.length_scale);
            build_model(&mut model, mesh, &positions, structure, sections, settings)?;
            debug!(
                "translated {} nodes, {} members, {} quads",
                model.nodes.len(),
                model.members.len(),
                model.quads.len()
            );
            Some(model)
        }
    };

    Ok(Translation { model, metrics })
}

fn build_model(
    model: &mut PreparedModel,
    mesh: &Mesh,
    positions: &[Vec3],
    structure: &StructureDefinition,
    sections: &FrameSections,
    settings: &EvaluationSettings,
) -> FormResult<()> {
    let scale = settings.length_scale;

    // nodes for every vertex carrying an element, in vertex order
    let mut used = BTreeSet::new();
    for &edge in structure.members.keys() {
        used.extend(mesh.edge(edge)?);
    }
    for &face in structure.quads.keys() {
        used.extend(mesh.face(face)?.iter().copied());
    }
    let mut node_of = BTreeMap::new();
    for vertex in used {
        let p = positions
            .get(vertex)
            .ok_or(FormError::VertexNotFound(vertex))?;
        node_of.insert(vertex, model.nodes.len());
        model
            .nodes
            .push(Node::new(vertex, [p.x * scale, p.y * scale, p.z * scale]));
    }

    for (vertex, support) in structure.active_supports() {
        match node_of.get(&vertex) {
            Some(&node) => {
                model.supports.insert(node, *support);
            }
            None => warn!("support on vertex {vertex} without elements is ignored"),
        }
    }

    let mut member_index = BTreeMap::new();
    for (&edge, definition) in &structure.members {
        let [a, b] = mesh.edge(edge)?;
        let material = structure.material(&definition.material)?;
        let section = sections.member(edge, definition);
        section.validate()?;

        let mut loads = Vec::new();
        if settings.self_weight {
            loads.push(MemberLoad::self_weight(section.weight_per_length(material.density)));
        }
        member_index.insert(edge, model.members.len());
        model.members.push(Member {
            edge,
            nodes: [node_of[&a], node_of[&b]],
            material: definition.material.clone(),
            e: material.e,
            g: material.g,
            section,
            loads,
        });
    }

    for (&face, definition) in &structure.quads {
        let corners = mesh.face(face)?;
        if corners.len() != 4 {
            return Err(FormError::InvalidGeometry(format!(
                "quad on face {face} has {} corners",
                corners.len()
            )));
        }
        let material = structure.material(&definition.material)?;
        let thickness = sections.quad(face, definition);
        let nodes = [
            node_of[&corners[0]],
            node_of[&corners[1]],
            node_of[&corners[2]],
            node_of[&corners[3]],
        ];
        if settings.self_weight {
            let area = geometry::face_area(positions, corners) * scale * scale;
            let share = area * thickness * material.density / 4.0;
            for &node in &nodes {
                model.node_loads.push(NodeLoad::force(node, [0.0, 0.0, -share]));
            }
        }
        model.quads.push(Quad {
            face,
            nodes,
            material: definition.material.clone(),
            e: material.e,
            nu: material.poisson(),
            thickness,
        });
    }

    let lookup = mesh.edge_lookup();
    for load in &structure.loads {
        match load {
            LoadDefinition::Vertex(vertex_load) => match node_of.get(&vertex_load.vertex) {
                Some(&node) => model
                    .node_loads
                    .push(NodeLoad::new(node, vertex_load.as_array())),
                None => warn!(
                    "load on vertex {} without elements is ignored",
                    vertex_load.vertex
                ),
            },
            LoadDefinition::Line(line) => match member_index.get(&line.edge) {
                Some(&index) => model.members[index].loads.push(MemberLoad {
                    w: [line.wx / scale, line.wy / scale, line.wz / scale],
                    axes: line.axes,
                }),
                None => warn!("line load on edge {} without a member is ignored", line.edge),
            },
            LoadDefinition::Face(face_load) => {
                let face = mesh.face(face_load.face)?;
                let resultant = face_load.resultant(
                    geometry::face_area(positions, face),
                    geometry::projected_area(positions, face),
                    &geometry::face_normal(positions, face),
                );

                if structure.quads.contains_key(&face_load.face) {
                    let share = resultant / 4.0;
                    for vertex in face {
                        model
                            .node_loads
                            .push(NodeLoad::force(node_of[vertex], share.into()));
                    }
                    continue;
                }

                let edges: Vec<(usize, f64)> = mesh
                    .face_edges(face_load.face, &lookup)?
                    .into_iter()
                    .filter(|edge| member_index.contains_key(edge))
                    .map(|edge| {
                        let length = mesh
                            .edge(edge)
                            .map(|e| geometry::edge_length(positions, e))
                            .unwrap_or(0.0);
                        (edge, length)
                    })
                    .collect();
                match split_by_perimeter(&resultant, &edges) {
                    Some(parts) => {
                        for (edge, intensity) in parts {
                            let w = intensity / scale;
                            model.members[member_index[&edge]]
                                .loads
                                .push(MemberLoad::global([w.x, w.y, w.z]));
                        }
                    }
                    None => warn!(
                        "face {} has no member perimeter, its load is skipped",
                        face_load.face
                    ),
                }
            }
        }
    }

    Ok(())
}

fn measure(
    mesh: &Mesh,
    positions: &[Vec3],
    structure: &StructureDefinition,
    sections: &FrameSections,
    scale: f64,
) -> FormResult<GeometryMetrics> {
    let mut member_length = 0.0;
    let mut weight = 0.0;
    for (&edge, definition) in &structure.members {
        let length = geometry::edge_length(positions, mesh.edge(edge)?);
        let material = structure.material(&definition.material)?;
        member_length += length;
        weight += sections.member(edge, definition).area() * material.density * length * scale;
    }
    for (&face, definition) in &structure.quads {
        let area = geometry::face_area(positions, mesh.face(face)?) * scale * scale;
        let material = structure.material(&definition.material)?;
        weight += area * sections.quad(face, definition) * material.density;
    }

    let (low, high) = positions
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.z), hi.max(p.z))
        });
    let rise = if positions.is_empty() { 0.0 } else { high - low };

    let supports: Vec<Vec3> = structure
        .active_supports()
        .filter_map(|(vertex, _)| positions.get(vertex).copied())
        .collect();

    let mut span = 0.0_f64;
    for (i, a) in supports.iter().enumerate() {
        for b in &supports[i + 1..] {
            span = span.max((b - a).norm());
        }
    }

    let cantilever = if supports.is_empty() {
        0.0
    } else {
        positions
            .iter()
            .map(|p| {
                supports
                    .iter()
                    .map(|s| (p - s).norm())
                    .fold(f64::INFINITY, f64::min)
            })
            .fold(0.0, f64::max)
    };

    Ok(GeometryMetrics {
        volume: geometry::volume(positions, &mesh.faces),
        area: geometry::total_area(positions, &mesh.faces),
        member_length,
        weight,
        rise,
        span,
        cantilever,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalculationType;
    use crate::elements::{MemberDefinition, QuadDefinition, Support, TubeSection};
    use crate::loads::{FaceLoad, LineLoad, VertexLoad};
    use approx::assert_relative_eq;

    /// Square of four members around one face, supported at two corners
    fn square() -> (Mesh, StructureDefinition) {
        let mesh = Mesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [2.0, 2.0, 1.0],
                [0.0, 2.0, 1.0],
            ],
            vec![[0, 1], [1, 2], [2, 3], [3, 0]],
            vec![vec![0, 1, 2, 3]],
        );
        let mut structure = StructureDefinition::new();
        for edge in 0..4 {
            structure.add_member(edge, MemberDefinition::new(TubeSection::new(6.0, 5.0), "steel_S235"));
        }
        structure.add_support(0, Support::fixed());
        structure.add_support(1, Support::fixed());
        (mesh, structure)
    }

    fn run(mesh: &Mesh, structure: &StructureDefinition, settings: &EvaluationSettings) -> Translation {
        translate(mesh, structure, &FrameSections::initial(structure), settings).unwrap()
    }

    #[test]
    fn nodes_are_scaled_to_model_units() {
        let (mesh, structure) = square();
        let t = run(&mesh, &structure, &EvaluationSettings::default());
        let model = t.model.unwrap();
        assert_eq!(model.nodes.len(), 4);
        assert_eq!(model.nodes[2].coords(), [200.0, 200.0, 100.0]);
        assert_eq!(model.supports.len(), 2);
        assert_eq!(model.members.len(), 4);
    }

    #[test]
    fn self_weight_follows_the_section() {
        let (mesh, structure) = square();
        let model = run(&mesh, &structure, &EvaluationSettings::default()).model.unwrap();
        let expected = TubeSection::new(6.0, 5.0).area() * 7.85e-5;
        assert_relative_eq!(model.members[0].loads[0].w[2], -expected, epsilon = 1e-15);

        let bare = run(&mesh, &structure, &EvaluationSettings::default().without_self_weight());
        assert!(bare.model.unwrap().members.iter().all(|m| m.loads.is_empty()));
    }

    #[test]
    fn geometric_metrics() {
        let (mesh, structure) = square();
        let m = run(&mesh, &structure, &EvaluationSettings::default()).metrics;
        let slope = 5f64.sqrt();
        assert_relative_eq!(m.rise, 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.span, 2.0, epsilon = 1e-12);
        // vertex 2 is the farthest from both supports
        assert_relative_eq!(m.cantilever, slope, epsilon = 1e-12);
        assert_relative_eq!(m.member_length, 4.0 + 2.0 * slope, epsilon = 1e-12);
        assert_relative_eq!(m.area, 2.0 * slope, epsilon = 1e-12);
        let a = TubeSection::new(6.0, 5.0).area();
        assert_relative_eq!(m.weight, a * 7.85e-5 * m.member_length * 100.0, epsilon = 1e-12);
    }

    #[test]
    fn no_supports_degrade_span_and_cantilever_to_zero() {
        let (mesh, mut structure) = square();
        structure.supports.clear();
        let m = run(&mesh, &structure, &EvaluationSettings::default()).metrics;
        assert_eq!(m.span, 0.0);
        assert_eq!(m.cantilever, 0.0);
    }

    #[test]
    fn geometrical_mode_builds_no_model() {
        let (mesh, structure) = square();
        let settings = EvaluationSettings::default().with_calculation(CalculationType::Geometrical);
        assert!(run(&mesh, &structure, &settings).model.is_none());
    }

    #[test]
    fn face_load_is_spread_over_the_perimeter() {
        let (mesh, mut structure) = square();
        structure.add_load(LoadDefinition::Face(FaceLoad {
            face: 0,
            normal: 0.0,
            projected: -1.5,
            area_z: 0.0,
        }));
        let settings = EvaluationSettings::default().without_self_weight();
        let model = run(&mesh, &structure, &settings).model.unwrap();

        // projected area 4 m² at 1.5 kN/m² = 6 kN over a perimeter of 4 + 2√5 m
        let total: f64 = model
            .members
            .iter()
            .map(|m| {
                let [i, j] = m.nodes;
                m.loads[0].w[2] * model.nodes[i].distance_to(&model.nodes[j])
            })
            .sum();
        assert_relative_eq!(total, -6.0, epsilon = 1e-9);
    }

    #[test]
    fn face_load_on_a_quad_goes_to_its_corners() {
        let (mesh, mut structure) = square();
        structure.members.clear();
        structure.add_quad(0, QuadDefinition::new(1.0, "steel_S235"));
        structure.add_load(LoadDefinition::Face(FaceLoad {
            face: 0,
            normal: 0.0,
            projected: 0.0,
            area_z: -2.0,
        }));
        let settings = EvaluationSettings::default().without_self_weight();
        let model = run(&mesh, &structure, &settings).model.unwrap();
        assert_eq!(model.node_loads.len(), 4);
        let total: f64 = model.node_loads.iter().map(|l| l.values[2]).sum();
        assert_relative_eq!(total, -2.0 * 2.0 * 5f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn line_and_vertex_loads_are_converted() {
        let (mesh, mut structure) = square();
        structure.add_load(LoadDefinition::Line(LineLoad::global(0, 0.0, 0.0, -3.0)));
        structure.add_load(LoadDefinition::Vertex(VertexLoad::force(2, 1.0, 0.0, 0.0)));
        // not part of the model
        structure.add_load(LoadDefinition::Line(LineLoad::global(9, 0.0, 0.0, -3.0)));
        let settings = EvaluationSettings::default().without_self_weight();
        let model = run(&mesh, &structure, &settings).model.unwrap();
        assert_relative_eq!(model.members[0].loads[0].w[2], -0.03, epsilon = 1e-15);
        assert_eq!(model.node_loads.len(), 1);
        assert_eq!(model.node_loads[0].values[0], 1.0);
    }
}
