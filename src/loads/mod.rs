//! Load definitions and their prepared forms

mod face_load;
mod line_load;
mod node_load;

use serde::{Deserialize, Serialize};

pub use face_load::{split_by_perimeter, FaceLoad};
pub use line_load::{LineLoad, LoadAxes, MemberLoad};
pub use node_load::{NodeLoad, VertexLoad};

/// A load attached to a vertex, a member edge or a face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadDefinition {
    Vertex(VertexLoad),
    Line(LineLoad),
    Face(FaceLoad),
}
