//! Structural elements and the section library

mod material;
mod member;
mod node;
mod quad;
mod section;
mod support;

pub use material::{
    Allowables, BucklingCurve, Material, BUCKLING_FIT_DEGREE, SLENDER_LIMIT, STOCKY_LIMIT,
};
pub use member::{Member, MemberDefinition};
pub use node::Node;
pub use quad::{Quad, QuadDefinition};
pub use section::{SectionProperties, TubeSection, MIN_INNER_DIAMETER};
pub use support::Support;
