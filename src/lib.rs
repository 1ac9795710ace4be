//! Form Finder - structural form finding for parametric tube and shell structures
//!
//! A base mesh is morphed by a chromosome of shape genes. Each candidate shape is turned
//! into a structural model, solved in parallel, checked for stresses and buckling,
//! optionally resized, and scored against the undeformed basis. Search engines use
//! those scores to propose the next candidates:
//! - Genetic algorithm (generational, elitist)
//! - Finite-difference gradient descent
//! - Bayesian optimization with a Gaussian-process surrogate
//!
//! Solver backends:
//! - First-order frame analysis with stability and statics checks
//! - Linearized first-order frame analysis
//! - Second-order (P-Delta) frame analysis
//! - Pin-jointed force distribution
//!
//! ## Example
//! ```rust,no_run
//! use form_finder::prelude::*;
//!
//! // a 10 m span with one gene lifting the crown by 3 m
//! let mesh = Mesh::new(
//!     vec![[0.0, 0.0, 0.0], [5.0, 0.0, 1.0], [10.0, 0.0, 0.0]],
//!     vec![[0, 1], [1, 2]],
//!     vec![],
//! );
//! let shape = ShapeKeyMesh::new(mesh)
//!     .with_key("crown", vec![[0.0, 0.0, 0.0], [5.0, 0.0, 4.0], [10.0, 0.0, 0.0]]);
//!
//! let mut structure = StructureDefinition::new();
//! for edge in 0..2 {
//!     structure.add_member(edge, MemberDefinition::new(TubeSection::new(10.0, 9.0), "steel_S235"));
//! }
//! structure.add_support(0, Support::pinned());
//! structure.add_support(2, Support::pinned());
//! structure.add_load(LoadDefinition::Vertex(VertexLoad::force(1, 0.0, 0.0, -20.0)));
//!
//! let config = RunConfig::default();
//! let mut evaluator = Evaluator::new(shape, structure, &config).unwrap();
//! let report = search(&mut evaluator, &config, &CancelToken::new()).unwrap();
//! println!("best frame {:?} scored {:.3}", report.best, report.best_fitness);
//! ```

pub mod config;
pub mod elements;
pub mod error;
pub mod executor;
pub mod fitness;
pub mod geometry;
pub mod interpret;
pub mod loads;
pub mod math;
pub mod model;
pub mod pipeline;
pub mod results;
pub mod run;
pub mod search;
pub mod sizing;
pub mod solver;
pub mod structure;
pub mod translator;

// Re-export common types
pub mod prelude {
    pub use crate::config::{
        AnalysisOptions, BayesianConfig, CalculationType, Criterion, Crossover,
        EvaluationSettings, FitnessWeights, GeneDomain, GeneticConfig, GradientConfig, Problem,
        RunConfig, SearchKind, SectionOptimization,
    };
    pub use crate::elements::{
        Material, MemberDefinition, QuadDefinition, Support, TubeSection,
    };
    pub use crate::error::{FormError, FormResult};
    pub use crate::executor::{BatchOutcome, CancelToken, Executor};
    pub use crate::fitness::RawFitness;
    pub use crate::geometry::{Mesh, ShapeKeyMesh, ShapeSource};
    pub use crate::loads::{FaceLoad, LineLoad, LoadDefinition, VertexLoad};
    pub use crate::pipeline::{Evaluator, Proposal};
    pub use crate::results::{FrameAnalysis, MemberResult, QuadResult};
    pub use crate::run::{Frame, FrameId, FrameStatus, Generation, Individual, RunContext};
    pub use crate::search::{search, SearchEngine, SearchReport, StopReason};
    pub use crate::structure::{FrameSections, StructureDefinition};
}
