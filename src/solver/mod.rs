//! Solver backends
//!
//! The backend is chosen once, when a frame is translated into a [`PreparedModel`], and
//! travels with the model to the worker that solves it.

mod force_distribution;
mod frame;

use serde::{Deserialize, Serialize};

use crate::error::FormResult;
use crate::model::PreparedModel;
use crate::results::RawAnalysis;

pub use force_distribution::ForceDistributionSolver;
pub use frame::FrameSolver;

/// One solve capability per backend
pub trait StructuralSolver {
    fn solve(&self, model: &PreparedModel) -> FormResult<RawAnalysis>;
}

/// Analysis mode of the frame backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameMode {
    /// Linear solve with stability and statics checks
    FirstOrder,
    /// Linear solve without checks
    FirstOrderLinear,
    /// P-Delta iteration with geometric stiffness
    SecondOrder,
}

/// Tagged solver choice stored in every prepared model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    /// 6-DOF direct stiffness analysis of members and quads
    Frame(FrameMode),
    /// Pin-jointed axial force distribution
    ForceDistribution,
}

impl SolverBackend {
    pub fn solve(&self, model: &PreparedModel) -> FormResult<RawAnalysis> {
        match *self {
            Self::Frame(mode) => FrameSolver::new(mode).solve(model),
            Self::ForceDistribution => ForceDistributionSolver.solve(model),
        }
    }

    pub fn is_pin_jointed(&self) -> bool {
        matches!(self, Self::ForceDistribution)
    }
}

/// Solve a model with the backend it was prepared for
pub fn solve(model: &PreparedModel) -> FormResult<RawAnalysis> {
    model.backend.solve(model)
}
