//! Solver-ready structural model of one frame

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisOptions;
use crate::elements::{Member, Node, Quad, Support};
use crate::loads::NodeLoad;
use crate::solver::SolverBackend;

/// Nodes, elements, supports and loads in model units (cm, kN).
///
/// Element node references are indices into `nodes`. The model is immutable once
/// translated and is what the executor hands to the workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedModel {
    pub nodes: Vec<Node>,
    /// Supports by node index
    pub supports: BTreeMap<usize, Support>,
    pub members: Vec<Member>,
    pub quads: Vec<Quad>,
    pub node_loads: Vec<NodeLoad>,
    pub backend: SolverBackend,
    pub options: AnalysisOptions,
    /// Model units per mesh unit
    pub length_scale: f64,
}

impl PreparedModel {
    pub fn new(backend: SolverBackend, options: AnalysisOptions, length_scale: f64) -> Self {
        Self {
            nodes: Vec::new(),
            supports: BTreeMap::new(),
            members: Vec::new(),
            quads: Vec::new(),
            node_loads: Vec::new(),
            backend,
            options,
            length_scale,
        }
    }

    /// Total number of DOFs, six per node
    pub fn dof_count(&self) -> usize {
        self.nodes.len() * 6
    }

    /// Restraint flag for every global DOF
    pub fn restrained_dofs(&self) -> Vec<bool> {
        let mut restrained = vec![false; self.dof_count()];
        for (&node, support) in &self.supports {
            for (k, &fixed) in support.dofs().iter().enumerate() {
                restrained[node * 6 + k] = fixed;
            }
        }
        restrained
    }

    /// Node index of a source vertex
    pub fn node_of_vertex(&self, vertex: usize) -> Option<usize> {
        self.nodes.iter().position(|n| n.vertex == vertex)
    }
}
