//! Run context: every frame, individual and generation of one optimization run

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};
use crate::fitness::RawFitness;
use crate::results::FrameAnalysis;
use crate::structure::FrameSections;
use crate::translator::GeometryMetrics;

/// Identifier of one evaluation slot, unique within a run
pub type FrameId = u64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum FrameStatus {
    Pending,
    Solved,
    Failed(String),
}

/// One structural evaluation.
///
/// `analysis` is only set once the frame's model has been solved and interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: FrameId,
    pub chromosome: Vec<f64>,
    /// Sections after the last resize
    pub sections: FrameSections,
    pub metrics: GeometryMetrics,
    pub analysis: Option<FrameAnalysis>,
    pub status: FrameStatus,
}

impl Frame {
    pub fn new(id: FrameId, chromosome: Vec<f64>, sections: FrameSections) -> Self {
        Self {
            id,
            chromosome,
            sections,
            metrics: GeometryMetrics::default(),
            analysis: None,
            status: FrameStatus::Pending,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FrameStatus::Failed(_))
    }
}

/// Scored candidate, one per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub frame: FrameId,
    pub chromosome: Vec<f64>,
    /// Zero, one or two parent frames
    pub parents: Vec<FrameId>,
    pub raw: RawFitness,
    /// Lower is better, the basis scores exactly 1. Invalid individuals score infinity,
    /// written as `null` in JSON.
    #[serde(with = "fitness_value")]
    pub weighted_fitness: f64,
    pub valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub index: usize,
    pub individuals: BTreeMap<FrameId, Individual>,
}

impl Generation {
    /// Valid individuals first, by ascending fitness then id
    pub fn ranked(&self) -> Vec<&Individual> {
        let mut ranked: Vec<&Individual> = self.individuals.values().collect();
        ranked.sort_by(|a, b| {
            b.valid
                .cmp(&a.valid)
                .then(a.weighted_fitness.total_cmp(&b.weighted_fitness))
                .then(a.frame.cmp(&b.frame))
        });
        ranked
    }
}

/// All state of one run, owned by the driver.
///
/// Workers never touch it; the driver writes it after each batch returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub frames: BTreeMap<FrameId, Frame>,
    pub individuals: BTreeMap<FrameId, Individual>,
    pub generations: Vec<Generation>,
    pub basis: Option<FrameId>,
    next_frame: FrameId,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next frame id
    pub fn allocate(&mut self) -> FrameId {
        let id = self.next_frame;
        self.next_frame += 1;
        id
    }

    pub fn frame(&self, id: FrameId) -> FormResult<&Frame> {
        self.frames.get(&id).ok_or(FormError::FrameNotFound(id))
    }

    pub fn individual(&self, id: FrameId) -> FormResult<&Individual> {
        self.individuals.get(&id).ok_or(FormError::FrameNotFound(id))
    }

    pub fn basis_individual(&self) -> FormResult<&Individual> {
        let id = self.basis.ok_or(FormError::MissingBasis)?;
        self.individual(id)
    }

    /// Best valid individual over the whole run
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .values()
            .filter(|i| i.valid)
            .min_by(|a, b| {
                a.weighted_fitness
                    .total_cmp(&b.weighted_fitness)
                    .then(a.frame.cmp(&b.frame))
            })
    }

    /// Record a generation made of already scored frames
    pub fn push_generation(&mut self, ids: &[FrameId]) -> FormResult<&Generation> {
        let individuals = ids
            .iter()
            .map(|&id| self.individual(id).map(|i| (id, i.clone())))
            .collect::<FormResult<BTreeMap<_, _>>>()?;
        let index = self.generations.len();
        self.generations.push(Generation { index, individuals });
        Ok(&self.generations[index])
    }

    pub fn latest_generation(&self) -> Option<&Generation> {
        self.generations.last()
    }

    pub fn to_json(&self) -> FormResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> FormResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Serde adapter for fitness values: non-finite scores travel as `null` and come back as
/// `f64::INFINITY`, the worst possible score
pub(crate) mod fitness_value {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        value.is_finite().then_some(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
