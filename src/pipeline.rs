//! Candidate evaluation: deform, translate, solve, interpret, resize and score

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::config::{EvaluationSettings, FitnessWeights, Problem, RunConfig, SectionOptimization};
use crate::error::{FormError, FormResult};
use crate::executor::Executor;
use crate::fitness::{weighted_fitness, RawFitness};
use crate::geometry::{Mesh, ShapeSource};
use crate::interpret::interpret;
use crate::model::PreparedModel;
use crate::run::{Frame, FrameId, FrameStatus, Individual, RunContext};
use crate::sizing::resize;
use crate::structure::{FrameSections, StructureDefinition};
use crate::translator::translate;

/// A chromosome a search engine wants evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    pub chromosome: Vec<f64>,
    pub parents: Vec<FrameId>,
}

impl Proposal {
    pub fn new(chromosome: Vec<f64>) -> Self {
        Self {
            chromosome,
            parents: Vec::new(),
        }
    }

    pub fn with_parents(mut self, parents: Vec<FrameId>) -> Self {
        self.parents = parents;
        self
    }
}

/// Owns the run context and turns proposals into scored individuals
pub struct Evaluator {
    shape: Box<dyn ShapeSource>,
    structure: StructureDefinition,
    settings: EvaluationSettings,
    weights: FitnessWeights,
    executor: Executor,
    run: RunContext,
}

impl Evaluator {
    pub fn new(
        shape: impl ShapeSource + 'static,
        structure: StructureDefinition,
        config: &RunConfig,
    ) -> FormResult<Self> {
        config.validate()?;
        shape.validate()?;
        structure.validate(&shape.deform(&vec![0.0; shape.gene_count()])?)?;
        Ok(Self {
            shape: Box::new(shape),
            structure,
            settings: config.evaluation.clone(),
            weights: config.fitness.clone(),
            executor: Executor::new(config.evaluation.workers)?,
            run: RunContext::new(),
        })
    }

    pub fn from_problem(problem: Problem) -> FormResult<Self> {
        problem.validate()?;
        Self::new(problem.shape, problem.structure, &problem.config)
    }

    pub fn gene_count(&self) -> usize {
        self.shape.gene_count()
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    pub fn run_mut(&mut self) -> &mut RunContext {
        &mut self.run
    }

    pub fn into_run(self) -> RunContext {
        self.run
    }

    /// Evaluate the all-zero chromosome and make it the fitness reference.
    ///
    /// Must succeed before any other evaluation.
    pub fn evaluate_basis(&mut self) -> FormResult<FrameId> {
        if let Some(id) = self.run.basis {
            return Ok(id);
        }
        let id = self.evaluate_frames(vec![Proposal::new(vec![0.0; self.gene_count()])])?[0];
        let frame = self.run.frame(id)?;
        if let FrameStatus::Failed(reason) = &frame.status {
            return Err(FormError::BasisFailed(id, reason.clone()));
        }
        let raw = RawFitness::new(&frame.metrics, frame.analysis.as_ref());
        let chromosome = frame.chromosome.clone();

        self.run.individuals.insert(
            id,
            Individual {
                frame: id,
                chromosome,
                parents: Vec::new(),
                raw,
                weighted_fitness: 1.0,
                valid: true,
            },
        );
        self.run.basis = Some(id);
        info!("basis frame {id} evaluated");
        Ok(id)
    }

    /// Evaluate and score a batch, returning frame ids in proposal order
    pub fn evaluate_batch(&mut self, proposals: Vec<Proposal>) -> FormResult<Vec<FrameId>> {
        let basis = self.run.basis_individual()?.raw;
        let ids = self.evaluate_frames(proposals.clone())?;

        for (&id, proposal) in ids.iter().zip(proposals) {
            let frame = self.run.frame(id)?;
            let raw = RawFitness::new(&frame.metrics, frame.analysis.as_ref());
            let valid = !frame.is_failed();
            let weighted = if valid {
                weighted_fitness(&raw, &basis, &self.weights)
            } else {
                f64::INFINITY
            };
            debug!("frame {id}: fitness {weighted:.4}");
            self.run.individuals.insert(
                id,
                Individual {
                    frame: id,
                    chromosome: proposal.chromosome,
                    parents: proposal.parents,
                    raw,
                    weighted_fitness: weighted,
                    valid,
                },
            );
        }
        Ok(ids)
    }

    /// Evaluate one chromosome
    pub fn evaluate(&mut self, chromosome: Vec<f64>) -> FormResult<&Individual> {
        let ids = self.evaluate_batch(vec![Proposal::new(chromosome)])?;
        self.run.individual(ids[0])
    }

    /// Materialize and solve a batch of frames without scoring them
    fn evaluate_frames(&mut self, proposals: Vec<Proposal>) -> FormResult<Vec<FrameId>> {
        let expected = self.gene_count();
        if let Some(p) = proposals.iter().find(|p| p.chromosome.len() != expected) {
            return Err(FormError::ChromosomeLength {
                expected,
                actual: p.chromosome.len(),
            });
        }

        let initial = FrameSections::initial(&self.structure);
        let mut ids = Vec::with_capacity(proposals.len());
        let mut meshes: BTreeMap<FrameId, Mesh> = BTreeMap::new();
        let mut frames: BTreeMap<FrameId, Frame> = BTreeMap::new();

        for proposal in proposals {
            let id = self.run.allocate();
            ids.push(id);
            let mut frame = Frame::new(id, proposal.chromosome, initial.clone());
            match self.shape.deform(&frame.chromosome) {
                Ok(mesh) => {
                    meshes.insert(id, mesh);
                }
                Err(e) => frame.status = FrameStatus::Failed(e.to_string()),
            }
            frames.insert(id, frame);
        }

        let mut models = self.translate_all(&meshes, &mut frames);
        self.solve_and_interpret(&mut models, &mut frames);

        let kind = self.settings.optimization;
        if kind != SectionOptimization::None && self.settings.calculation.backend().is_some() {
            for iteration in 0..self.settings.optimization_iterations {
                let resized: Vec<FrameId> = frames
                    .values_mut()
                    .filter(|f| !f.is_failed())
                    .filter_map(|f| {
                        let analysis = f.analysis.as_ref()?;
                        f.sections = resize(kind, analysis, &f.sections, &self.structure);
                        Some(f.id)
                    })
                    .collect();
                debug!("sizing iteration {} resized {} frame(s)", iteration + 1, resized.len());
                meshes.retain(|id, _| resized.contains(id));
                models = self.translate_all(&meshes, &mut frames);
                self.solve_and_interpret(&mut models, &mut frames);
            }
        }

        let failed = frames.values().filter(|f| f.is_failed()).count();
        info!("evaluated {} frame(s), {failed} failed", frames.len());
        self.run.frames.extend(frames);
        Ok(ids)
    }

    fn translate_all(
        &self,
        meshes: &BTreeMap<FrameId, Mesh>,
        frames: &mut BTreeMap<FrameId, Frame>,
    ) -> BTreeMap<FrameId, PreparedModel> {
        let mut models = BTreeMap::new();
        for (&id, mesh) in meshes {
            let Some(frame) = frames.get_mut(&id) else {
                continue;
            };
            if frame.is_failed() {
                continue;
            }
            match translate(mesh, &self.structure, &frame.sections, &self.settings) {
                Ok(translation) => {
                    frame.metrics = translation.metrics;
                    match translation.model {
                        Some(model) => {
                            models.insert(id, model);
                        }
                        None => frame.status = FrameStatus::Solved,
                    }
                }
                Err(e) => {
                    warn!("frame {id} could not be translated: {e}");
                    frame.status = FrameStatus::Failed(e.to_string());
                }
            }
        }
        models
    }

    fn solve_and_interpret(
        &self,
        models: &mut BTreeMap<FrameId, PreparedModel>,
        frames: &mut BTreeMap<FrameId, Frame>,
    ) {
        if models.is_empty() {
            return;
        }
        let outcome = self.executor.solve_batch(models);
        for (id, reason) in outcome.failed {
            if let Some(frame) = frames.get_mut(&id) {
                frame.status = FrameStatus::Failed(reason);
                frame.analysis = None;
            }
        }
        for (id, raw) in outcome.solved {
            let (Some(frame), Some(model)) = (frames.get_mut(&id), models.get(&id)) else {
                continue;
            };
            match interpret(model, &raw, &self.structure) {
                Ok(analysis) => {
                    frame.analysis = Some(analysis);
                    frame.status = FrameStatus::Solved;
                }
                Err(e) => {
                    warn!("frame {id} could not be interpreted: {e}");
                    frame.analysis = None;
                    frame.status = FrameStatus::Failed(e.to_string());
                }
            }
        }
        models.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CalculationType, Criterion};
    use crate::elements::{MemberDefinition, Support, TubeSection};
    use crate::geometry::ShapeKeyMesh;
    use crate::loads::{LoadDefinition, VertexLoad};

    fn column_problem(calculation: CalculationType) -> (ShapeKeyMesh, StructureDefinition, RunConfig) {
        let mesh = Mesh::new(vec![[0.0, 0.0, 0.0], [0.0, 0.0, 3.0]], vec![[0, 1]], vec![]);
        let shape = ShapeKeyMesh::new(mesh).with_key("taller", vec![[0.0, 0.0, 0.0], [0.0, 0.0, 6.0]]);
        let mut structure = StructureDefinition::new();
        structure.add_member(0, MemberDefinition::new(TubeSection::new(6.0, 5.0), "steel_S235"));
        structure.add_support(0, Support::fixed());
        structure.add_load(LoadDefinition::Vertex(VertexLoad::force(1, 0.0, 0.0, -10.0)));
        let mut config = RunConfig::default();
        config.evaluation = EvaluationSettings::default()
            .with_calculation(calculation)
            .with_workers(2)
            .without_self_weight();
        // the column has no faces, so volume and area would score 0 for every frame
        let mut weights = FitnessWeights::none();
        weights.rise = Criterion::new(1.0);
        weights.weight = Criterion::new(1.0);
        weights.cantilever = Criterion::new(1.0);
        weights.stress = Criterion::new(1.0);
        config.fitness = weights;
        (shape, structure, config)
    }

    #[test]
    fn basis_is_required_and_scores_one() {
        let (shape, structure, config) = column_problem(CalculationType::FirstOrder);
        let mut evaluator = Evaluator::new(shape, structure, &config).unwrap();
        assert!(matches!(
            evaluator.evaluate_batch(vec![Proposal::new(vec![0.5])]),
            Err(FormError::MissingBasis)
        ));
        let basis = evaluator.evaluate_basis().unwrap();
        assert_eq!(evaluator.run().individual(basis).unwrap().weighted_fitness, 1.0);
        assert_eq!(evaluator.evaluate_basis().unwrap(), basis);
    }

    #[test]
    fn taller_column_is_scored_against_the_basis() {
        let (shape, structure, config) = column_problem(CalculationType::FirstOrder);
        let mut evaluator = Evaluator::new(shape, structure, &config).unwrap();
        evaluator.evaluate_basis().unwrap();
        let ids = evaluator
            .evaluate_batch(vec![Proposal::new(vec![1.0]), Proposal::new(vec![0.0])])
            .unwrap();
        let taller = evaluator.run().individual(ids[0]).unwrap();
        let same = evaluator.run().individual(ids[1]).unwrap();
        assert!(taller.valid);
        assert_eq!(taller.raw.rise, 6.0);
        assert!(taller.weighted_fitness > 1.0);
        assert!((same.weighted_fitness - 1.0).abs() < 1e-12);
        assert!(evaluator.run().frame(ids[0]).unwrap().analysis.is_some());
    }

    #[test]
    fn wrong_chromosome_length_is_rejected() {
        let (shape, structure, config) = column_problem(CalculationType::Geometrical);
        let mut evaluator = Evaluator::new(shape, structure, &config).unwrap();
        evaluator.evaluate_basis().unwrap();
        assert!(matches!(
            evaluator.evaluate_batch(vec![Proposal::new(vec![0.1, 0.2])]),
            Err(FormError::ChromosomeLength { expected: 1, actual: 2 })
        ));
    }

    #[test]
    fn geometrical_mode_skips_the_solver() {
        let (shape, structure, config) = column_problem(CalculationType::Geometrical);
        let mut evaluator = Evaluator::new(shape, structure, &config).unwrap();
        evaluator.evaluate_basis().unwrap();
        let individual = evaluator.evaluate(vec![1.0]).unwrap().clone();
        let frame = evaluator.run().frame(individual.frame).unwrap();
        assert_eq!(frame.status, FrameStatus::Solved);
        assert!(frame.analysis.is_none());
        assert!(individual.raw.stress.is_none());
    }

    #[test]
    fn failed_frames_get_the_worst_fitness() {
        // leaning the pin-jointed column leaves the vertical load without a load path
        let (_, structure, config) = column_problem(CalculationType::ForceDistribution);
        let mesh = Mesh::new(vec![[0.0, 0.0, 0.0], [0.0, 0.0, 3.0]], vec![[0, 1]], vec![]);
        let shape = ShapeKeyMesh::new(mesh).with_key("lean", vec![[0.0, 0.0, 0.0], [3.0, 0.0, 3.0]]);
        let mut evaluator = Evaluator::new(shape, structure, &config).unwrap();
        evaluator.evaluate_basis().unwrap();

        let ids = evaluator
            .evaluate_batch(vec![Proposal::new(vec![1.0]), Proposal::new(vec![0.0])])
            .unwrap();
        let leaning = evaluator.run().individual(ids[0]).unwrap();
        assert!(!leaning.valid);
        assert_eq!(leaning.weighted_fitness, f64::INFINITY);
        assert!(evaluator.run().frame(ids[0]).unwrap().is_failed());
        assert!(evaluator.run().individual(ids[1]).unwrap().valid);
    }

    #[test]
    fn failing_basis_is_reported() {
        let (shape, mut structure, config) = column_problem(CalculationType::ForceDistribution);
        structure.add_load(LoadDefinition::Vertex(VertexLoad::force(1, 1.0, 0.0, 0.0)));
        let mut evaluator = Evaluator::new(shape, structure, &config).unwrap();
        assert!(matches!(evaluator.evaluate_basis(), Err(FormError::BasisFailed(0, _))));
        assert!(evaluator.run().frame(0).unwrap().is_failed());
    }

    #[test]
    fn malformed_shapes_are_rejected_up_front() {
        let (_, structure, config) = column_problem(CalculationType::FirstOrder);
        let dangling = Mesh::new(vec![[0.0, 0.0, 0.0], [0.0, 0.0, 3.0]], vec![[0, 5]], vec![]);
        assert!(matches!(
            Evaluator::new(ShapeKeyMesh::new(dangling), structure.clone(), &config),
            Err(FormError::VertexNotFound(5))
        ));

        let (shape, mut structure, config) = column_problem(CalculationType::FirstOrder);
        structure.add_member(3, MemberDefinition::new(TubeSection::new(6.0, 5.0), "steel_S235"));
        assert!(matches!(
            Evaluator::new(shape, structure, &config),
            Err(FormError::EdgeNotFound(3))
        ));
    }

    /// Emits an edge past the vertex list once the gene is non-zero
    struct Tearing(ShapeKeyMesh);

    impl ShapeSource for Tearing {
        fn gene_count(&self) -> usize {
            self.0.gene_count()
        }

        fn deform(&self, chromosome: &[f64]) -> FormResult<Mesh> {
            let mut mesh = self.0.deform(chromosome)?;
            if chromosome[0] != 0.0 {
                mesh.edges.push([1, 9]);
            }
            Ok(mesh)
        }
    }

    #[test]
    fn malformed_deformed_meshes_fail_their_frame() {
        let (shape, structure, config) = column_problem(CalculationType::FirstOrder);
        let mut evaluator = Evaluator::new(Tearing(shape), structure, &config).unwrap();
        evaluator.evaluate_basis().unwrap();
        let ids = evaluator
            .evaluate_batch(vec![Proposal::new(vec![1.0]), Proposal::new(vec![0.0])])
            .unwrap();
        assert!(evaluator.run().frame(ids[0]).unwrap().is_failed());
        assert!(!evaluator.run().individual(ids[0]).unwrap().valid);
        assert!(evaluator.run().individual(ids[1]).unwrap().valid);
    }
}
