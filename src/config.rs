//! Run configuration: analysis, evaluation, fitness and search engine settings

use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{FormError, FormResult};
use crate::geometry::ShapeKeyMesh;
use crate::solver::{FrameMode, SolverBackend};
use crate::structure::StructureDefinition;

/// Solver options shared by all frame analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Check for model stability (first-order analysis)
    pub check_stability: bool,
    /// Check static equilibrium after analysis (first-order analysis)
    pub check_statics: bool,
    /// Maximum iterations for P-Delta analysis
    pub max_iterations: usize,
    /// Convergence tolerance on displacements (cm), also the residual tolerance of the
    /// force-distribution solve relative to the load magnitude
    pub tolerance: f64,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            check_stability: true,
            check_statics: true,
            max_iterations: 30,
            tolerance: 1e-6,
        }
    }
}

impl AnalysisOptions {
    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Skip stability and statics checks
    pub fn without_checks(mut self) -> Self {
        self.check_stability = false;
        self.check_statics = false;
        self
    }
}

/// What a frame evaluation computes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    /// Geometric metrics only, no structural solve
    Geometrical,
    #[default]
    FirstOrder,
    FirstOrderLinear,
    SecondOrder,
    /// Pin-jointed force distribution
    ForceDistribution,
}

impl CalculationType {
    /// Solver backend, `None` for geometry-only evaluation
    pub fn backend(&self) -> Option<SolverBackend> {
        match self {
            Self::Geometrical => None,
            Self::FirstOrder => Some(SolverBackend::Frame(FrameMode::FirstOrder)),
            Self::FirstOrderLinear => Some(SolverBackend::Frame(FrameMode::FirstOrderLinear)),
            Self::SecondOrder => Some(SolverBackend::Frame(FrameMode::SecondOrder)),
            Self::ForceDistribution => Some(SolverBackend::ForceDistribution),
        }
    }
}

/// Sectional resizing strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionOptimization {
    #[default]
    None,
    Simple,
    Utilization,
    Complex,
    /// Only valid together with the force-distribution solver
    Approximate,
}

/// How each candidate is evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    pub calculation: CalculationType,
    pub optimization: SectionOptimization,
    /// Resize iterations, each followed by a full re-solve
    pub optimization_iterations: usize,
    /// Mesh units to model units (m to cm)
    pub length_scale: f64,
    /// Add member and quad self-weight
    pub self_weight: bool,
    /// Worker threads, `None` uses every CPU core
    pub workers: Option<usize>,
    pub analysis: AnalysisOptions,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            calculation: CalculationType::FirstOrder,
            optimization: SectionOptimization::None,
            optimization_iterations: 0,
            length_scale: 100.0,
            self_weight: true,
            workers: None,
            analysis: AnalysisOptions::default(),
        }
    }
}

impl EvaluationSettings {
    pub fn with_calculation(mut self, calculation: CalculationType) -> Self {
        self.calculation = calculation;
        self
    }

    pub fn with_optimization(mut self, kind: SectionOptimization, iterations: usize) -> Self {
        self.optimization = kind;
        self.optimization_iterations = iterations;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn without_self_weight(mut self) -> Self {
        self.self_weight = false;
        self
    }

    pub fn validate(&self) -> FormResult<()> {
        if !(self.length_scale > 0.0) {
            return Err(FormError::InvalidInput(format!(
                "length scale must be positive, got {}",
                self.length_scale
            )));
        }
        if self.optimization == SectionOptimization::Approximate
            && self.calculation != CalculationType::ForceDistribution
        {
            return Err(FormError::InvalidInput(
                "approximate sizing needs the force-distribution solver".to_string(),
            ));
        }
        if self.workers == Some(0) {
            return Err(FormError::InvalidInput("worker count must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Weight of one fitness metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// 0 disables the criterion
    pub weight: f64,
    /// Score basis/candidate instead of candidate/basis
    #[serde(default)]
    pub invert: bool,
}

impl Criterion {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            invert: false,
        }
    }

    pub fn inverted(weight: f64) -> Self {
        Self {
            weight,
            invert: true,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0.0)
    }
}

impl Default for Criterion {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Fitness weights, all criteria enabled equally by default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub volume: Criterion,
    pub area: Criterion,
    pub weight: Criterion,
    pub rise: Criterion,
    pub span: Criterion,
    pub cantilever: Criterion,
    /// Average longitudinal stress extremum
    pub stress: Criterion,
    /// Average strain energy extremum
    pub strain_energy: Criterion,
}

impl FitnessWeights {
    /// Every criterion disabled, for building up selectively
    pub fn none() -> Self {
        Self {
            volume: Criterion::disabled(),
            area: Criterion::disabled(),
            weight: Criterion::disabled(),
            rise: Criterion::disabled(),
            span: Criterion::disabled(),
            cantilever: Criterion::disabled(),
            stress: Criterion::disabled(),
            strain_energy: Criterion::disabled(),
        }
    }

    /// Criteria in metric order
    pub fn criteria(&self) -> [Criterion; 8] {
        [
            self.volume,
            self.area,
            self.weight,
            self.rise,
            self.span,
            self.cantilever,
            self.stress,
            self.strain_energy,
        ]
    }

    pub fn validate(&self) -> FormResult<()> {
        let criteria = self.criteria();
        if criteria.iter().any(|c| !(c.weight >= 0.0) || !c.weight.is_finite()) {
            return Err(FormError::InvalidInput(
                "fitness weights must be finite and non-negative".to_string(),
            ));
        }
        if criteria.iter().all(|c| c.weight == 0.0) {
            return Err(FormError::InvalidInput(
                "at least one fitness weight must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values a gene may take, always inside [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneDomain {
    #[default]
    Continuous,
    /// `steps + 1` evenly spaced values 0, 1/steps, ..., 1
    Discrete { steps: u32 },
}

impl GeneDomain {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Self::Continuous => rng.gen::<f64>(),
            Self::Discrete { steps } => {
                let steps = steps.max(1);
                f64::from(rng.gen_range(0..=steps)) / f64::from(steps)
            }
        }
    }

    /// Nearest admissible value
    pub fn snap(&self, value: f64) -> f64 {
        let value = value.clamp(0.0, 1.0);
        match *self {
            Self::Continuous => value,
            Self::Discrete { steps } => {
                let steps = f64::from(steps.max(1));
                (value * steps).round() / steps
            }
        }
    }
}

/// Crossover operator of the genetic algorithm
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crossover {
    /// Per gene: parent 1, parent 2 or mutation
    #[default]
    Direct,
    /// Per gene: mean of both parents or mutation
    Morph,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticConfig {
    pub population: usize,
    /// Individuals carried over unchanged, must stay below half the population
    pub elitism: usize,
    /// Generations after the initial population
    pub generations: usize,
    pub crossover: Crossover,
    pub domain: GeneDomain,
    pub seed: u64,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population: 20,
            elitism: 2,
            generations: 10,
            crossover: Crossover::Direct,
            domain: GeneDomain::Continuous,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradientConfig {
    pub learning_rate: f64,
    /// Finite difference step
    pub delta: f64,
    pub max_iterations: usize,
    pub abort_threshold: f64,
    /// Starting chromosome, the basis (all zeros) when absent
    pub start: Option<Vec<f64>>,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            delta: 0.01,
            max_iterations: 20,
            abort_threshold: 1e-4,
            start: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianConfig {
    /// Guided iterations after the random probes
    pub iterations: usize,
    /// Random probes before the surrogate takes over
    pub init_points: usize,
    /// Exploration weight of the upper confidence bound
    pub kappa: f64,
    /// Random candidates scored per suggestion
    pub candidates: usize,
    /// RBF kernel length scale in unit-hypercube coordinates
    pub kernel_length: f64,
    /// Observation noise added to the kernel diagonal
    pub noise: f64,
    pub seed: u64,
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            iterations: 20,
            init_points: 5,
            kappa: 2.576,
            candidates: 1000,
            kernel_length: 0.3,
            noise: 1e-6,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    #[default]
    Genetic,
    Gradient,
    Bayesian,
}

/// Everything a search run needs besides the geometry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub evaluation: EvaluationSettings,
    pub fitness: FitnessWeights,
    pub search: SearchKind,
    pub genetic: GeneticConfig,
    pub gradient: GradientConfig,
    pub bayesian: BayesianConfig,
}

impl RunConfig {
    pub fn validate(&self) -> FormResult<()> {
        self.evaluation.validate()?;
        self.fitness.validate()?;

        let ga = &self.genetic;
        if ga.population == 0 {
            return Err(FormError::InvalidInput("population must not be empty".to_string()));
        }
        if ga.elitism as f64 >= 0.5 * ga.population as f64 {
            return Err(FormError::InvalidInput(format!(
                "elitism {} must be below half the population {}",
                ga.elitism, ga.population
            )));
        }

        let gd = &self.gradient;
        if !(gd.learning_rate > 0.0) || !(gd.delta > 0.0) || gd.delta >= 1.0 {
            return Err(FormError::InvalidInput(
                "learning rate must be positive and delta inside (0, 1)".to_string(),
            ));
        }
        if let Some(start) = &gd.start {
            if start.iter().any(|g| !(0.0..=1.0).contains(g)) {
                return Err(FormError::InvalidInput(
                    "gradient start genes must lie in [0, 1]".to_string(),
                ));
            }
        }

        let bo = &self.bayesian;
        if bo.candidates == 0 || !(bo.kernel_length > 0.0) || bo.noise < 0.0 {
            return Err(FormError::InvalidInput(
                "bayesian optimizer needs candidates, a positive kernel length and non-negative noise"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// A complete form-finding problem as exchanged over JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub shape: ShapeKeyMesh,
    pub structure: StructureDefinition,
    #[serde(default)]
    pub config: RunConfig,
}

impl Problem {
    pub fn from_json_str(json: &str) -> FormResult<Self> {
        let problem: Self = serde_json::from_str(json)?;
        problem.validate()?;
        Ok(problem)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> FormResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> FormResult<()> {
        self.shape.validate()?;
        self.structure.validate(&self.shape.basis)?;
        self.config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_config_is_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn elitism_must_stay_below_half_the_population() {
        let mut config = RunConfig::default();
        config.genetic.population = 10;
        config.genetic.elitism = 5;
        assert!(config.validate().is_err());
        config.genetic.elitism = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let mut config = RunConfig::default();
        config.fitness = FitnessWeights::none();
        assert!(config.validate().is_err());
        config.fitness.rise = Criterion::new(2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn approximate_sizing_needs_force_distribution() {
        let mut config = RunConfig::default();
        config.evaluation = config
            .evaluation
            .with_optimization(SectionOptimization::Approximate, 2);
        assert!(config.validate().is_err());
        config.evaluation.calculation = CalculationType::ForceDistribution;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn discrete_domain_snaps_to_steps() {
        let domain = GeneDomain::Discrete { steps: 4 };
        assert_eq!(domain.snap(0.3), 0.25);
        assert_eq!(domain.snap(1.7), 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let g = domain.sample(&mut rng);
            assert_eq!(domain.snap(g), g);
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"search": "gradient", "genetic": {"population": 8}}"#).unwrap();
        assert_eq!(config.search, SearchKind::Gradient);
        assert_eq!(config.genetic.population, 8);
        assert_eq!(config.genetic.elitism, 2);
        assert_eq!(config.evaluation.length_scale, 100.0);
    }
}
