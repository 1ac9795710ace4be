//! Search engines proposing chromosomes and consuming fitness
//!
//! Every engine follows propose → materialize → evaluate → score → decide, one batch per
//! [`SearchEngine::step`]. All of them write into the evaluator's run context, so a finished
//! run reads the same whichever engine produced it.

mod bayesian;
mod genetic;
mod gradient;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{RunConfig, SearchKind};
use crate::error::FormResult;
use crate::executor::CancelToken;
use crate::pipeline::Evaluator;
use crate::run::FrameId;

pub use bayesian::{BayesianSearch, BlackBoxOptimizer, GaussianProcessOptimizer};
pub use genetic::{GaState, GeneticAlgorithm};
pub use gradient::GradientDescent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Configured generation or iteration count reached
    Completed,
    /// Gradient step fell below the abort threshold
    Converged,
    /// Cancelled between batches
    Cancelled,
    /// The current point could not be evaluated, so no further step is possible
    Stalled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Best valid individual of the whole run, the basis included
    pub best: Option<FrameId>,
    #[serde(with = "crate::run::fitness_value")]
    pub best_fitness: f64,
    /// Batches evaluated by the engine, not counting the basis
    pub batches: usize,
    pub stop_reason: StopReason,
}

pub trait SearchEngine {
    /// Evaluate one batch and decide; `Some` once the engine is done
    fn step(&mut self, evaluator: &mut Evaluator) -> FormResult<Option<StopReason>>;

    /// Evaluate the basis, then step until finished or cancelled
    fn run(&mut self, evaluator: &mut Evaluator, cancel: &CancelToken) -> FormResult<SearchReport> {
        evaluator.evaluate_basis()?;
        let mut batches = 0;
        let stop_reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            batches += 1;
            if let Some(reason) = self.step(evaluator)? {
                break reason;
            }
        };

        let best = evaluator.run().best();
        let report = SearchReport {
            best: best.map(|i| i.frame),
            best_fitness: best.map_or(f64::INFINITY, |i| i.weighted_fitness),
            batches,
            stop_reason,
        };
        info!(
            "search stopped ({:?}) after {} batch(es), best fitness {:.4}",
            report.stop_reason, report.batches, report.best_fitness
        );
        Ok(report)
    }
}

/// Run the engine selected in the configuration
pub fn search(
    evaluator: &mut Evaluator,
    config: &RunConfig,
    cancel: &CancelToken,
) -> FormResult<SearchReport> {
    let genes = evaluator.gene_count();
    match config.search {
        SearchKind::Genetic => {
            GeneticAlgorithm::new(config.genetic.clone(), genes)?.run(evaluator, cancel)
        }
        SearchKind::Gradient => {
            GradientDescent::new(config.gradient.clone(), genes)?.run(evaluator, cancel)
        }
        SearchKind::Bayesian => {
            let optimizer = GaussianProcessOptimizer::new(genes, config.bayesian.clone());
            BayesianSearch::new(optimizer, &config.bayesian).run(evaluator, cancel)
        }
    }
}
