//! Parallel batch solving on a worker pool

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{FormError, FormResult};
use crate::model::PreparedModel;
use crate::results::RawAnalysis;
use crate::run::FrameId;
use crate::solver;

/// Per-frame result of one batch.
///
/// The keys of `solved` and `failed` together are exactly the submitted frame ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub solved: BTreeMap<FrameId, RawAnalysis>,
    /// Failure reason by frame
    pub failed: BTreeMap<FrameId, String>,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.solved.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared flag checked by search engines between batches
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Worker pool solving prepared models
pub struct Executor {
    pool: ThreadPool,
}

impl Executor {
    /// Pool with `workers` threads, or one per CPU core
    pub fn new(workers: Option<usize>) -> FormResult<Self> {
        let threads = workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("form-solver-{i}"))
            .build()
            .map_err(|e| FormError::WorkerPool(e.to_string()))?;
        info!("solver pool started with {threads} worker(s)");
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Solve every model of the batch and wait for all of them.
    ///
    /// Each model travels to its worker as JSON and comes back the same way, so workers
    /// share nothing with the driver. A failing or panicking solve only fails its frame.
    pub fn solve_batch(&self, batch: &BTreeMap<FrameId, PreparedModel>) -> BatchOutcome {
        let jobs: Vec<(FrameId, Result<String, String>)> = batch
            .iter()
            .map(|(&id, model)| (id, serde_json::to_string(model).map_err(|e| e.to_string())))
            .collect();

        let results: Vec<(FrameId, Result<String, String>)> = self.pool.install(|| {
            jobs.into_par_iter()
                .map(|(id, job)| (id, job.and_then(|payload| run_job(&payload))))
                .collect()
        });

        let mut outcome = BatchOutcome::default();
        for (id, result) in results {
            let decoded = result.and_then(|payload| {
                serde_json::from_str::<RawAnalysis>(&payload).map_err(|e| e.to_string())
            });
            match decoded {
                Ok(raw) => {
                    outcome.solved.insert(id, raw);
                }
                Err(reason) => {
                    warn!("frame {id} failed: {reason}");
                    outcome.failed.insert(id, reason);
                }
            }
        }
        debug!(
            "batch of {} solved, {} failed",
            outcome.solved.len(),
            outcome.failed.len()
        );
        outcome
    }
}

fn run_job(payload: &str) -> Result<String, String> {
    let solved = panic::catch_unwind(AssertUnwindSafe(|| -> FormResult<String> {
        let model: PreparedModel = serde_json::from_str(payload)?;
        let raw = solver::solve(&model)?;
        Ok(serde_json::to_string(&raw)?)
    }));
    match solved {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(panic_message(panic.as_ref())),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("solver panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("solver panicked: {s}")
    } else {
        "solver panicked".to_string()
    }
}
