//! Bayesian optimization driver and a Gaussian-process black-box optimizer

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{SearchEngine, StopReason};
use crate::config::BayesianConfig;
use crate::error::FormResult;
use crate::pipeline::{Evaluator, Proposal};

/// Maximizing optimizer over the unit hypercube
pub trait BlackBoxOptimizer {
    fn dimensions(&self) -> usize;

    /// Next point to probe
    fn suggest(&mut self) -> Vec<f64>;

    /// Report the objective observed at a point
    fn register(&mut self, point: Vec<f64>, target: f64);
}

/// Gaussian-process surrogate with an RBF kernel and upper-confidence-bound acquisition
pub struct GaussianProcessOptimizer {
    dims: usize,
    config: BayesianConfig,
    rng: StdRng,
    points: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl GaussianProcessOptimizer {
    pub fn new(dims: usize, config: BayesianConfig) -> Self {
        Self {
            dims,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            points: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn observations(&self) -> usize {
        self.points.len()
    }

    fn random_point(&mut self) -> Vec<f64> {
        (0..self.dims).map(|_| self.rng.gen::<f64>()).collect()
    }

    fn kernel(&self, a: &[f64], b: &[f64]) -> f64 {
        let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
        let l = self.config.kernel_length;
        (-0.5 * d2 / (l * l)).exp()
    }

    /// Posterior mean and standard deviation in target units, `None` if K is not
    /// positive definite
    fn posterior(&self) -> Option<Posterior<'_>> {
        let n = self.points.len();
        let mean = self.targets.iter().sum::<f64>() / n as f64;
        let var = self.targets.iter().map(|t| (t - mean) * (t - mean)).sum::<f64>() / n as f64;
        let scale = if var > 0.0 { var.sqrt() } else { 1.0 };

        let k = DMatrix::from_fn(n, n, |i, j| {
            let noise = if i == j { self.config.noise.max(1e-10) } else { 0.0 };
            self.kernel(&self.points[i], &self.points[j]) + noise
        });
        let cholesky = k.cholesky()?;
        let y = DVector::from_fn(n, |i, _| (self.targets[i] - mean) / scale);
        let alpha = cholesky.solve(&y);
        Some(Posterior {
            optimizer: self,
            lower: cholesky.l(),
            alpha,
            mean,
            scale,
        })
    }
}

struct Posterior<'a> {
    optimizer: &'a GaussianProcessOptimizer,
    lower: DMatrix<f64>,
    alpha: DVector<f64>,
    mean: f64,
    scale: f64,
}

impl Posterior<'_> {
    fn predict(&self, x: &[f64]) -> Option<(f64, f64)> {
        let points = &self.optimizer.points;
        let k = DVector::from_fn(points.len(), |i, _| self.optimizer.kernel(&points[i], x));
        let mu = k.dot(&self.alpha);
        let v = self.lower.solve_lower_triangular(&k)?;
        let var = (1.0 - v.dot(&v)).max(0.0);
        Some((self.mean + mu * self.scale, var.sqrt() * self.scale))
    }
}

impl BlackBoxOptimizer for GaussianProcessOptimizer {
    fn dimensions(&self) -> usize {
        self.dims
    }

    fn suggest(&mut self) -> Vec<f64> {
        if self.points.len() < self.config.init_points.max(1) {
            return self.random_point();
        }
        let fallback = self.random_point();
        let candidates: Vec<Vec<f64>> = (0..self.config.candidates)
            .map(|_| self.random_point())
            .collect();
        let Some(posterior) = self.posterior() else {
            debug!("kernel matrix not positive definite, probing at random");
            return fallback;
        };

        let kappa = self.config.kappa;
        candidates
            .into_iter()
            .filter_map(|c| posterior.predict(&c).map(|(mu, sigma)| (mu + kappa * sigma, c)))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(fallback, |(_, point)| point)
    }

    fn register(&mut self, point: Vec<f64>, target: f64) {
        self.points.push(point);
        self.targets.push(target);
    }
}

/// Drives a black-box optimizer: random probes in one batch, then one guided point per step
pub struct BayesianSearch<O: BlackBoxOptimizer> {
    optimizer: O,
    init_points: usize,
    iterations: usize,
    done: usize,
}

impl<O: BlackBoxOptimizer> BayesianSearch<O> {
    pub fn new(optimizer: O, config: &BayesianConfig) -> Self {
        Self {
            optimizer,
            init_points: config.init_points,
            iterations: config.iterations,
            done: 0,
        }
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }
}

impl<O: BlackBoxOptimizer> SearchEngine for BayesianSearch<O> {
    fn step(&mut self, evaluator: &mut Evaluator) -> FormResult<Option<StopReason>> {
        let first = self.done == 0;
        let count = if first { self.init_points.max(1) } else { 1 };
        let points: Vec<Vec<f64>> = (0..count).map(|_| self.optimizer.suggest()).collect();
        let proposals = points.iter().cloned().map(Proposal::new).collect();

        let ids = evaluator.evaluate_batch(proposals)?;
        evaluator.run_mut().push_generation(&ids)?;

        for (point, id) in points.into_iter().zip(&ids) {
            let individual = evaluator.run().individual(*id)?;
            if individual.valid {
                self.optimizer.register(point, -individual.weighted_fitness);
            } else {
                debug!("frame {id} is invalid and not registered");
            }
        }
        self.done += 1;

        if first {
            info!("{} random probe(s) evaluated", count);
        }
        // the probe batch does not count as a guided iteration
        if self.done > self.iterations {
            Ok(Some(StopReason::Completed))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u64) -> BayesianConfig {
        BayesianConfig {
            init_points: 4,
            candidates: 500,
            seed,
            ..BayesianConfig::default()
        }
    }

    #[test]
    fn first_suggestions_are_random_probes() {
        let mut a = GaussianProcessOptimizer::new(3, config(9));
        let mut b = GaussianProcessOptimizer::new(3, config(9));
        let p = a.suggest();
        assert_eq!(p, b.suggest());
        assert_eq!(p.len(), 3);
        assert!(p.iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn guided_suggestion_moves_towards_the_maximum() {
        // maximize -(x - 0.8)^2 in one dimension
        let mut gp = GaussianProcessOptimizer::new(1, config(1));
        for x in [0.0, 0.25, 0.5, 0.75, 1.0] {
            gp.register(vec![x], -(x - 0.8) * (x - 0.8));
        }
        let mut gp = GaussianProcessOptimizer {
            config: BayesianConfig {
                kappa: 0.0,
                ..config(1)
            },
            ..gp
        };
        let next = gp.suggest();
        assert!((next[0] - 0.8).abs() < 0.1, "suggested {next:?}");
    }

    #[test]
    fn posterior_reproduces_observations() {
        let mut gp = GaussianProcessOptimizer::new(1, config(2));
        gp.register(vec![0.1], 2.0);
        gp.register(vec![0.9], -1.0);
        let posterior = gp.posterior().unwrap();
        let (mu, sigma) = posterior.predict(&[0.1]).unwrap();
        assert!((mu - 2.0).abs() < 1e-3);
        assert!(sigma < 1e-2);
    }
}
