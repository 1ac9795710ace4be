//! Finite-difference gradient descent over the chromosome

use log::{debug, info, warn};

use super::{SearchEngine, StopReason};
use crate::config::GradientConfig;
use crate::error::{FormError, FormResult};
use crate::pipeline::{Evaluator, Proposal};
use crate::run::FrameId;

pub struct GradientDescent {
    config: GradientConfig,
    current: Vec<f64>,
    slope: Vec<f64>,
    iteration: usize,
    previous: Option<FrameId>,
}

impl GradientDescent {
    pub fn new(config: GradientConfig, genes: usize) -> FormResult<Self> {
        let current = config.start.clone().unwrap_or_else(|| vec![0.0; genes]);
        if current.len() != genes {
            return Err(FormError::ChromosomeLength {
                expected: genes,
                actual: current.len(),
            });
        }
        Ok(Self {
            config,
            current,
            slope: vec![0.0; genes],
            iteration: 0,
            previous: None,
        })
    }

    pub fn current(&self) -> &[f64] {
        &self.current
    }

    pub fn slope(&self) -> &[f64] {
        &self.slope
    }

    /// Signed finite-difference step per gene, backward where forward would leave [0, 1]
    fn steps(&self) -> Vec<f64> {
        self.current
            .iter()
            .map(|&g| {
                if g + self.config.delta > 1.0 {
                    -self.config.delta
                } else {
                    self.config.delta
                }
            })
            .collect()
    }

    /// Move against the slope, pinning genes at the bounds
    fn descend(&mut self) {
        let rate = self.config.learning_rate;
        for (gene, slope) in self.current.iter_mut().zip(self.slope.iter_mut()) {
            let next = *gene - *slope * rate;
            if next < 0.0 || next > 1.0 {
                *gene = next.clamp(0.0, 1.0);
                *slope = 0.0;
            } else {
                *gene = next;
            }
        }
    }
}

impl SearchEngine for GradientDescent {
    fn step(&mut self, evaluator: &mut Evaluator) -> FormResult<Option<StopReason>> {
        let steps = self.steps();
        let parents: Vec<FrameId> = self.previous.into_iter().collect();
        let mut proposals = vec![Proposal::new(self.current.clone()).with_parents(parents)];
        for (g, &step) in steps.iter().enumerate() {
            let mut perturbed = self.current.clone();
            perturbed[g] += step;
            proposals.push(Proposal::new(perturbed));
        }

        let ids = evaluator.evaluate_batch(proposals)?;
        evaluator.run_mut().push_generation(&ids)?;
        self.iteration += 1;

        let baseline = evaluator.run().individual(ids[0])?;
        if !baseline.valid {
            warn!("gradient baseline frame {} is invalid, stopping", ids[0]);
            return Ok(Some(StopReason::Stalled));
        }
        let f0 = baseline.weighted_fitness;
        self.previous = Some(ids[0]);

        for (g, (&id, &step)) in ids[1..].iter().zip(&steps).enumerate() {
            let perturbed = evaluator.run().individual(id)?;
            self.slope[g] = if perturbed.valid {
                (perturbed.weighted_fitness - f0) / step
            } else {
                warn!("perturbed frame {id} of gene {g} is invalid, slope set to 0");
                0.0
            };
        }

        self.descend();
        let norm = self.slope.iter().map(|s| s * s).sum::<f64>().sqrt();
        debug!(
            "iteration {}: fitness {f0:.4}, slope norm {norm:.3e}",
            self.iteration
        );

        if norm * self.config.learning_rate < self.config.abort_threshold {
            info!("gradient descent converged after {} iteration(s)", self.iteration);
            Ok(Some(StopReason::Converged))
        } else if self.iteration >= self.config.max_iterations {
            Ok(Some(StopReason::Completed))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(current: Vec<f64>, slope: Vec<f64>) -> GradientDescent {
        let mut gd = GradientDescent::new(GradientConfig::default(), current.len()).unwrap();
        gd.current = current;
        gd.slope = slope;
        gd
    }

    #[test]
    fn start_length_is_checked() {
        let config = GradientConfig {
            start: Some(vec![0.5; 2]),
            ..GradientConfig::default()
        };
        assert!(matches!(
            GradientDescent::new(config, 3),
            Err(FormError::ChromosomeLength { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn perturbation_turns_back_at_the_upper_bound() {
        let gd = engine(vec![0.2, 0.995, 1.0], vec![0.0; 3]);
        assert_eq!(gd.steps(), vec![0.01, -0.01, -0.01]);
    }

    #[test]
    fn descent_clamps_and_zeroes_the_slope() {
        let mut gd = engine(vec![0.5, 0.05, 0.95], vec![1.0, 2.0, -2.0]);
        gd.descend();
        assert!((gd.current()[0] - 0.4).abs() < 1e-12);
        assert_eq!(gd.current()[1], 0.0);
        assert_eq!(gd.current()[2], 1.0);
        assert_eq!(gd.slope(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_slope_keeps_the_chromosome() {
        let mut gd = engine(vec![0.3, 0.7], vec![0.0, 0.0]);
        gd.descend();
        assert_eq!(gd.current(), &[0.3, 0.7]);
    }
}
