//! Generational genetic algorithm with elitism

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{SearchEngine, StopReason};
use crate::config::{Crossover, GeneDomain, GeneticConfig};
use crate::error::{FormError, FormResult};
use crate::pipeline::{Evaluator, Proposal};
use crate::run::{FrameId, Generation, Individual};

/// Probability of taking a parent's gene in direct crossover (each parent)
const DIRECT_PARENT_RATE: f64 = 0.45;
/// Probability of averaging the parents' genes in morph crossover
const MORPH_RATE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaState {
    CreateInitialPopulation,
    CreateNewGeneration,
    PopulateNewGeneration,
    Finished,
}

pub struct GeneticAlgorithm {
    config: GeneticConfig,
    genes: usize,
    rng: StdRng,
    state: GaState,
    /// Generations bred after the initial population
    bred: usize,
    elites: Vec<FrameId>,
    offspring: Vec<Proposal>,
}

impl GeneticAlgorithm {
    pub fn new(config: GeneticConfig, genes: usize) -> FormResult<Self> {
        if config.population == 0 || config.elitism as f64 >= 0.5 * config.population as f64 {
            return Err(FormError::InvalidInput(format!(
                "elitism {} must be below half the population {}",
                config.elitism, config.population
            )));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            genes,
            state: GaState::CreateInitialPopulation,
            bred: 0,
            elites: Vec::new(),
            offspring: Vec::new(),
        })
    }

    pub fn state(&self) -> GaState {
        self.state
    }

    fn random_chromosome(&mut self) -> Vec<f64> {
        let domain = self.config.domain;
        (0..self.genes).map(|_| domain.sample(&mut self.rng)).collect()
    }

    /// Elites and offspring proposals from the last generation.
    ///
    /// Both parents are drawn uniformly from the better half, redrawing the second until it
    /// differs from the first so that no child is bred from a single individual. A one-member
    /// pool is the exception and mates with itself.
    fn breed(&mut self, previous: &Generation) -> Vec<Proposal> {
        let ranked = previous.ranked();
        self.elites = ranked
            .iter()
            .take(self.config.elitism)
            .map(|i| i.frame)
            .collect();

        let half = (ranked.len() / 2).max(1).min(ranked.len());
        let pool: Vec<&Individual> = ranked[..half].to_vec();
        let count = self.config.population.saturating_sub(self.elites.len());
        (0..count)
            .map(|_| {
                let first = self.rng.gen_range(0..pool.len());
                let mut second = self.rng.gen_range(0..pool.len());
                if pool.len() > 1 {
                    while second == first {
                        second = self.rng.gen_range(0..pool.len());
                    }
                }
                let (a, b) = (pool[first], pool[second]);
                let chromosome = mate(
                    &mut self.rng,
                    self.config.crossover,
                    self.config.domain,
                    &a.chromosome,
                    &b.chromosome,
                );
                Proposal::new(chromosome).with_parents(vec![a.frame, b.frame])
            })
            .collect()
    }
}

/// Child chromosome of two parents
pub(crate) fn mate<R: Rng + ?Sized>(
    rng: &mut R,
    crossover: Crossover,
    domain: GeneDomain,
    first: &[f64],
    second: &[f64],
) -> Vec<f64> {
    first
        .iter()
        .zip(second)
        .map(|(&a, &b)| {
            let roll: f64 = rng.gen();
            match crossover {
                Crossover::Direct if roll < DIRECT_PARENT_RATE => a,
                Crossover::Direct if roll < 2.0 * DIRECT_PARENT_RATE => b,
                Crossover::Morph if roll < MORPH_RATE => domain.snap(0.5 * (a + b)),
                _ => domain.sample(rng),
            }
        })
        .collect()
}

impl SearchEngine for GeneticAlgorithm {
    fn step(&mut self, evaluator: &mut Evaluator) -> FormResult<Option<StopReason>> {
        loop {
            match self.state {
                GaState::CreateInitialPopulation => {
                    let proposals: Vec<Proposal> = (0..self.config.population)
                        .map(|_| Proposal::new(self.random_chromosome()))
                        .collect();
                    let ids = evaluator.evaluate_batch(proposals)?;
                    let generation = evaluator.run_mut().push_generation(&ids)?;
                    info!("initial population of {} evaluated", generation.individuals.len());
                    return Ok(self.advance());
                }
                GaState::CreateNewGeneration => {
                    let previous = evaluator
                        .run()
                        .latest_generation()
                        .cloned()
                        .ok_or_else(|| {
                            FormError::InvalidInput("no generation to breed from".to_string())
                        })?;
                    self.offspring = self.breed(&previous);
                    self.state = GaState::PopulateNewGeneration;
                }
                GaState::PopulateNewGeneration => {
                    let offspring = std::mem::take(&mut self.offspring);
                    let mut ids = self.elites.clone();
                    ids.extend(evaluator.evaluate_batch(offspring)?);
                    self.bred += 1;
                    let generation = evaluator.run_mut().push_generation(&ids)?;
                    let best = generation
                        .ranked()
                        .first()
                        .map_or(f64::INFINITY, |i| i.weighted_fitness);
                    info!("generation {} evaluated, best fitness {best:.4}", generation.index);
                    return Ok(self.advance());
                }
                GaState::Finished => return Ok(Some(StopReason::Completed)),
            }
        }
    }
}

impl GeneticAlgorithm {
    fn advance(&mut self) -> Option<StopReason> {
        if self.bred >= self.config.generations {
            debug!("all {} generation(s) bred", self.bred);
            self.state = GaState::Finished;
            Some(StopReason::Completed)
        } else {
            self.state = GaState::CreateNewGeneration;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elitism_must_stay_below_half() {
        let config = GeneticConfig {
            population: 4,
            elitism: 2,
            ..GeneticConfig::default()
        };
        assert!(GeneticAlgorithm::new(config, 3).is_err());
    }

    #[test]
    fn direct_crossover_mixes_parent_genes() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = vec![0.0; 200];
        let b = vec![1.0; 200];
        let child = mate(&mut rng, Crossover::Direct, GeneDomain::Discrete { steps: 4 }, &a, &b);
        let from_a = child.iter().filter(|&&g| g == 0.0).count();
        let from_b = child.iter().filter(|&&g| g == 1.0).count();
        // roughly 45 % each, the rest mutated onto the grid
        assert!(from_a > 60 && from_b > 60);
        assert!(child.iter().all(|g| [0.0, 0.25, 0.5, 0.75, 1.0].contains(g)));
    }

    #[test]
    fn morph_crossover_averages() {
        let mut rng = StdRng::seed_from_u64(3);
        let a = vec![0.2; 100];
        let b = vec![0.6; 100];
        let child = mate(&mut rng, Crossover::Morph, GeneDomain::Continuous, &a, &b);
        let averaged = child.iter().filter(|&&g| (g - 0.4).abs() < 1e-12).count();
        assert!(averaged > 75);
        assert!(child.iter().all(|g| (0.0..=1.0).contains(g)));
    }

    #[test]
    fn seeded_populations_repeat() {
        let config = GeneticConfig {
            seed: 42,
            ..GeneticConfig::default()
        };
        let mut a = GeneticAlgorithm::new(config.clone(), 5).unwrap();
        let mut b = GeneticAlgorithm::new(config, 5).unwrap();
        assert_eq!(a.random_chromosome(), b.random_chromosome());
        assert_eq!(a.state(), GaState::CreateInitialPopulation);
    }

    #[test]
    fn offspring_have_two_distinct_parents_from_the_better_half() {
        let config = GeneticConfig {
            population: 6,
            elitism: 1,
            seed: 9,
            ..GeneticConfig::default()
        };
        let mut ga = GeneticAlgorithm::new(config, 2).unwrap();
        let mut previous = Generation::default();
        for frame in 0..6u64 {
            previous.individuals.insert(
                frame,
                Individual {
                    frame,
                    chromosome: vec![0.1 * frame as f64, 0.5],
                    parents: Vec::new(),
                    raw: Default::default(),
                    weighted_fitness: 1.0 + frame as f64,
                    valid: true,
                },
            );
        }

        let offspring = ga.breed(&previous);
        assert_eq!(offspring.len(), 5);
        for proposal in &offspring {
            let &[a, b] = proposal.parents.as_slice() else {
                panic!("expected two parents, got {:?}", proposal.parents);
            };
            assert_ne!(a, b);
            assert!(a < 3 && b < 3);
        }
    }
}

