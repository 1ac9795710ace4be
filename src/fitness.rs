//! Weighted multi-criteria fitness relative to the basis frame

use serde::{Deserialize, Serialize};

use crate::config::FitnessWeights;
use crate::results::FrameAnalysis;
use crate::translator::GeometryMetrics;

/// Per-criterion metrics of one frame.
///
/// Structural metrics are `None` when the frame was only measured, never solved; such
/// criteria drop out of the weighted sum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFitness {
    pub volume: f64,
    pub area: f64,
    pub weight: f64,
    pub rise: f64,
    pub span: f64,
    pub cantilever: f64,
    /// Average |longitudinal stress extremum| over members
    pub stress: Option<f64>,
    /// Average strain energy extremum over members
    pub strain_energy: Option<f64>,
}

impl RawFitness {
    pub fn new(metrics: &GeometryMetrics, analysis: Option<&FrameAnalysis>) -> Self {
        Self {
            volume: metrics.volume,
            area: metrics.area,
            weight: metrics.weight,
            rise: metrics.rise,
            span: metrics.span,
            cantilever: metrics.cantilever,
            stress: analysis.map(FrameAnalysis::average_stress),
            strain_energy: analysis.map(FrameAnalysis::average_strain_energy),
        }
    }

    /// Metrics in the order of [`FitnessWeights::criteria`]
    pub fn values(&self) -> [Option<f64>; 8] {
        [
            Some(self.volume),
            Some(self.area),
            Some(self.weight),
            Some(self.rise),
            Some(self.span),
            Some(self.cantilever),
            self.stress,
            self.strain_energy,
        ]
    }
}

/// Candidate over basis, or basis over candidate when inverted; 0 on division by zero
pub fn ratio(candidate: f64, basis: f64, invert: bool) -> f64 {
    let (numerator, denominator) = if invert {
        (basis, candidate)
    } else {
        (candidate, basis)
    };
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Weighted fitness of a candidate; lower is better.
///
/// Sum of weighted ratios over the active criteria divided by the sum of their weights.
/// Without any active criterion every candidate scores like the basis.
pub fn weighted_fitness(candidate: &RawFitness, basis: &RawFitness, weights: &FitnessWeights) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for ((criterion, c), b) in weights
        .criteria()
        .iter()
        .zip(candidate.values())
        .zip(basis.values())
    {
        if criterion.weight == 0.0 {
            continue;
        }
        let (Some(c), Some(b)) = (c, b) else {
            continue;
        };
        total += ratio(c, b, criterion.invert) * criterion.weight;
        weight_sum += criterion.weight;
    }
    if weight_sum == 0.0 {
        1.0
    } else {
        total / weight_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Criterion;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn sample() -> RawFitness {
        RawFitness {
            volume: 10.0,
            area: 20.0,
            weight: 5.0,
            rise: 3.0,
            span: 12.0,
            cantilever: 1.0,
            stress: Some(4.0),
            strain_energy: Some(0.2),
        }
    }

    #[test]
    fn division_by_zero_yields_zero() {
        assert_eq!(ratio(5.0, 0.0, false), 0.0);
        assert_eq!(ratio(0.0, 5.0, true), 0.0);
        assert_eq!(ratio(6.0, 3.0, false), 2.0);
        assert_eq!(ratio(6.0, 3.0, true), 0.5);
    }

    #[test]
    fn weights_average_the_ratios() {
        let basis = sample();
        let candidate = RawFitness {
            volume: 20.0,
            rise: 6.0,
            ..basis
        };
        let mut weights = FitnessWeights::none();
        weights.volume = Criterion::new(3.0);
        weights.rise = Criterion::inverted(1.0);
        // (2 · 3 + 0.5 · 1) / 4
        assert_relative_eq!(weighted_fitness(&candidate, &basis, &weights), 1.625, epsilon = 1e-12);
    }

    #[test]
    fn unsolved_frames_skip_structural_criteria() {
        let basis = RawFitness {
            stress: None,
            strain_energy: None,
            ..sample()
        };
        let candidate = RawFitness {
            weight: 10.0,
            ..basis
        };
        let mut weights = FitnessWeights::none();
        weights.weight = Criterion::new(1.0);
        weights.stress = Criterion::new(5.0);
        assert_relative_eq!(weighted_fitness(&candidate, &basis, &weights), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn no_active_criterion_scores_like_the_basis() {
        let basis = RawFitness {
            stress: None,
            ..sample()
        };
        let mut weights = FitnessWeights::none();
        weights.stress = Criterion::new(1.0);
        assert_eq!(weighted_fitness(&sample(), &basis, &weights), 1.0);
    }

    proptest! {
        #[test]
        fn basis_against_itself_scores_one(
            metrics in prop::array::uniform8(1e-3f64..1e3),
            raw_weights in prop::array::uniform8(0.0f64..10.0),
            inverts in prop::array::uniform8(any::<bool>()),
        ) {
            prop_assume!(raw_weights.iter().any(|w| *w > 0.0));
            let basis = RawFitness {
                volume: metrics[0],
                area: metrics[1],
                weight: metrics[2],
                rise: metrics[3],
                span: metrics[4],
                cantilever: metrics[5],
                stress: Some(metrics[6]),
                strain_energy: Some(metrics[7]),
            };
            let c = |k: usize| Criterion { weight: raw_weights[k], invert: inverts[k] };
            let weights = FitnessWeights {
                volume: c(0),
                area: c(1),
                weight: c(2),
                rise: c(3),
                span: c(4),
                cantilever: c(5),
                stress: c(6),
                strain_energy: c(7),
            };
            let score = weighted_fitness(&basis, &basis, &weights);
            prop_assert!((score - 1.0).abs() < 1e-12);
        }
    }
}
