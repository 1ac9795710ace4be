//! Form Finder Example - Parametric Arch

use form_finder::prelude::*;

const SEGMENTS: usize = 10;
const SPAN: f64 = 12.0;

fn arch(rise: f64, shoulder: f64) -> Vec<[f64; 3]> {
    (0..=SEGMENTS)
        .map(|i| {
            let t = i as f64 / SEGMENTS as f64;
            let crown = 4.0 * t * (1.0 - t);
            let shoulders = (2.0 * std::f64::consts::PI * t).sin().abs() * (1.0 - crown);
            [SPAN * t, 0.0, rise * crown + shoulder * shoulders]
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    println!("=== Form Finder Example: Parametric Arch ===\n");

    //        . - ~ - .
    //     .'           '.
    //    /               \
    //   ^                 ^
    // Fixed             Fixed
    let edges: Vec<[usize; 2]> = (0..SEGMENTS).map(|i| [i, i + 1]).collect();
    let mesh = Mesh::new(arch(1.0, 0.0), edges, vec![]);
    let shape = ShapeKeyMesh::new(mesh)
        .with_key("crown", arch(5.0, 0.0))
        .with_key("shoulders", arch(1.0, 1.5));

    let mut structure = StructureDefinition::new();
    for edge in 0..SEGMENTS {
        structure.add_member(
            edge,
            MemberDefinition::new(TubeSection::new(16.0, 15.0), "steel_S235"),
        );
        // 5 kN/m roof load on every segment
        structure.add_load(LoadDefinition::Line(LineLoad::global(edge, 0.0, 0.0, -5.0)));
    }
    structure.add_support(0, Support::fixed());
    structure.add_support(SEGMENTS, Support::fixed());

    let mut fitness = FitnessWeights::none();
    fitness.weight = Criterion::new(2.0);
    fitness.stress = Criterion::new(1.0);
    fitness.rise = Criterion::new(0.5);

    let config = RunConfig {
        evaluation: EvaluationSettings::default()
            .with_optimization(SectionOptimization::Utilization, 2),
        fitness,
        search: SearchKind::Genetic,
        genetic: GeneticConfig {
            population: 12,
            elitism: 2,
            generations: 6,
            crossover: Crossover::Direct,
            domain: GeneDomain::Discrete { steps: 10 },
            seed: 2024,
        },
        ..RunConfig::default()
    };

    let mut evaluator = Evaluator::new(shape, structure, &config)?;
    let report = search(&mut evaluator, &config, &CancelToken::new())?;

    println!(
        "Search finished ({:?}) after {} batches",
        report.stop_reason, report.batches
    );

    let run = evaluator.run();
    let mut ranked: Vec<&Individual> = run.individuals.values().filter(|i| i.valid).collect();
    ranked.sort_by(|a, b| a.weighted_fitness.total_cmp(&b.weighted_fitness));

    println!("\n=== BEST INDIVIDUALS ===");
    println!("{:>6} {:>10} {:>10} {:>10} {:>10} {:>8}", "frame", "crown", "shoulders", "fitness", "weight kN", "util");
    for individual in ranked.iter().take(5) {
        let frame = run.frame(individual.frame)?;
        let utilization = frame
            .analysis
            .as_ref()
            .map_or(0.0, FrameAnalysis::max_utilization);
        println!(
            "{:>6} {:>10.2} {:>10.2} {:>10.4} {:>10.3} {:>8.2}",
            individual.frame,
            individual.chromosome[0],
            individual.chromosome[1],
            individual.weighted_fitness,
            individual.raw.weight,
            utilization
        );
    }

    if let Some(best) = report.best {
        let frame = run.frame(best)?;
        if let Some(analysis) = &frame.analysis {
            println!("\n=== BEST FRAME {} MEMBERS ===", best);
            for (edge, member) in &analysis.members {
                let section = &frame.sections.members[edge];
                println!(
                    "  edge {:>2}: Do {:6.2} cm, Di {:6.2} cm, sigma {:7.3} kN/cm², overstress {}",
                    edge, section.outer, section.inner, member.extrema.sigma, member.overstress
                );
            }
        }
    }

    Ok(())
}
