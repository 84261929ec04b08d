//! Benchmarks for episode simulation and evolution.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use flappy_neuro::{
    compute::{
        Episode, EpisodeOptions, FeedForwardFactory, NetworkFactory,
        evolution::{EvolutionEngine, GenomeRng},
    },
    schema::{
        EvaluationConfig, EvolutionConfig, GameConfig, GenomeConstraints, NetworkConfig,
        PopulationConfig,
    },
};

fn bench_episode(c: &mut Criterion) {
    let mut group = c.benchmark_group("episode");
    let game = GameConfig::default();

    for (label, hidden) in [("direct", vec![]), ("hidden_8", vec![8])] {
        let network = NetworkConfig {
            hidden_layers: hidden,
            ..Default::default()
        };
        let factory = FeedForwardFactory::new(network.clone());
        let mut rng = GenomeRng::new(42);

        for population in [10, 50, 200] {
            let networks: Vec<_> = (0..population)
                .map(|_| {
                    let genome = rng.random_genome(&network, &GenomeConstraints::default());
                    factory.create_network(&genome)
                })
                .collect::<Result<_, _>>()
                .unwrap();

            group.bench_with_input(
                BenchmarkId::new(label, population),
                &population,
                |b, _| {
                    b.iter(|| {
                        let options = EpisodeOptions {
                            max_ticks: Some(2_000),
                            seed: 7,
                            cancel: None,
                        };
                        let mut episode = Episode::new(
                            &game,
                            networks.iter().cloned(),
                            factory.flap_threshold(),
                            options,
                        );
                        black_box(episode.run())
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_evolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolution");
    group.sample_size(10);

    let config = EvolutionConfig {
        population: PopulationConfig {
            size: 30,
            max_generations: 5,
            fitness_threshold: None,
            stagnation_limit: None,
        },
        evaluation: EvaluationConfig {
            max_ticks: Some(1_000),
        },
        random_seed: Some(3),
        ..Default::default()
    };

    group.bench_function("train_5_generations", |b| {
        b.iter(|| {
            let mut engine = EvolutionEngine::new(config.clone()).unwrap();
            black_box(engine.train(|_| {}).unwrap())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_episode, bench_evolution);
criterion_main!(benches);
