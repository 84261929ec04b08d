//! Flappy Neuro CLI - Train controllers from JSON configuration and replay
//! saved champions.

use std::path::{Path, PathBuf};
use std::time::Instant;

use flappy_neuro::{
    compute::{
        EpisodeOptions, FeedForwardFactory,
        evolution::{EvolutionEngine, load_champion},
        replay,
    },
    schema::{EvolutionConfig, EvolutionPhase, StopReason},
};

fn usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} train <config.json> [generations] [--save <dir>]", program);
    eprintln!("  {} replay <champion.json> [config.json]", program);
    eprintln!("  {} --example", program);
    eprintln!();
    eprintln!("Train Flappy Bird controllers by neuroevolution.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.json    Path to evolution configuration file");
    eprintln!("  generations    Override population.max_generations");
    eprintln!("  --save <dir>   Write archived champions to this directory");
    eprintln!("  champion.json  Champion file written by `train --save`");
    eprintln!();
    eprintln!("Example configuration is generated with --example flag.");
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map_or("flappy-neuro", String::as_str);

    match args.get(1).map(String::as_str) {
        Some("--example") => print_example_config(),
        Some("train") if args.len() >= 3 => train(&args[2..]),
        Some("replay") if args.len() >= 3 => replay_champion(&args[2..]),
        _ => {
            usage(program);
            std::process::exit(1);
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn train(args: &[String]) {
    let config_path = PathBuf::from(&args[0]);
    let mut generations: Option<usize> = None;
    let mut save_dir: Option<PathBuf> = None;

    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        if arg == "--save" {
            let dir = rest
                .next()
                .unwrap_or_else(|| fail("--save requires a directory"));
            save_dir = Some(PathBuf::from(dir));
        } else {
            let n = arg
                .parse()
                .unwrap_or_else(|_| fail(format!("invalid generation count: {}", arg)));
            generations = Some(n);
        }
    }

    // Malformed configuration is fatal before any episode runs
    let mut config = EvolutionConfig::load(&config_path).unwrap_or_else(|e| fail(e));
    if let Some(n) = generations {
        config.population.max_generations = n;
    }

    println!("Flappy Bird Neuroevolution");
    println!("==========================");
    println!("Population: {}", config.population.size);
    println!("Generations: {}", config.population.max_generations);
    println!("Network: {:?}", config.network.layer_sizes());
    if let Some(target) = config.population.fitness_threshold {
        println!("Fitness threshold: {}", target);
    }
    println!();

    let mut engine = EvolutionEngine::new(config).unwrap_or_else(|e| fail(e));
    if let Some(dir) = &save_dir {
        engine
            .archive_mut()
            .set_output_dir(dir)
            .unwrap_or_else(|e| fail(e));
    }

    println!("Training...");
    let start = Instant::now();
    let run = engine
        .train(|progress| {
            if progress.phase == EvolutionPhase::Evaluating {
                println!(
                    "  Generation {}/{}: best={:.2}, avg={:.2}, stagnation={}",
                    progress.generation + 1,
                    progress.total_generations,
                    progress.generation_best,
                    progress.avg_fitness,
                    progress.stagnation_count
                );
            }
        })
        .unwrap_or_else(|e| fail(e));

    let stats = &run.result.stats;
    let best_score = run.episodes.iter().map(|e| e.score).max().unwrap_or(0);

    println!();
    println!("Result:");
    println!("  Stop reason: {}", describe(&stats.stop_reason));
    println!("  Generations: {}", stats.generations);
    println!("  Evaluations: {}", stats.total_evaluations);
    println!("  Best fitness: {:.2}", stats.best_fitness);
    println!("  Final average: {:.2}", stats.final_avg_fitness);
    println!("  Best episode score: {}", best_score);
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());

    if save_dir.is_some() {
        let paths = engine.archive_mut().save_all().unwrap_or_else(|e| fail(e));
        println!();
        println!("Saved {} champions:", paths.len());
        for path in paths {
            println!("  {}", path.display());
        }
    }
}

fn describe(reason: &StopReason) -> &'static str {
    match reason {
        StopReason::MaxGenerations => "generation limit reached",
        StopReason::TargetReached => "fitness threshold reached",
        StopReason::Stagnation => "no improvement",
        StopReason::Cancelled => "cancelled",
    }
}

fn replay_champion(args: &[String]) {
    let champion = load_champion(Path::new(&args[0])).unwrap_or_else(|e| fail(e));
    let game = match args.get(1) {
        Some(path) => EvolutionConfig::load(path).unwrap_or_else(|e| fail(e)).game,
        None => champion.game.clone(),
    };

    let factory = FeedForwardFactory::new(champion.network.clone());
    let options = EpisodeOptions {
        max_ticks: Some(100_000),
        seed: rand::random(),
        cancel: None,
    };

    println!(
        "Replaying champion {} (generation {}, fitness {:.2})",
        champion.metadata.id, champion.metadata.generation, champion.metadata.fitness
    );

    let summary = replay(&champion.genome, &factory, &game, options).unwrap_or_else(|e| fail(e));
    println!("  Ticks: {}", summary.ticks);
    println!("  Score: {}", summary.score);
    println!("  Fitness: {:.2}", summary.best_fitness);
    println!("  Ended: {:?}", summary.termination);
}

fn print_example_config() {
    let config = EvolutionConfig::default();

    println!("Example configuration (flappy.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}
