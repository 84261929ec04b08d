//! Genome manipulation utilities for the genetic algorithm.
//!
//! Provides random generation, crossover, and mutation operations on flat
//! weight genomes.

use crate::schema::{Genome, GenomeConstraints, NetworkConfig};
use rand::prelude::*;

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a random genome sized for the given topology.
    pub fn random_genome(
        &mut self,
        network: &NetworkConfig,
        constraints: &GenomeConstraints,
    ) -> Genome {
        let genes = (0..network.genome_len())
            .map(|_| self.uniform(constraints.init_bounds))
            .collect();
        Genome::new(genes)
    }

    /// Uniform random in bounds.
    fn uniform(&mut self, bounds: (f32, f32)) -> f32 {
        if bounds.0 < bounds.1 {
            self.rng.gen_range(bounds.0..=bounds.1)
        } else {
            bounds.0
        }
    }

    /// Gaussian mutation: add noise with the given standard deviation.
    pub fn gaussian_mutate(&mut self, value: f32, strength: f32, bounds: (f32, f32)) -> f32 {
        let noise: f32 = self.rng.sample(rand_distr::StandardNormal);
        (value + noise * strength).clamp(bounds.0, bounds.1)
    }

    /// Blend crossover: every gene is an independent random mix of the parents.
    pub fn crossover(&mut self, parent1: &Genome, parent2: &Genome) -> Genome {
        let genes = parent1
            .genes
            .iter()
            .zip(&parent2.genes)
            .map(|(&a, &b)| blend(a, b, self.rng.r#gen::<f32>()))
            .collect();
        Genome::new(genes)
    }

    /// Mutate a genome in place.
    ///
    /// Each gene is perturbed with probability `rate`, or replaced by a fresh
    /// value with probability `replace_rate`. Results stay within the weight
    /// bounds.
    pub fn mutate(
        &mut self,
        genome: &mut Genome,
        rate: f32,
        strength: f32,
        replace_rate: f32,
        constraints: &GenomeConstraints,
    ) {
        for gene in &mut genome.genes {
            if self.rng.r#gen::<f32>() < replace_rate {
                *gene = self
                    .uniform(constraints.init_bounds)
                    .clamp(constraints.weight_bounds.0, constraints.weight_bounds.1);
            } else if self.rng.r#gen::<f32>() < rate {
                *gene = self.gaussian_mutate(*gene, strength, constraints.weight_bounds);
            }
        }
    }

    /// Uniform sample in [0, 1).
    pub fn unit(&mut self) -> f32 {
        self.rng.r#gen()
    }

    /// Uniform index below `len`.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

/// Linear blend between two values.
fn blend(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Mean absolute gene difference between two genomes.
pub fn genome_distance(g1: &Genome, g2: &Genome) -> f32 {
    let count = g1.len().min(g2.len());
    if count == 0 {
        return 0.0;
    }
    let distance: f32 = g1
        .genes
        .iter()
        .zip(&g2.genes)
        .map(|(a, b)| (a - b).abs())
        .sum();
    distance / count as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hidden_network() -> NetworkConfig {
        NetworkConfig {
            hidden_layers: vec![4],
            ..Default::default()
        }
    }

    #[test]
    fn test_random_genome() {
        let mut rng = GenomeRng::new(42);
        let network = hidden_network();
        let constraints = GenomeConstraints::default();

        let genome = rng.random_genome(&network, &constraints);
        assert_eq!(genome.len(), network.genome_len());
        assert!(genome.genes.iter().all(|g| {
            *g >= constraints.init_bounds.0 && *g <= constraints.init_bounds.1
        }));
    }

    #[test]
    fn test_crossover_stays_between_parents() {
        let mut rng = GenomeRng::new(42);
        let g1 = Genome::new(vec![0.0; 8]);
        let g2 = Genome::new(vec![1.0; 8]);

        let child = rng.crossover(&g1, &g2);
        assert_eq!(child.len(), 8);
        assert!(child.genes.iter().all(|g| (0.0..=1.0).contains(g)));
    }

    #[test]
    fn test_zero_rates_leave_genome_untouched() {
        let mut rng = GenomeRng::new(7);
        let constraints = GenomeConstraints::default();
        let mut genome = rng.random_genome(&hidden_network(), &constraints);
        let before = genome.clone();

        rng.mutate(&mut genome, 0.0, 1.0, 0.0, &constraints);
        assert_eq!(genome, before);
    }

    #[test]
    fn test_full_rate_changes_genes() {
        let mut rng = GenomeRng::new(7);
        let constraints = GenomeConstraints::default();
        let mut genome = rng.random_genome(&hidden_network(), &constraints);
        let before = genome.clone();

        rng.mutate(&mut genome, 1.0, 0.5, 0.0, &constraints);
        assert!(genome_distance(&genome, &before) > 0.0);
    }

    #[test]
    fn test_genome_distance() {
        let g1 = Genome::new(vec![0.0, 1.0, 2.0]);
        let g2 = Genome::new(vec![1.0, 1.0, 0.0]);

        assert!(genome_distance(&g1, &g1).abs() < 1e-6);
        assert!((genome_distance(&g1, &g2) - 1.0).abs() < 1e-6);
        assert_eq!(genome_distance(&Genome::default(), &g1), 0.0);
    }

    proptest! {
        #[test]
        fn prop_mutation_respects_weight_bounds(
            seed in any::<u64>(),
            strength in 0.0f32..100.0,
        ) {
            let mut rng = GenomeRng::new(seed);
            let constraints = GenomeConstraints {
                init_bounds: (-1.0, 1.0),
                weight_bounds: (-2.0, 2.0),
            };
            let mut genome = rng.random_genome(&hidden_network(), &constraints);
            for _ in 0..10 {
                rng.mutate(&mut genome, 1.0, strength, 0.1, &constraints);
            }
            prop_assert!(genome.genes.iter().all(|g| (-2.0..=2.0).contains(g)));
        }
    }
}
