//! Decision functions and the network factory seam.
//!
//! The episode loop only talks to [`DecisionFunction`] and [`NetworkFactory`].
//! [`FeedForwardNetwork`] is the built-in implementation: a fixed-topology
//! dense network decoded from a flat weight [`Genome`].

use crate::schema::{Activation, Genome, NetworkConfig};

/// Maps a sensor vector to an output vector.
pub trait DecisionFunction {
    fn activate(&mut self, inputs: &[f32]) -> Vec<f32>;
}

impl<F> DecisionFunction for F
where
    F: FnMut(&[f32]) -> Vec<f32>,
{
    fn activate(&mut self, inputs: &[f32]) -> Vec<f32> {
        self(inputs)
    }
}

/// Builds one decision function per genome.
pub trait NetworkFactory {
    type Network: DecisionFunction;

    fn create_network(&self, genome: &Genome) -> Result<Self::Network, NetworkError>;

    /// Output 0 above this value means flap.
    fn flap_threshold(&self) -> f32 {
        0.5
    }
}

/// Flap iff the first output exceeds the threshold.
#[inline]
pub fn wants_flap(outputs: &[f32], threshold: f32) -> bool {
    outputs.first().is_some_and(|&v| v > threshold)
}

/// Network construction errors.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Genome has {actual} genes, topology needs {expected}")]
    GenomeLength { expected: usize, actual: usize },
    #[error("Genome contains a non-finite weight at gene {0}")]
    NonFinite(usize),
}

/// One dense layer.
#[derive(Debug, Clone)]
struct Layer {
    inputs: usize,
    /// Row-major, one row per output neuron.
    weights: Vec<f32>,
    biases: Vec<f32>,
}

/// Fixed-topology feed-forward network.
#[derive(Debug, Clone)]
pub struct FeedForwardNetwork {
    layers: Vec<Layer>,
    activation: Activation,
}

impl FeedForwardNetwork {
    /// Decode a genome for the given topology.
    pub fn from_genome(genome: &Genome, config: &NetworkConfig) -> Result<Self, NetworkError> {
        let expected = config.genome_len();
        if genome.len() != expected {
            return Err(NetworkError::GenomeLength {
                expected,
                actual: genome.len(),
            });
        }
        if let Some(i) = genome.genes.iter().position(|g| !g.is_finite()) {
            return Err(NetworkError::NonFinite(i));
        }

        let mut genes = genome.genes.iter().copied();
        let layers = config
            .layer_sizes()
            .windows(2)
            .map(|pair| {
                let (inputs, outputs) = (pair[0], pair[1]);
                Layer {
                    inputs,
                    weights: genes.by_ref().take(inputs * outputs).collect(),
                    biases: genes.by_ref().take(outputs).collect(),
                }
            })
            .collect();

        Ok(Self {
            layers,
            activation: config.activation,
        })
    }

    /// Run a forward pass. Missing inputs read as zero; extra inputs are ignored.
    pub fn forward(&self, inputs: &[f32]) -> Vec<f32> {
        let mut values = inputs.to_vec();
        for layer in &self.layers {
            values.resize(layer.inputs, 0.0);
            values = layer
                .weights
                .chunks_exact(layer.inputs.max(1))
                .zip(&layer.biases)
                .map(|(row, bias)| {
                    let sum: f32 = row.iter().zip(&values).map(|(w, x)| w * x).sum();
                    self.activation.apply(sum + bias)
                })
                .collect();
        }
        values
    }
}

impl DecisionFunction for FeedForwardNetwork {
    fn activate(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.forward(inputs)
    }
}

/// Factory for [`FeedForwardNetwork`]s sharing one topology.
#[derive(Debug, Clone)]
pub struct FeedForwardFactory {
    config: NetworkConfig,
}

impl FeedForwardFactory {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }
}

impl NetworkFactory for FeedForwardFactory {
    type Network = FeedForwardNetwork;

    fn create_network(&self, genome: &Genome) -> Result<FeedForwardNetwork, NetworkError> {
        FeedForwardNetwork::from_genome(genome, &self.config)
    }

    fn flap_threshold(&self) -> f32 {
        self.config.flap_threshold
    }
}
