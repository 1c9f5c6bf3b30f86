//! The stress prediction network
//!
//! Fixed topology: 12 inputs, 8 sigmoid hidden units, 8 softmax
//! outputs, one per stress level. Small enough to train on-device with
//! plain per-sample SGD.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use pulsegate_shared::StressLevel;

use crate::neural::features::feature_vector;
use crate::neural::loss::cross_entropy;
use crate::sample::SensorContext;

pub const INPUT_SIZE: usize = 12;
pub const HIDDEN_SIZE: usize = 8;
pub const OUTPUT_SIZE: usize = StressLevel::COUNT;

/// Bookkeeping persisted alongside the weights.
///
/// `version` is 0 for a freshly initialized network and increments on
/// every completed training run; version 0 means no prediction is
/// offered at all.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetadata {
    pub version: u32,
    pub training_epochs: u32,
    pub last_loss: f32,
    pub total_samples: u32,
}

impl NetworkMetadata {
    fn fresh() -> Self {
        Self {
            version: 0,
            training_epochs: 0,
            last_loss: 0.0,
            total_samples: 0,
        }
    }
}

/// One prediction, level plus the softmax probability backing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MlPrediction {
    pub level: StressLevel,
    pub confidence: f32,
}

/// MLP: input → hidden (sigmoid) → output (softmax).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressNetwork {
    w1: Array2<f32>, // [HIDDEN_SIZE, INPUT_SIZE]
    b1: Array1<f32>, // [HIDDEN_SIZE]
    w2: Array2<f32>, // [OUTPUT_SIZE, HIDDEN_SIZE]
    b2: Array1<f32>, // [OUTPUT_SIZE]
    pub metadata: NetworkMetadata,
}

impl StressNetwork {
    /// Create a fresh network with Xavier-scaled random weights.
    pub fn new(seed: u64) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

        let w1_scale = (2.0 / INPUT_SIZE as f32).sqrt();
        let w1 = Array2::from_shape_fn((HIDDEN_SIZE, INPUT_SIZE), |_| {
            (rng.gen::<f32>() - 0.5) * 2.0 * w1_scale
        });
        let b1 = Array1::zeros(HIDDEN_SIZE);

        let w2_scale = (2.0 / HIDDEN_SIZE as f32).sqrt();
        let w2 = Array2::from_shape_fn((OUTPUT_SIZE, HIDDEN_SIZE), |_| {
            (rng.gen::<f32>() - 0.5) * 2.0 * w2_scale
        });
        let b2 = Array1::zeros(OUTPUT_SIZE);

        Self {
            w1,
            b1,
            w2,
            b2,
            metadata: NetworkMetadata::fresh(),
        }
    }

    /// A network is only usable after at least one training run.
    pub fn is_trained(&self) -> bool {
        self.metadata.version > 0
    }

    fn sigmoid(x: &Array1<f32>) -> Array1<f32> {
        x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Softmax with max-subtraction for numeric stability.
    fn softmax(x: &Array1<f32>) -> Array1<f32> {
        let max = x.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp: Array1<f32> = x.mapv(|v| (v - max).exp());
        let sum: f32 = exp.sum();
        exp / sum
    }

    /// Forward pass returning the output distribution and the hidden
    /// activations needed for backprop.
    fn forward_with_cache(&self, input: &Array1<f32>) -> (Array1<f32>, Array1<f32>) {
        let z1 = self.w1.dot(input) + &self.b1;
        let h1 = Self::sigmoid(&z1);

        let z2 = self.w2.dot(&h1) + &self.b2;
        let output = Self::softmax(&z2);

        (output, h1)
    }

    /// Probability per stress level for one feature vector.
    pub fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        let (output, _) = self.forward_with_cache(input);
        output
    }

    /// Predicts a stress level for the given sensor context.
    ///
    /// Returns `None` when the network has never been trained; the
    /// caller then runs on rules alone.
    pub fn predict(&self, ctx: &SensorContext) -> Option<MlPrediction> {
        if !self.is_trained() {
            return None;
        }

        let probs = self.forward(&feature_vector(ctx));
        let (idx, &confidence) = probs
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((0, &0.0));

        Some(MlPrediction {
            level: StressLevel::from_index(idx).unwrap_or(StressLevel::Baseline),
            confidence,
        })
    }

    /// One SGD step on a single labelled sample.
    ///
    /// Returns the sample's cross-entropy loss and whether the argmax
    /// already matched the target before the update.
    pub fn train_sample(
        &mut self,
        input: &Array1<f32>,
        target: usize,
        learning_rate: f32,
    ) -> (f32, bool) {
        let (output, h1) = self.forward_with_cache(input);

        let loss = cross_entropy(&output, target);
        let predicted = output
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let correct = predicted == target;

        // Softmax + cross-entropy collapses to (p - y) at the output.
        let mut dz2 = output;
        dz2[target] -= 1.0;

        // Hidden gradient before the weight update so w2 is still the
        // forward-pass matrix.
        let dh1 = self.w2.t().dot(&dz2);
        // Sigmoid derivative from the cached activation: h * (1 - h).
        let dz1 = &dh1 * &h1.mapv(|h| h * (1.0 - h));

        for i in 0..OUTPUT_SIZE {
            for j in 0..HIDDEN_SIZE {
                self.w2[[i, j]] -= learning_rate * dz2[i] * h1[j];
            }
            self.b2[i] -= learning_rate * dz2[i];
        }

        for i in 0..HIDDEN_SIZE {
            for j in 0..INPUT_SIZE {
                self.w1[[i, j]] -= learning_rate * dz1[i] * input[j];
            }
            self.b1[i] -= learning_rate * dz1[i];
        }

        (loss, correct)
    }
}
