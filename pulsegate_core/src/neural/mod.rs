//! Machine-learned stress prediction
//!
//! A small MLP that maps a normalized sensor context to a probability
//! distribution over the eight stress levels. Weights fit in a few
//! kilobytes so the whole model lives in RAM and serializes into a
//! single checkpoint blob.

pub mod features;
pub mod loss;
pub mod network;

pub use features::feature_vector;
pub use loss::cross_entropy;
pub use network::{MlPrediction, NetworkMetadata, StressNetwork, HIDDEN_SIZE, INPUT_SIZE, OUTPUT_SIZE};
