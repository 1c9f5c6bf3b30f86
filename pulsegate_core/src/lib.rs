//! # PulseGate Core
//!
//! The decision engine for a biometric-driven actuator controller. Raw
//! sensor samples flow through a weighted stress scorer, a rate-of-change
//! classifier and a timer/reaction rule state machine; a small on-device
//! neural predictor may then adjust the outcome, but only as far as the
//! operator's autonomy setting permits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pulsegate_core::{DecisionEngine, EngineConfig};
//! use pulsegate_shared::BiometricSample;
//!
//! let mut engine = DecisionEngine::new(EngineConfig::default());
//! engine.start_session(0);
//! engine.set_autonomy_level(30.0);
//!
//! let sample = BiometricSample::new(92.0, 36.9, 540.0, 1_000);
//! let decision = engine.tick(sample);
//! println!("level {:?}, speed {}", decision.current_level, decision.speed);
//! ```
//!
//! ## Core Modules
//!
//! - [`config`] - Engine configuration via TOML
//! - [`scorer`] - Weighted multi-channel stress scoring
//! - [`rules`] - Level state machine with reactive overrides
//! - [`autonomy`] - Permission table bounding what automation may do
//! - [`neural`] - The stress prediction network
//! - [`arbiter`] - Rule/ML arbitration under the permission gate
//! - [`trainer`] - Feedback collection and on-device SGD training
//! - [`logging`] - JSON line-delimited logging

pub mod arbiter;
pub mod autonomy;
pub mod change;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod neural;
pub mod rules;
pub mod sample;
pub mod scorer;
pub mod trainer;

pub use arbiter::HybridArbiter;
pub use autonomy::{
    lookup, AutonomyControl, AutonomyProfile, AutonomyRuntimeState, AUTONOMY_PROFILES,
};
pub use change::{ChangeClassifier, ScorePoint};
pub use checkpoint::{load_model, save_model, MODEL_MAGIC};
pub use config::{
    ChangeConfig, ConfigError, EngineConfig, LevelTimerConfig, MlConfig, ScorerConfig,
    StorageConfig,
};
pub use engine::{DecisionEngine, SessionState};
pub use error::{EngineError, EngineResult};
pub use logging::EngineLogger;
pub use neural::{MlPrediction, StressNetwork};
pub use rules::{RuleDecision, RuleEngine};
pub use sample::{SensorContext, SensorHistory, HISTORY_WINDOW};
pub use scorer::StressScorer;
pub use trainer::{CancelToken, FeedbackSample, FeedbackStore, TrainReport, Trainer};
