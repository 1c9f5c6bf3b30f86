//! On-device training from human corrections.
//!
//! Training is a user-triggered batch job that never runs on the tick
//! path. It loads the durable feedback corpus, shuffles once, then runs
//! plain per-sample SGD for the requested number of epochs, checking a
//! shared cancellation flag between epochs so the caller's scheduler is
//! never starved.

pub mod feedback;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use pulsegate_shared::StressLevel;

use crate::checkpoint;
use crate::config::{MlConfig, StorageConfig};
use crate::error::{EngineError, EngineResult};
use crate::neural::{feature_vector, StressNetwork};
use crate::sample::SensorContext;

pub use feedback::{FeedbackSample, FeedbackStore};

/// Cooperative cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Outcome of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub epochs_run: usize,
    pub samples: usize,
    pub final_loss: f32,
    /// Fraction of samples whose argmax matched the human label in the
    /// last completed epoch.
    pub accuracy: f32,
    pub cancelled: bool,
    /// False when the model blob could not be written; the in-memory
    /// network still carries the new weights.
    pub persisted: bool,
}

/// Collects feedback and retrains the network on demand.
#[derive(Debug)]
pub struct Trainer {
    store: FeedbackStore,
    model_path: PathBuf,
    learning_rate: f32,
    min_samples: usize,
    seed: u64,
}

impl Trainer {
    pub fn new(ml: &MlConfig, storage: &StorageConfig) -> Self {
        Self {
            store: FeedbackStore::new(storage.feedback_path()),
            model_path: storage.model_path(),
            learning_rate: ml.learning_rate,
            min_samples: ml.min_training_samples,
            seed: ml.seed,
        }
    }

    pub fn store(&self) -> &FeedbackStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut FeedbackStore {
        &mut self.store
    }

    /// Records one human correction against the machine's choice.
    ///
    /// The in-session buffer always keeps the sample; a failed durable
    /// append bubbles up as a soft [`EngineError::StorageWriteFailed`].
    pub fn log_feedback(
        &mut self,
        context: SensorContext,
        ai_level: StressLevel,
        user_level: StressLevel,
        timestamp_ms: u32,
    ) -> EngineResult<()> {
        self.store
            .append(FeedbackSample::new(context, ai_level, user_level, timestamp_ms))
    }

    /// Retrains `network` on the durable corpus.
    ///
    /// Fails with [`EngineError::InsufficientData`] below the configured
    /// sample floor, leaving the network and its version untouched. The
    /// target label is always the human's level. On completion of at
    /// least one epoch the version is bumped and the blob persisted.
    pub fn train_model(
        &mut self,
        network: &mut StressNetwork,
        epochs: usize,
        cancel: &CancelToken,
    ) -> EngineResult<TrainReport> {
        let mut samples = self.store.load_all();
        if samples.len() < self.min_samples {
            return Err(EngineError::InsufficientData {
                have: samples.len(),
                need: self.min_samples,
            });
        }

        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        samples.shuffle(&mut rng);

        let inputs: Vec<_> = samples
            .iter()
            .map(|s| (feature_vector(&s.context), s.user_level.index()))
            .collect();

        let mut epochs_run = 0;
        let mut final_loss = 0.0;
        let mut accuracy = 0.0;

        for _ in 0..epochs {
            // Yield point: a cancel between epochs stops cleanly with
            // whole-epoch granularity.
            if cancel.is_cancelled() {
                break;
            }

            let mut epoch_loss = 0.0;
            let mut correct = 0usize;
            for (input, target) in &inputs {
                let (loss, was_correct) = network.train_sample(input, *target, self.learning_rate);
                epoch_loss += loss;
                if was_correct {
                    correct += 1;
                }
            }

            epochs_run += 1;
            final_loss = epoch_loss / inputs.len() as f32;
            accuracy = correct as f32 / inputs.len() as f32;
        }

        let mut persisted = false;
        if epochs_run > 0 {
            network.metadata.version += 1;
            network.metadata.training_epochs += epochs_run as u32;
            network.metadata.last_loss = final_loss;
            network.metadata.total_samples = samples.len() as u32;

            persisted = checkpoint::save_model(network, accuracy, &self.model_path).is_ok();
        }

        Ok(TrainReport {
            epochs_run,
            samples: samples.len(),
            final_loss,
            accuracy,
            cancelled: cancel.is_cancelled(),
            persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn scratch_config() -> (MlConfig, StorageConfig) {
        let ml = MlConfig {
            enabled: true,
            override_confidence: 0.6,
            high_confidence: 0.8,
            learning_rate: 0.05,
            min_training_samples: 20,
            seed: 42,
        };
        let storage = StorageConfig {
            data_dir: std::env::temp_dir().join(format!("pulsegate_train_{}", Uuid::new_v4())),
            feedback_file: "feedback_log.csv".to_string(),
            model_file: "stress_model.bin".to_string(),
        };
        (ml, storage)
    }

    fn context_for(level: StressLevel, hr: f32) -> SensorContext {
        SensorContext {
            heart_rate: hr,
            hr_average: hr,
            hr_trend: 0.0,
            temperature: 36.5 + level.index() as f32 * 0.2,
            temp_delta: 0.1,
            gsr: 200.0 + level.index() as f32 * 100.0,
            gsr_average: 200.0 + level.index() as f32 * 100.0,
            gsr_trend: 0.0,
            edge_count: 0,
            time_since_edge_sec: f32::MAX,
            current_level: level,
            session_time_sec: 300.0,
        }
    }

    fn seed_corpus(trainer: &mut Trainer, count: usize) {
        for i in 0..count {
            let level = StressLevel::from_index(i % 8).unwrap();
            trainer
                .log_feedback(
                    context_for(level, 60.0 + (i % 8) as f32 * 12.0),
                    StressLevel::Active,
                    level,
                    i as u32 * 1_000,
                )
                .unwrap();
        }
    }

    #[test]
    fn too_few_samples_leaves_network_untouched() {
        let (ml, storage) = scratch_config();
        let mut trainer = Trainer::new(&ml, &storage);
        seed_corpus(&mut trainer, 5);

        let mut network = StressNetwork::new(42);
        let before = network.clone();

        let err = trainer
            .train_model(&mut network, 10, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { have: 5, need: 20 }));
        assert_eq!(network.metadata, before.metadata);
        assert!(!network.is_trained());

        std::fs::remove_dir_all(&storage.data_dir).ok();
    }

    #[test]
    fn training_bumps_version_and_persists() {
        let (ml, storage) = scratch_config();
        let mut trainer = Trainer::new(&ml, &storage);
        seed_corpus(&mut trainer, 24);

        let mut network = StressNetwork::new(42);
        let report = trainer
            .train_model(&mut network, 15, &CancelToken::new())
            .unwrap();

        assert_eq!(report.epochs_run, 15);
        assert_eq!(report.samples, 24);
        assert!(!report.cancelled);
        assert!(report.persisted);
        assert!(report.final_loss.is_finite());

        assert_eq!(network.metadata.version, 1);
        assert_eq!(network.metadata.training_epochs, 15);
        assert_eq!(network.metadata.total_samples, 24);
        assert!(network.is_trained());
        assert!(storage.model_path().exists());

        std::fs::remove_dir_all(&storage.data_dir).ok();
    }

    #[test]
    fn pre_cancelled_run_changes_nothing() {
        let (ml, storage) = scratch_config();
        let mut trainer = Trainer::new(&ml, &storage);
        seed_corpus(&mut trainer, 24);

        let cancel = CancelToken::new();
        cancel.cancel();

        let mut network = StressNetwork::new(42);
        let report = trainer.train_model(&mut network, 10, &cancel).unwrap();

        assert_eq!(report.epochs_run, 0);
        assert!(report.cancelled);
        assert!(!report.persisted);
        assert_eq!(network.metadata.version, 0);
        assert!(!storage.model_path().exists());

        std::fs::remove_dir_all(&storage.data_dir).ok();
    }

    #[test]
    fn loss_improves_over_repeated_training() {
        let (ml, storage) = scratch_config();
        let mut trainer = Trainer::new(&ml, &storage);
        seed_corpus(&mut trainer, 32);

        let mut network = StressNetwork::new(42);
        let first = trainer
            .train_model(&mut network, 1, &CancelToken::new())
            .unwrap();
        let later = trainer
            .train_model(&mut network, 40, &CancelToken::new())
            .unwrap();

        assert!(later.final_loss < first.final_loss);
        assert_eq!(network.metadata.version, 2);

        std::fs::remove_dir_all(&storage.data_dir).ok();
    }
}
