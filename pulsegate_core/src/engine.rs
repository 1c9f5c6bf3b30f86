//! The decision engine context.
//!
//! One explicit object owns every component and all mutable session
//! state; the caller drives it with `tick` once per sensor sample. A
//! tick runs Ingest, Scorer, ChangeClassifier, RuleEngine, predictor,
//! permission gate and arbiter to completion with no blocking I/O; the
//! decision-log append is the only write on that path and a failure
//! there is swallowed as a soft warning.

use chrono::Utc;
use uuid::Uuid;

use pulsegate_shared::{BiometricSample, RecommendedAction, StressDecision, StressLevel};

use crate::arbiter::HybridArbiter;
use crate::autonomy::{self, AutonomyControl, AutonomyRuntimeState};
use crate::change::{ChangeClassifier, ScorePoint};
use crate::checkpoint;
use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::logging::{DecisionLogEntry, EngineLogger, SessionLogEntry, TrainingLogEntry};
use crate::neural::StressNetwork;
use crate::rules::RuleEngine;
use crate::sample::SensorHistory;
use crate::scorer::StressScorer;
use crate::trainer::{CancelToken, TrainReport, Trainer};

/// Per-session bookkeeping.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub id: String,
    pub started_at_ms: u32,
    /// Sessions started since this engine was built, this one included.
    pub total_sessions: u32,
    pub feedback_count: usize,
}

/// Owns the full decision pipeline and its state.
pub struct DecisionEngine {
    config: EngineConfig,
    scorer: StressScorer,
    classifier: ChangeClassifier,
    rules: RuleEngine,
    network: StressNetwork,
    arbiter: HybridArbiter,
    trainer: Trainer,
    logger: EngineLogger,
    autonomy: AutonomyControl,
    runtime: AutonomyRuntimeState,
    history: SensorHistory,
    previous_point: Option<ScorePoint>,
    last_decision: Option<StressDecision>,
    last_score: f32,
    session: Option<SessionState>,
    total_sessions: u32,
}

impl DecisionEngine {
    /// Builds an engine from config, loading a persisted model when one
    /// exists. A missing or unreadable model blob is not an error; the
    /// engine simply starts rule-only with a fresh network.
    pub fn new(config: EngineConfig) -> Self {
        let network = checkpoint::load_model(&config.storage.model_path())
            .map(|(network, _accuracy)| network)
            .unwrap_or_else(|_| StressNetwork::new(config.ml.seed));

        Self {
            scorer: StressScorer::new(config.scorer.clone()),
            classifier: ChangeClassifier::new(config.change.clone()),
            rules: RuleEngine::new(config.levels.clone(), 0),
            network,
            arbiter: HybridArbiter::new(&config.ml),
            trainer: Trainer::new(&config.ml, &config.storage),
            logger: EngineLogger::new(config.storage.data_dir.clone()),
            autonomy: AutonomyControl::new(0.0),
            runtime: AutonomyRuntimeState::new(),
            history: SensorHistory::new(),
            previous_point: None,
            last_decision: None,
            last_score: 0.0,
            session: None,
            total_sessions: 0,
            config,
        }
    }

    /// Cloneable handle for a settings surface on another thread.
    pub fn autonomy_control(&self) -> AutonomyControl {
        self.autonomy.clone()
    }

    /// Clamped to [0,100]; takes effect at the next tick.
    pub fn set_autonomy_level(&self, percent: f32) {
        self.autonomy.set(percent);
    }

    pub fn current_level(&self) -> StressLevel {
        self.rules.level()
    }

    pub fn last_score(&self) -> f32 {
        self.last_score
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn network(&self) -> &StressNetwork {
        &self.network
    }

    pub fn start_session(&mut self, now_ms: u32) {
        self.total_sessions += 1;
        self.runtime.reset();
        self.runtime.session_active = true;
        self.rules.reset(now_ms);
        self.history.clear();
        self.previous_point = None;
        self.last_decision = None;
        self.last_score = 0.0;
        self.trainer.store_mut().clear_session();
        self.session = Some(SessionState {
            id: Uuid::new_v4().to_string(),
            started_at_ms: now_ms,
            total_sessions: self.total_sessions,
            feedback_count: 0,
        });
    }

    /// Ends the session and flushes a JSONL summary. The summary write
    /// is best-effort.
    pub fn end_session(&mut self, now_ms: u32, reason: &str) {
        if let Some(session) = self.session.take() {
            let entry = SessionLogEntry {
                session_id: session.id,
                ended_at: Utc::now(),
                reason: reason.to_string(),
                duration_ms: now_ms.saturating_sub(session.started_at_ms),
                final_level: self.rules.level().index() as u8,
                edge_count: self.runtime.edge_count,
                feedback_count: session.feedback_count,
                orgasm_triggered: self.runtime.orgasm_triggered,
            };
            let _ = self.logger.log_session(&entry);
        }
        self.runtime.session_active = false;
    }

    pub fn pause(&mut self) {
        self.runtime.paused = true;
    }

    pub fn resume(&mut self) {
        self.runtime.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.runtime.paused
    }

    /// Runs one decision tick for a fresh sensor sample.
    pub fn tick(&mut self, sample: BiometricSample) -> StressDecision {
        // The autonomy percent is read exactly once per tick; a settings
        // write lands between ticks, never inside one.
        let autonomy_percent = self.autonomy.get();
        let now_ms = sample.timestamp_ms;

        if self.runtime.paused {
            let decision = self.hold_decision();
            self.last_decision = Some(decision.clone());
            return decision;
        }

        self.history.push(sample);
        let score = self.scorer.score(&sample);
        self.last_score = score;

        let current_point = ScorePoint::new(score, now_ms);
        let tier = match self.previous_point {
            Some(previous) => {
                let tier = self.classifier.classify(previous, current_point);
                // The reference point only advances once the temporal
                // floor has passed, so slow drifts still accumulate.
                if now_ms.saturating_sub(previous.timestamp_ms) >= self.classifier.min_interval_ms()
                {
                    self.previous_point = Some(current_point);
                }
                tier
            }
            None => {
                self.previous_point = Some(current_point);
                pulsegate_shared::ChangeTier::None
            }
        };

        let rule_decision = self.rules.evaluate(now_ms, tier);

        let session_time_sec = self
            .session
            .as_ref()
            .map(|s| now_ms.saturating_sub(s.started_at_ms) as f32 / 1_000.0)
            .unwrap_or(0.0);
        let context = self.history.context(
            self.runtime.edge_count,
            self.runtime.time_since_edge_sec(now_ms),
            rule_decision.level,
            session_time_sec,
        );

        let prediction = if self.config.ml.enabled {
            self.network.predict(&context)
        } else {
            None
        };

        let profile = autonomy::lookup(autonomy_percent);
        let decision = self.arbiter.arbitrate(
            &rule_decision,
            prediction,
            profile,
            &mut self.runtime,
            autonomy_percent,
            now_ms,
        );

        // Commit the arbitrated level so timers resume from it.
        self.rules.sync_level(decision.current_level, now_ms);
        self.runtime.current_level = decision.current_level;
        if decision.action == RecommendedAction::Trigger {
            self.runtime.orgasm_triggered = true;
        }

        let _ = self.logger.log_decision(&DecisionLogEntry {
            tick_ms: now_ms,
            stress_score: score,
            decision: &decision,
        });

        self.last_decision = Some(decision.clone());
        decision
    }

    /// The human corrected (or confirmed) the current level.
    ///
    /// The engine's prior choice is kept as the machine label, the
    /// human's as ground truth, and the rule engine adopts the human's
    /// level immediately. A failed durable append is reported but the
    /// in-memory state still advances.
    pub fn user_override(&mut self, level: StressLevel, now_ms: u32) -> EngineResult<()> {
        let ai_level = self
            .last_decision
            .as_ref()
            .map(|d| d.current_level)
            .unwrap_or_else(|| self.rules.level());

        let session_time_sec = self
            .session
            .as_ref()
            .map(|s| now_ms.saturating_sub(s.started_at_ms) as f32 / 1_000.0)
            .unwrap_or(0.0);
        let context = self.history.context(
            self.runtime.edge_count,
            self.runtime.time_since_edge_sec(now_ms),
            ai_level,
            session_time_sec,
        );

        self.rules.force_level(level, now_ms);
        self.runtime.current_level = level;
        if let Some(session) = self.session.as_mut() {
            session.feedback_count += 1;
        }

        self.trainer.log_feedback(context, ai_level, level, now_ms)
    }

    /// Records an edge if the active profile still has allowance for
    /// one, and reports whether it was accepted.
    ///
    /// A refusal means the edge zone is locked at this autonomy level
    /// or the per-session cap is exhausted; the driver must back the
    /// session away from the edge.
    pub fn log_edge_event(&mut self, now_ms: u32) -> bool {
        let profile = autonomy::lookup(self.autonomy.get());
        if !autonomy::may_enter_edge_zone(profile) {
            return false;
        }
        if let Some(cap) = autonomy::max_edges(profile) {
            if self.runtime.edge_count >= cap {
                return false;
            }
        }
        self.runtime.record_edge(now_ms);
        true
    }

    pub fn log_orgasm_event(&mut self) {
        self.runtime.orgasm_triggered = true;
    }

    /// Retrains the network from the durable feedback corpus and logs a
    /// training record. Runs off the tick path; see [`Trainer`].
    pub fn train(&mut self, epochs: usize, cancel: &CancelToken) -> EngineResult<TrainReport> {
        let report = self.trainer.train_model(&mut self.network, epochs, cancel)?;
        let _ = self.logger.log_training(&TrainingLogEntry {
            recorded_at: Utc::now(),
            model_version: self.network.metadata.version,
            report: &report,
        });
        Ok(report)
    }

    /// Samples collected toward the training floor this session.
    pub fn feedback_session_count(&self) -> usize {
        self.trainer.store().session_samples().len()
    }

    /// "Hold current level, zero vibe/suction" for a paused session.
    fn hold_decision(&self) -> StressDecision {
        let level = self.rules.level();
        StressDecision {
            current_level: level,
            previous_level: level,
            change_tier: pulsegate_shared::ChangeTier::None,
            action: RecommendedAction::Hold,
            speed: level.speed(),
            vibe: false,
            suction: false,
            confidence: 1.0,
            is_ml_prediction: false,
            is_ml_override: false,
            autonomy_used: 0.0,
            reasoning: "session paused".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, StorageConfig};
    use std::path::PathBuf;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pulsegate_engine_{}", Uuid::new_v4()))
    }

    fn engine_with_dir(dir: &std::path::Path) -> DecisionEngine {
        let mut config = EngineConfig::default();
        config.storage = StorageConfig {
            data_dir: dir.to_path_buf(),
            feedback_file: "feedback_log.csv".to_string(),
            model_file: "stress_model.bin".to_string(),
        };
        DecisionEngine::new(config)
    }

    fn calm_sample(ts: u32) -> BiometricSample {
        BiometricSample::new(65.0, 36.5, 200.0, ts)
    }

    #[test]
    fn paused_tick_holds_with_stimulus_off() {
        let dir = scratch_dir();
        let mut engine = engine_with_dir(&dir);
        engine.start_session(0);
        engine.pause();

        let decision = engine.tick(calm_sample(1_000));
        assert_eq!(decision.action, RecommendedAction::Hold);
        assert!(!decision.vibe);
        assert!(!decision.suction);
        assert!(!decision.is_ml_prediction);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn untrained_engine_runs_rule_only() {
        let dir = scratch_dir();
        let mut engine = engine_with_dir(&dir);
        engine.start_session(0);
        engine.set_autonomy_level(100.0);

        let decision = engine.tick(calm_sample(1_000));
        assert!(!engine.network().is_trained());
        assert!(!decision.is_ml_prediction);
        assert_eq!(decision.current_level, StressLevel::Baseline);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn user_override_records_feedback_and_moves_level() {
        let dir = scratch_dir();
        let mut engine = engine_with_dir(&dir);
        engine.start_session(0);
        engine.tick(calm_sample(1_000));

        engine.user_override(StressLevel::Elevated, 2_000).unwrap();
        assert_eq!(engine.current_level(), StressLevel::Elevated);
        assert_eq!(engine.feedback_session_count(), 1);
        assert_eq!(engine.session().unwrap().feedback_count, 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn autonomy_handle_is_shared_with_the_engine() {
        let dir = scratch_dir();
        let engine = engine_with_dir(&dir);
        let handle = engine.autonomy_control();

        handle.set(60.0);
        assert_eq!(engine.autonomy.get(), 60.0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn edge_cap_is_enforced_per_session() {
        let dir = scratch_dir();
        let mut engine = engine_with_dir(&dir);
        engine.start_session(0);

        // 50%: edge zone open, one edge per session.
        engine.set_autonomy_level(50.0);
        assert!(engine.log_edge_event(1_000));
        assert!(!engine.log_edge_event(2_000));
        assert_eq!(engine.runtime.edge_count, 1);

        // 30%: edge zone locked outright.
        engine.set_autonomy_level(30.0);
        assert!(!engine.log_edge_event(3_000));

        // A new session re-arms the allowance.
        engine.set_autonomy_level(50.0);
        engine.start_session(10_000);
        assert!(engine.log_edge_event(11_000));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn session_lifecycle_writes_a_summary() {
        let dir = scratch_dir();
        let mut engine = engine_with_dir(&dir);

        engine.start_session(0);
        engine.set_autonomy_level(60.0);
        engine.tick(calm_sample(1_000));
        assert!(engine.log_edge_event(5_000));
        engine.end_session(10_000, "user stop");

        assert!(engine.session().is_none());
        let contents = std::fs::read_to_string(dir.join("sessions.jsonl")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed["reason"], "user stop");
        assert_eq!(parsed["edge_count"], 1);
        assert_eq!(parsed["duration_ms"], 10_000);

        std::fs::remove_dir_all(&dir).ok();
    }
}
