//! Structured JSONL logs for offline review.
//!
//! Three append-only streams under the configured data directory:
//! per-tick decisions, session summaries, and training runs. Writers
//! never panic; callers on the tick path treat a failed append as a
//! soft warning.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use pulsegate_shared::StressDecision;

use crate::trainer::TrainReport;

const DECISION_LOG: &str = "decisions.jsonl";
const SESSION_LOG: &str = "sessions.jsonl";
const TRAINING_LOG: &str = "training.jsonl";

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

/// One per-tick record, the decision plus its tick timestamp.
#[derive(Debug, Serialize)]
pub struct DecisionLogEntry<'a> {
    pub tick_ms: u32,
    pub stress_score: f32,
    pub decision: &'a StressDecision,
}

/// End-of-session summary.
#[derive(Debug, Serialize)]
pub struct SessionLogEntry {
    pub session_id: String,
    pub ended_at: DateTime<Utc>,
    pub reason: String,
    pub duration_ms: u32,
    pub final_level: u8,
    pub edge_count: u32,
    pub feedback_count: usize,
    pub orgasm_triggered: bool,
}

/// One training run.
#[derive(Debug, Serialize)]
pub struct TrainingLogEntry<'a> {
    pub recorded_at: DateTime<Utc>,
    pub model_version: u32,
    pub report: &'a TrainReport,
}

/// Writes the JSONL streams into one data directory.
#[derive(Debug, Clone)]
pub struct EngineLogger {
    data_dir: PathBuf,
}

impl EngineLogger {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn log_decision(&self, entry: &DecisionLogEntry<'_>) -> io::Result<()> {
        append_json_line(self.data_dir.join(DECISION_LOG), entry)
    }

    pub fn log_session(&self, entry: &SessionLogEntry) -> io::Result<()> {
        append_json_line(self.data_dir.join(SESSION_LOG), entry)
    }

    pub fn log_training(&self, entry: &TrainingLogEntry<'_>) -> io::Result<()> {
        append_json_line(self.data_dir.join(TRAINING_LOG), entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegate_shared::{ChangeTier, RecommendedAction, StressLevel};
    use uuid::Uuid;

    #[test]
    fn decision_entries_append_as_one_line_each() {
        let dir = std::env::temp_dir().join(format!("pulsegate_logs_{}", Uuid::new_v4()));
        let logger = EngineLogger::new(&dir);

        let decision = StressDecision {
            current_level: StressLevel::Active,
            previous_level: StressLevel::Building,
            change_tier: ChangeTier::NormalUp,
            action: RecommendedAction::Advance,
            speed: 3,
            vibe: true,
            suction: true,
            confidence: 1.0,
            is_ml_prediction: false,
            is_ml_override: false,
            autonomy_used: 0.0,
            reasoning: "timer expiry".to_string(),
        };

        for tick in 0..3u32 {
            logger
                .log_decision(&DecisionLogEntry {
                    tick_ms: tick * 1_000,
                    stress_score: 2.4,
                    decision: &decision,
                })
                .unwrap();
        }

        let contents = std::fs::read_to_string(dir.join(DECISION_LOG)).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert!(contents.lines().all(|l| l.contains("\"current_level\"")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn session_summary_round_trips_through_json() {
        let dir = std::env::temp_dir().join(format!("pulsegate_logs_{}", Uuid::new_v4()));
        let logger = EngineLogger::new(&dir);

        logger
            .log_session(&SessionLogEntry {
                session_id: Uuid::new_v4().to_string(),
                ended_at: Utc::now(),
                reason: "user stop".to_string(),
                duration_ms: 120_000,
                final_level: 4,
                edge_count: 1,
                feedback_count: 2,
                orgasm_triggered: false,
            })
            .unwrap();

        let contents = std::fs::read_to_string(dir.join(SESSION_LOG)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(parsed["final_level"], 4);
        assert_eq!(parsed["reason"], "user stop");

        std::fs::remove_dir_all(&dir).ok();
    }
}
