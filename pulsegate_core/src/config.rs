//! Engine configuration management via TOML files.
//!
//! Each section is parsed with per-field defaults and clamping so that a
//! partial or missing file always yields a usable configuration. Only the
//! compiled-in autonomy table is beyond configuration; everything tunable
//! about scoring, change classification, level timers, ML arbitration and
//! storage locations lives here.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use toml::Value;

/// Complete engine configuration.
///
/// # Examples
///
/// ```
/// use pulsegate_core::config::EngineConfig;
///
/// let config = EngineConfig::load_from_file("config/engine.toml")
///     .unwrap_or_else(|_| EngineConfig::default());
/// assert!(config.scorer.sensitivity > 0.0);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineConfig {
    pub scorer: ScorerConfig,
    pub change: ChangeConfig,
    pub levels: LevelTimerConfig,
    pub ml: MlConfig,
    pub storage: StorageConfig,
}

impl EngineConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let value: Value =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;

        Ok(Self {
            scorer: ScorerConfig::from_value(&value),
            change: ChangeConfig::from_value(&value),
            levels: LevelTimerConfig::from_value(&value)?,
            ml: MlConfig::from_value(&value),
            storage: StorageConfig::from_value(&value),
        })
    }
}

/// Thresholds, normalization spans and sensitivity for the stress scorer.
#[derive(Debug, Clone, Serialize)]
pub struct ScorerConfig {
    /// Heart-rate threshold in bpm; readings below contribute zero.
    pub hr_high: f32,
    pub hr_span: f32,
    /// Skin-temperature threshold in °C.
    pub temp_high: f32,
    pub temp_span: f32,
    /// GSR threshold in raw units.
    pub gsr_high: f32,
    pub gsr_span: f32,
    /// Global multiplier applied to the combined score.
    pub sensitivity: f32,
}

impl ScorerConfig {
    fn from_value(value: &Value) -> Self {
        let table = section(value, "scorer");
        let defaults = Self::default();

        Self {
            hr_high: float_field(&table, "hr_high", defaults.hr_high).max(0.0),
            hr_span: float_field(&table, "hr_span", defaults.hr_span).max(1.0),
            temp_high: float_field(&table, "temp_high", defaults.temp_high),
            temp_span: float_field(&table, "temp_span", defaults.temp_span).max(0.1),
            gsr_high: float_field(&table, "gsr_high", defaults.gsr_high).max(0.0),
            gsr_span: float_field(&table, "gsr_span", defaults.gsr_span).max(1.0),
            sensitivity: float_field(&table, "sensitivity", defaults.sensitivity)
                .clamp(0.1, 5.0),
        }
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            hr_high: 140.0,
            hr_span: 50.0,
            temp_high: 37.5,
            temp_span: 1.5,
            gsr_high: 500.0,
            gsr_span: 500.0,
            sensitivity: 1.0,
        }
    }
}

/// Rate-of-change classification thresholds, in score change per minute.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeConfig {
    /// Minimum elapsed milliseconds between classified samples.
    pub min_interval_ms: u32,
    /// Absolute score deltas below this are reported as no change.
    pub dead_zone: f32,
    /// Upper bound of the calm tier.
    pub calm_max: f32,
    /// Upper bound of the normal tier.
    pub normal_max: f32,
    /// Upper bound of the fast tier; faster is very fast.
    pub fast_max: f32,
}

impl ChangeConfig {
    fn from_value(value: &Value) -> Self {
        let table = section(value, "change");
        let defaults = Self::default();

        let calm_max = float_field(&table, "calm_max", defaults.calm_max).max(0.01);
        let normal_max = float_field(&table, "normal_max", defaults.normal_max).max(calm_max);
        let fast_max = float_field(&table, "fast_max", defaults.fast_max).max(normal_max);

        Self {
            min_interval_ms: int_field(&table, "min_interval_ms", defaults.min_interval_ms as i64)
                .max(0) as u32,
            dead_zone: float_field(&table, "dead_zone", defaults.dead_zone).max(0.0),
            calm_max,
            normal_max,
            fast_max,
        }
    }
}

impl Default for ChangeConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 1_000,
            dead_zone: 0.1,
            calm_max: 0.5,
            normal_max: 1.5,
            fast_max: 3.0,
        }
    }
}

/// Per-level hold timers.
///
/// The original table mixes units (minutes for levels 0..=3, seconds for
/// 4..=6); the values are kept as configuration in their original units
/// and normalized to [`Duration`] through [`LevelTimerConfig::hold_for`].
/// Level 7 has no timeout.
#[derive(Debug, Clone, Serialize)]
pub struct LevelTimerConfig {
    /// Hold durations for levels 0..=3, in minutes.
    pub timer_minutes: [f32; 4],
    /// Hold durations for levels 4..=6, in seconds.
    pub reactive_seconds: [f32; 3],
}

impl LevelTimerConfig {
    fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let table = section(value, "levels");
        let defaults = Self::default();

        let timer_minutes = float_array(&table, "timer_minutes", defaults.timer_minutes)?;
        let reactive_seconds =
            float_array(&table, "reactive_seconds", defaults.reactive_seconds)?;

        Ok(Self {
            timer_minutes,
            reactive_seconds,
        })
    }

    /// Normalized hold duration before `level` auto-advances.
    ///
    /// Returns `None` for level 7 (terminal until external reset).
    pub fn hold_for(&self, level: usize) -> Option<Duration> {
        match level {
            0..=3 => Some(Duration::from_secs_f32(
                (self.timer_minutes[level] * 60.0).max(0.0),
            )),
            4..=6 => Some(Duration::from_secs_f32(
                self.reactive_seconds[level - 4].max(0.0),
            )),
            _ => None,
        }
    }
}

impl Default for LevelTimerConfig {
    fn default() -> Self {
        Self {
            timer_minutes: [5.0, 4.0, 4.0, 3.0],
            reactive_seconds: [90.0, 60.0, 45.0],
        }
    }
}

/// Hybrid arbitration and training parameters.
#[derive(Debug, Clone, Serialize)]
pub struct MlConfig {
    /// Master switch; when false the engine is rule-only.
    pub enabled: bool,
    /// Below this confidence the predictor never acts.
    pub override_confidence: f32,
    /// Above this confidence ML vibe/suction choices are adopted in the
    /// blend band.
    pub high_confidence: f32,
    /// Constant SGD learning rate.
    pub learning_rate: f32,
    /// Training refuses to run below this many durable samples.
    pub min_training_samples: usize,
    /// Seed for weight initialization and shuffling.
    pub seed: u64,
}

impl MlConfig {
    fn from_value(value: &Value) -> Self {
        let table = section(value, "ml");
        let defaults = Self::default();

        Self {
            enabled: bool_field(&table, "enabled", defaults.enabled),
            override_confidence: float_field(
                &table,
                "override_confidence",
                defaults.override_confidence,
            )
            .clamp(0.0, 1.0),
            high_confidence: float_field(&table, "high_confidence", defaults.high_confidence)
                .clamp(0.0, 1.0),
            learning_rate: float_field(&table, "learning_rate", defaults.learning_rate)
                .clamp(1e-5, 1.0),
            min_training_samples: int_field(
                &table,
                "min_training_samples",
                defaults.min_training_samples as i64,
            )
            .max(1) as usize,
            seed: int_field(&table, "seed", defaults.seed as i64).max(0) as u64,
        }
    }
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            override_confidence: 0.6,
            high_confidence: 0.8,
            learning_rate: 0.05,
            min_training_samples: 20,
            seed: 42,
        }
    }
}

/// Storage locations for the feedback log, model blob and JSONL logs.
#[derive(Debug, Clone, Serialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub feedback_file: String,
    pub model_file: String,
}

impl StorageConfig {
    fn from_value(value: &Value) -> Self {
        let table = section(value, "storage");
        let defaults = Self::default();

        Self {
            data_dir: string_field(
                &table,
                "data_dir",
                defaults.data_dir.to_string_lossy().as_ref(),
            )
            .into(),
            feedback_file: string_field(&table, "feedback_file", &defaults.feedback_file),
            model_file: string_field(&table, "model_file", &defaults.model_file),
        }
    }

    pub fn feedback_path(&self) -> PathBuf {
        self.data_dir.join(&self.feedback_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.data_dir.join(&self.model_file)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            feedback_file: "feedback_log.csv".to_string(),
            model_file: "stress_model.bin".to_string(),
        }
    }
}

fn section(value: &Value, name: &str) -> toml::value::Table {
    value
        .get(name)
        .and_then(|v| v.as_table())
        .cloned()
        .unwrap_or_default()
}

fn float_field(table: &toml::value::Table, key: &str, default: f32) -> f32 {
    table
        .get(key)
        .map(|value| {
            if let Some(float) = value.as_float() {
                float as f32
            } else if let Some(int) = value.as_integer() {
                int as f32
            } else {
                default
            }
        })
        .unwrap_or(default)
}

fn int_field(table: &toml::value::Table, key: &str, default: i64) -> i64 {
    table
        .get(key)
        .and_then(|v| v.as_integer())
        .unwrap_or(default)
}

fn bool_field(table: &toml::value::Table, key: &str, default: bool) -> bool {
    table.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn string_field(table: &toml::value::Table, key: &str, default: &str) -> String {
    table
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}

fn float_array<const N: usize>(
    table: &toml::value::Table,
    key: &str,
    default: [f32; N],
) -> Result<[f32; N], ConfigError> {
    let Some(value) = table.get(key) else {
        return Ok(default);
    };
    let items = value
        .as_array()
        .ok_or_else(|| ConfigError::Parse(format!("{key} must be an array")))?;
    if items.len() != N {
        return Err(ConfigError::Parse(format!(
            "{key} must have exactly {N} entries, found {}",
            items.len()
        )));
    }

    let mut out = default;
    for (slot, item) in out.iter_mut().zip(items.iter()) {
        let parsed = if let Some(float) = item.as_float() {
            float as f32
        } else if let Some(int) = item.as_integer() {
            int as f32
        } else {
            return Err(ConfigError::Parse(format!("{key} entries must be numeric")));
        };
        if parsed < 0.0 {
            return Err(ConfigError::Parse(format!(
                "{key} entries must be non-negative"
            )));
        }
        *slot = parsed;
    }
    Ok(out)
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let config = EngineConfig::from_str("").unwrap();
        assert_eq!(config.scorer.hr_high, 140.0);
        assert_eq!(config.change.min_interval_ms, 1_000);
        assert_eq!(config.ml.min_training_samples, 20);
        assert_eq!(config.storage.feedback_file, "feedback_log.csv");
    }

    #[test]
    fn parses_custom_values() {
        let toml = r#"
[scorer]
hr_high = 130
sensitivity = 1.5

[change]
dead_zone = 0.2
fast_max = 4.0

[ml]
enabled = false
override_confidence = 0.7

[storage]
data_dir = "/tmp/pulsegate"
"#;
        let config = EngineConfig::from_str(toml).unwrap();
        assert_eq!(config.scorer.hr_high, 130.0);
        assert!((config.scorer.sensitivity - 1.5).abs() < f32::EPSILON);
        assert!((config.change.dead_zone - 0.2).abs() < f32::EPSILON);
        assert!(!config.ml.enabled);
        assert!((config.ml.override_confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(
            config.storage.model_path(),
            PathBuf::from("/tmp/pulsegate/stress_model.bin")
        );
    }

    #[test]
    fn sensitivity_is_clamped() {
        let config = EngineConfig::from_str("[scorer]\nsensitivity = 99.0").unwrap();
        assert!((config.scorer.sensitivity - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn change_tiers_stay_ordered() {
        let toml = "[change]\ncalm_max = 2.0\nnormal_max = 1.0\nfast_max = 0.5";
        let config = EngineConfig::from_str(toml).unwrap();
        assert!(config.change.calm_max <= config.change.normal_max);
        assert!(config.change.normal_max <= config.change.fast_max);
    }

    #[test]
    fn level_timers_normalize_units() {
        let config = EngineConfig::default();
        assert_eq!(
            config.levels.hold_for(0),
            Some(Duration::from_secs(300))
        );
        assert_eq!(config.levels.hold_for(4), Some(Duration::from_secs(90)));
        assert_eq!(config.levels.hold_for(7), None);
    }

    #[test]
    fn timer_array_wrong_length_is_rejected() {
        let toml = "[levels]\ntimer_minutes = [1.0, 2.0]";
        assert!(EngineConfig::from_str(toml).is_err());
    }

    #[test]
    fn custom_timer_arrays_parse() {
        let toml = "[levels]\ntimer_minutes = [1, 1, 1, 1]\nreactive_seconds = [10.0, 10.0, 5.0]";
        let config = EngineConfig::from_str(toml).unwrap();
        assert_eq!(config.levels.hold_for(1), Some(Duration::from_secs(60)));
        assert_eq!(config.levels.hold_for(6), Some(Duration::from_secs(5)));
    }
}
