//! Continuous stress scoring from a single biometric sample.

use pulsegate_shared::BiometricSample;

use crate::config::ScorerConfig;

/// Fixed channel weights; heart rate dominates.
pub const HR_WEIGHT: f32 = 0.4;
pub const TEMP_WEIGHT: f32 = 0.3;
pub const GSR_WEIGHT: f32 = 0.3;

/// Upper bound of the stress score, matching the number of levels.
pub const SCORE_MAX: f32 = 7.0;

/// Pure, deterministic mapping from a sample to a stress score.
///
/// Each channel contributes `max(0, (value - threshold) / span)`; readings
/// below threshold contribute exactly zero, never a calmness bonus.
#[derive(Debug, Clone)]
pub struct StressScorer {
    config: ScorerConfig,
}

impl StressScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// Combined weighted score, clamped to `[0, 7]`.
    pub fn score(&self, sample: &BiometricSample) -> f32 {
        let hr = channel_stress(sample.heart_rate, self.config.hr_high, self.config.hr_span);
        let temp = channel_stress(
            sample.temperature,
            self.config.temp_high,
            self.config.temp_span,
        );
        let gsr = channel_stress(sample.gsr_value, self.config.gsr_high, self.config.gsr_span);

        let combined = hr * HR_WEIGHT + temp * TEMP_WEIGHT + gsr * GSR_WEIGHT;
        (combined * self.config.sensitivity).clamp(0.0, SCORE_MAX)
    }
}

fn channel_stress(value: f32, threshold: f32, span: f32) -> f32 {
    ((value - threshold) / span).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> StressScorer {
        StressScorer::new(ScorerConfig::default())
    }

    #[test]
    fn below_all_thresholds_scores_exactly_zero() {
        let sample = BiometricSample::new(70.0, 36.5, 300.0, 0);
        assert_eq!(scorer().score(&sample), 0.0);
    }

    #[test]
    fn worked_example_from_single_hot_channel() {
        // HR 150 over threshold 140 with span 50 -> 0.2; temp and GSR
        // below threshold -> 0. Combined 0.2 * 0.4 * 1.0 = 0.08.
        let sample = BiometricSample::new(150.0, 37.0, 400.0, 0);
        let score = scorer().score(&sample);
        assert!((score - 0.08).abs() < 1e-6);
    }

    #[test]
    fn calm_channels_never_subtract() {
        let hot_hr_only = BiometricSample::new(150.0, 30.0, 0.0, 0);
        let hot_hr_calm_rest = BiometricSample::new(150.0, 37.4, 499.0, 0);
        // Extremely calm temp/GSR must not score lower than mildly calm.
        assert_eq!(
            scorer().score(&hot_hr_only),
            scorer().score(&hot_hr_calm_rest)
        );
    }

    #[test]
    fn score_clamps_at_seven() {
        let sample = BiometricSample::new(10_000.0, 500.0, 1e9, 0);
        assert_eq!(scorer().score(&sample), SCORE_MAX);
    }

    #[test]
    fn sensitivity_scales_linearly() {
        let config = ScorerConfig {
            sensitivity: 2.0,
            ..ScorerConfig::default()
        };
        let sample = BiometricSample::new(150.0, 37.0, 400.0, 0);
        let score = StressScorer::new(config).score(&sample);
        assert!((score - 0.16).abs() < 1e-6);
    }
}
