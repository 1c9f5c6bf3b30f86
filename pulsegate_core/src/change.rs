//! Rate-of-change classification for the stress score.
//!
//! The classifier is stateless aside from the single previous score
//! sample the caller hands it. Samples closer together than the
//! configured floor are rejected outright; at tick rates above 1 Hz the
//! noise in a sub-second delta would swamp the signal.

use pulsegate_shared::ChangeTier;

use crate::config::ChangeConfig;

/// A stress score with the timestamp it was computed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePoint {
    pub score: f32,
    pub timestamp_ms: u32,
}

impl ScorePoint {
    pub fn new(score: f32, timestamp_ms: u32) -> Self {
        Self {
            score,
            timestamp_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    config: ChangeConfig,
}

impl ChangeClassifier {
    pub fn new(config: ChangeConfig) -> Self {
        Self { config }
    }

    /// Minimum spacing between classified samples, in milliseconds.
    pub fn min_interval_ms(&self) -> u32 {
        self.config.min_interval_ms
    }

    /// Buckets the score change per minute into a direction-crossed tier.
    ///
    /// Returns [`ChangeTier::None`] when less than the minimum interval
    /// has elapsed, or when the absolute delta sits inside the dead zone.
    pub fn classify(&self, previous: ScorePoint, current: ScorePoint) -> ChangeTier {
        let elapsed_ms = current.timestamp_ms.saturating_sub(previous.timestamp_ms);
        if elapsed_ms < self.config.min_interval_ms || elapsed_ms == 0 {
            return ChangeTier::None;
        }

        let delta = current.score - previous.score;
        if delta.abs() < self.config.dead_zone {
            return ChangeTier::None;
        }

        let per_minute = delta.abs() / (elapsed_ms as f32 / 60_000.0);
        let rising = delta > 0.0;

        if per_minute <= self.config.calm_max {
            if rising {
                ChangeTier::CalmUp
            } else {
                ChangeTier::CalmDown
            }
        } else if per_minute <= self.config.normal_max {
            if rising {
                ChangeTier::NormalUp
            } else {
                ChangeTier::NormalDown
            }
        } else if per_minute <= self.config.fast_max {
            if rising {
                ChangeTier::FastUp
            } else {
                ChangeTier::FastDown
            }
        } else if rising {
            ChangeTier::VeryFastUp
        } else {
            ChangeTier::VeryFastDown
        }
    }
}
