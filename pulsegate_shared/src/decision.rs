//! Decision records emitted by the engine once per tick.
//!
//! Only `speed`, `vibe` and `suction` are contractually meaningful to the
//! actuator drivers; `confidence` and `reasoning` are diagnostic and must
//! never be used as control-flow signals.

use serde::{Deserialize, Serialize};

/// Bounded stress classification, totally ordered from calm to peak.
///
/// Invariant: a level is never observed outside 0..=7. All constructors
/// clamp; arithmetic goes through [`StressLevel::stepped`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StressLevel {
    Baseline = 0,
    Settling = 1,
    Building = 2,
    Active = 3,
    Elevated = 4,
    High = 5,
    Intense = 6,
    Peak = 7,
}

impl StressLevel {
    pub const COUNT: usize = 8;
    pub const MIN: StressLevel = StressLevel::Baseline;
    pub const MAX: StressLevel = StressLevel::Peak;

    /// Returns the level for `index`, or `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(StressLevel::Baseline),
            1 => Some(StressLevel::Settling),
            2 => Some(StressLevel::Building),
            3 => Some(StressLevel::Active),
            4 => Some(StressLevel::Elevated),
            5 => Some(StressLevel::High),
            6 => Some(StressLevel::Intense),
            7 => Some(StressLevel::Peak),
            _ => None,
        }
    }

    /// Clamping constructor. An out-of-range input is a programming
    /// error upstream; debug builds assert, release builds clamp.
    pub fn from_clamped(value: i32) -> Self {
        debug_assert!(
            (0..=7).contains(&value),
            "stress level out of range: {value}"
        );
        Self::from_index(value.clamp(0, 7) as usize).unwrap_or(StressLevel::Peak)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Moves `delta` levels, clamped at both ends.
    pub fn stepped(self, delta: i32) -> Self {
        Self::from_clamped(self.index() as i32 + delta)
    }

    /// Actuation speed for this level (1..=7, identity after offset).
    pub fn speed(self) -> u8 {
        (self.index() as u8).max(1)
    }

    /// Levels 4..=6 react to rate-of-change rather than timers.
    pub fn is_reactive_zone(self) -> bool {
        matches!(
            self,
            StressLevel::Elevated | StressLevel::High | StressLevel::Intense
        )
    }

    /// Default vibe/suction recommendation for this level.
    pub fn default_stimulus(self) -> bool {
        self >= StressLevel::Building
    }
}

/// Direction-crossed magnitude tier of score change per minute.
///
/// Derived each tick from the previous score sample; never persisted.
/// "Up" means the stress score is rising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeTier {
    None,
    CalmUp,
    CalmDown,
    NormalUp,
    NormalDown,
    FastUp,
    FastDown,
    VeryFastUp,
    VeryFastDown,
}

impl ChangeTier {
    pub fn is_upward(self) -> bool {
        matches!(
            self,
            ChangeTier::CalmUp | ChangeTier::NormalUp | ChangeTier::FastUp | ChangeTier::VeryFastUp
        )
    }

    pub fn is_downward(self) -> bool {
        matches!(
            self,
            ChangeTier::CalmDown
                | ChangeTier::NormalDown
                | ChangeTier::FastDown
                | ChangeTier::VeryFastDown
        )
    }
}

/// What the engine recommends the actuators do this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    /// Keep the current level and settings.
    Hold,
    /// Advance to a higher level.
    Advance,
    /// Back off one or more levels.
    Ease,
    /// Safety drop; overrides everything else.
    EmergencyEase,
    /// Fire the terminal actuation sequence (gated by permission table).
    Trigger,
}

/// The triple the actuator drivers actually consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// Stroke/drive speed, 1..=7.
    pub speed: u8,
    pub vibe: bool,
    pub suction: bool,
}

/// Final per-tick decision. Created fresh each tick, never mutated after
/// construction, consumed immediately by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressDecision {
    pub current_level: StressLevel,
    pub previous_level: StressLevel,
    pub change_tier: ChangeTier,
    pub action: RecommendedAction,
    /// Stroke/drive speed, 1..=7.
    pub speed: u8,
    pub vibe: bool,
    pub suction: bool,
    /// Predictor confidence in [0,1]; 1.0 for pure rule decisions.
    pub confidence: f32,
    /// True when a machine-learned candidate contributed to the decision.
    pub is_ml_prediction: bool,
    /// True when the ML candidate replaced the rule decision wholesale.
    pub is_ml_override: bool,
    /// Autonomy fraction in [0,1] that was in effect for this tick.
    pub autonomy_used: f32,
    /// Diagnostic only. Tests assert the structured fields, not this.
    pub reasoning: String,
}

impl StressDecision {
    /// Projects the contractually meaningful actuator fields.
    pub fn actuator_command(&self) -> ActuatorCommand {
        ActuatorCommand {
            speed: self.speed,
            vibe: self.vibe,
            suction: self.suction,
        }
    }
}
