//! Level state machine: timers below the reactive zone, rate-of-change
//! reactions inside it, terminal at the top.
//!
//! Levels 0..=3 advance when their hold timer expires; level 0 jumps
//! straight to level 2 on expiry (observed behavior of the shipped
//! firmware, preserved as-is). Levels 4..=6 react to the change tier and
//! fall back to their (seconds-scale) timer only when no change was
//! classified. Level 7 never times out; only an external reset or a
//! manual override leaves it.

use pulsegate_shared::{ChangeTier, RecommendedAction, StressLevel};

use crate::config::LevelTimerConfig;

/// The rule engine's verdict for one tick, before arbitration.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDecision {
    pub level: StressLevel,
    pub previous: StressLevel,
    pub change_tier: ChangeTier,
    pub action: RecommendedAction,
    pub speed: u8,
    pub vibe: bool,
    pub suction: bool,
}

#[derive(Debug, Clone)]
pub struct RuleEngine {
    timers: LevelTimerConfig,
    level: StressLevel,
    entered_at_ms: u32,
    /// Set by upward change reactions; cleared by downward ones. While
    /// set, vibe/suction stay off regardless of the level default.
    stimulus_suppressed: bool,
}

impl RuleEngine {
    pub fn new(timers: LevelTimerConfig, now_ms: u32) -> Self {
        Self {
            timers,
            level: StressLevel::Baseline,
            entered_at_ms: now_ms,
            stimulus_suppressed: false,
        }
    }

    pub fn level(&self) -> StressLevel {
        self.level
    }

    /// Runs one tick of the state machine.
    pub fn evaluate(&mut self, now_ms: u32, tier: ChangeTier) -> RuleDecision {
        let previous = self.level;
        let mut action = RecommendedAction::Hold;

        if self.level == StressLevel::Peak {
            // Terminal until external reset.
        } else if self.level.is_reactive_zone() {
            match tier {
                ChangeTier::VeryFastUp => {
                    // Safety action: hard drop and kill stimulus.
                    self.transition(StressLevel::Settling, now_ms);
                    self.stimulus_suppressed = true;
                    action = RecommendedAction::EmergencyEase;
                }
                ChangeTier::FastUp => {
                    self.transition(previous.stepped(-1), now_ms);
                    self.stimulus_suppressed = true;
                    action = RecommendedAction::Ease;
                }
                ChangeTier::VeryFastDown => {
                    self.transition(previous.stepped(2), now_ms);
                    self.stimulus_suppressed = false;
                    action = RecommendedAction::Advance;
                }
                ChangeTier::FastDown => {
                    self.transition(previous.stepped(1), now_ms);
                    self.stimulus_suppressed = false;
                    action = RecommendedAction::Advance;
                }
                ChangeTier::CalmUp | ChangeTier::NormalUp => {
                    self.stimulus_suppressed = true;
                }
                ChangeTier::CalmDown | ChangeTier::NormalDown => {
                    self.stimulus_suppressed = false;
                }
                ChangeTier::None => {
                    if self.timer_expired(now_ms) {
                        self.transition(previous.stepped(1), now_ms);
                        action = RecommendedAction::Advance;
                    }
                }
            }
        } else if self.timer_expired(now_ms) {
            // Level 0 skips level 1 entirely on expiry.
            let next = if self.level == StressLevel::Baseline {
                StressLevel::Building
            } else {
                previous.stepped(1)
            };
            self.transition(next, now_ms);
            action = RecommendedAction::Advance;
        }

        self.decision(previous, tier, action)
    }

    /// External reset or manual override to an explicit level.
    pub fn force_level(&mut self, level: StressLevel, now_ms: u32) {
        self.transition(level, now_ms);
        self.stimulus_suppressed = false;
    }

    /// Adopts an arbitrated level without clearing stimulus suppression.
    pub fn sync_level(&mut self, level: StressLevel, now_ms: u32) {
        if level != self.level {
            self.transition(level, now_ms);
        }
    }

    pub fn reset(&mut self, now_ms: u32) {
        self.level = StressLevel::Baseline;
        self.entered_at_ms = now_ms;
        self.stimulus_suppressed = false;
    }

    fn transition(&mut self, level: StressLevel, now_ms: u32) {
        self.level = level;
        self.entered_at_ms = now_ms;
    }

    fn timer_expired(&self, now_ms: u32) -> bool {
        match self.timers.hold_for(self.level.index()) {
            Some(hold) => {
                let elapsed_ms = now_ms.saturating_sub(self.entered_at_ms) as u128;
                elapsed_ms >= hold.as_millis()
            }
            None => false,
        }
    }

    fn decision(
        &self,
        previous: StressLevel,
        tier: ChangeTier,
        action: RecommendedAction,
    ) -> RuleDecision {
        let level = self.level;
        let (vibe, suction) = if level == StressLevel::Peak {
            (true, true)
        } else {
            let on = level.default_stimulus() && !self.stimulus_suppressed;
            (on, on)
        };

        RuleDecision {
            level,
            previous,
            change_tier: tier,
            action,
            speed: level.speed(),
            vibe,
            suction,
        }
    }
}
