//! Rule/ML arbitration.
//!
//! The rule engine's decision is the baseline; the predictor may
//! influence it only in proportion to the operator's autonomy setting,
//! and every machine-chosen level still passes the permission gate.
//! Precedence is strict: safety overrides first, then the rule-only
//! bail-outs, then the autonomy bands.

use pulsegate_shared::{RecommendedAction, StressDecision, StressLevel};

use crate::autonomy::{self, AutonomyProfile, AutonomyRuntimeState};
use crate::config::MlConfig;
use crate::neural::MlPrediction;
use crate::rules::RuleDecision;

/// Autonomy fraction below which ML may only nudge speed.
const NUDGE_BAND_MAX: f32 = 0.20;
/// Autonomy fraction below which ML blends rather than overrides.
const BLEND_BAND_MAX: f32 = 0.50;

/// Combines the rule decision with an optional ML candidate.
#[derive(Debug, Clone)]
pub struct HybridArbiter {
    ml_enabled: bool,
    override_confidence: f32,
    high_confidence: f32,
}

impl HybridArbiter {
    pub fn new(ml: &MlConfig) -> Self {
        Self {
            ml_enabled: ml.enabled,
            override_confidence: ml.override_confidence,
            high_confidence: ml.high_confidence,
        }
    }

    /// Produces the final decision for one tick.
    ///
    /// `runtime` is mutated only for temporary-dip bookkeeping; the
    /// caller commits the resulting level afterwards.
    pub fn arbitrate(
        &self,
        rule: &RuleDecision,
        prediction: Option<MlPrediction>,
        profile: &'static AutonomyProfile,
        runtime: &mut AutonomyRuntimeState,
        autonomy_percent: f32,
        now_ms: u32,
    ) -> StressDecision {
        // Safety override: an emergency ease out of the reactive zone is
        // never softened by the predictor.
        if rule.action == RecommendedAction::EmergencyEase {
            return rule_only(rule, prediction, "emergency ease, ml bypassed");
        }

        let prediction = match prediction {
            Some(p) if self.ml_enabled => p,
            Some(_) => return rule_only(rule, None, "ml disabled"),
            None => return rule_only(rule, None, "no trained model"),
        };

        if prediction.confidence < self.override_confidence {
            return rule_only(rule, Some(prediction), "confidence below override threshold");
        }
        if autonomy_percent <= 0.0 {
            return rule_only(rule, Some(prediction), "autonomy at zero");
        }

        let autonomy_used = (autonomy_percent / 100.0).clamp(0.0, 1.0);
        let ml_speed = prediction.level.speed();

        if autonomy_used < NUDGE_BAND_MAX {
            // Level untouched; speed may move by exactly one step.
            let mut decision = rule_only(rule, Some(prediction), "nudge band");
            decision.autonomy_used = autonomy_used;
            if ml_speed.abs_diff(rule.speed) == 1 {
                decision.speed = ml_speed;
                decision.is_ml_override = true;
                decision.reasoning = format!(
                    "nudge band: speed {} -> {} at {:.0}% autonomy",
                    rule.speed, ml_speed, autonomy_percent
                );
            }
            return decision;
        }

        if autonomy_used < BLEND_BAND_MAX {
            let gated = gate_level(rule.level, profile, runtime, now_ms);
            let blended =
                (ml_speed as f32 * autonomy_used + rule.speed as f32 * (1.0 - autonomy_used))
                    .round() as u8;
            let speed = blended.clamp(1, StressLevel::Peak.speed());

            let adopt_stimulus = prediction.confidence > self.high_confidence;
            let (vibe, suction) = if adopt_stimulus {
                let ml_stimulus = prediction.level.default_stimulus();
                (
                    ml_stimulus && autonomy::may_use_vibe(profile),
                    ml_stimulus && autonomy::may_use_suction(profile),
                )
            } else {
                (rule.vibe, rule.suction)
            };

            return StressDecision {
                current_level: gated,
                previous_level: rule.previous,
                change_tier: rule.change_tier,
                action: rule.action,
                speed,
                vibe,
                suction,
                confidence: prediction.confidence,
                is_ml_prediction: true,
                is_ml_override: speed != rule.speed || adopt_stimulus,
                autonomy_used,
                reasoning: format!(
                    "blend band: speed {} (rule {}, ml {}) at {:.0}% autonomy",
                    speed, rule.speed, ml_speed, autonomy_percent
                ),
            };
        }

        // Full-override band: the ML level is adopted wholesale, then
        // gated and floored.
        let floored = prediction.level.max(profile.min_level);
        let gated = gate_level(floored, profile, runtime, now_ms);

        // A trigger needs explicit permission; otherwise hold in place.
        let wants_trigger =
            prediction.level == StressLevel::Peak && prediction.confidence >= self.high_confidence;
        let (level, action) = if wants_trigger && !autonomy::may_trigger_orgasm(profile) {
            (
                gate_level(rule.level.max(profile.min_level), profile, runtime, now_ms),
                RecommendedAction::Hold,
            )
        } else if wants_trigger {
            (gated, RecommendedAction::Trigger)
        } else if gated > rule.level {
            (gated, RecommendedAction::Advance)
        } else if gated < rule.level {
            (gated, RecommendedAction::Ease)
        } else {
            (gated, RecommendedAction::Hold)
        };

        let stimulus = level.default_stimulus();
        StressDecision {
            current_level: level,
            previous_level: rule.previous,
            change_tier: rule.change_tier,
            action,
            speed: level.speed(),
            vibe: stimulus && autonomy::may_use_vibe(profile),
            suction: stimulus && autonomy::may_use_suction(profile),
            confidence: prediction.confidence,
            is_ml_prediction: true,
            is_ml_override: true,
            autonomy_used,
            reasoning: format!(
                "override band: ml level {:?} gated to {:?} at {:.0}% autonomy",
                prediction.level, level, autonomy_percent
            ),
        }
    }
}

/// Clamps a candidate level to what the profile permits, starting or
/// consuming a temporary dip when one is available.
fn gate_level(
    candidate: StressLevel,
    profile: &AutonomyProfile,
    runtime: &mut AutonomyRuntimeState,
    now_ms: u32,
) -> StressLevel {
    if candidate <= profile.max_level_permanent {
        runtime.clear_dip();
        return candidate;
    }

    match profile.max_level_temporary {
        Some(ceiling) => {
            if !runtime.in_temporary_dip {
                runtime.begin_dip(now_ms);
            }
            if runtime.dip_active(now_ms, profile) {
                candidate.min(ceiling)
            } else {
                profile.max_level_permanent
            }
        }
        None => profile.max_level_permanent,
    }
}

/// The rule decision verbatim, annotated with whatever the predictor
/// said even though it did not act.
fn rule_only(
    rule: &RuleDecision,
    prediction: Option<MlPrediction>,
    reason: &str,
) -> StressDecision {
    StressDecision {
        current_level: rule.level,
        previous_level: rule.previous,
        change_tier: rule.change_tier,
        action: rule.action,
        speed: rule.speed,
        vibe: rule.vibe,
        suction: rule.suction,
        confidence: prediction.map(|p| p.confidence).unwrap_or(1.0),
        is_ml_prediction: prediction.is_some(),
        is_ml_override: false,
        autonomy_used: 0.0,
        reasoning: reason.to_string(),
    }
}
