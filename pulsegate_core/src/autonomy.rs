//! Autonomy permission table and per-session runtime state.
//!
//! The compiled-in table is the single source of truth for what the
//! machine-learned predictor may ever do. Lookups are total and pure:
//! any percentage in [0,100] (and anything outside, after clamping)
//! resolves to one of eleven profiles at 10% granularity, rounded to the
//! nearest step. The gate itself is stateless; the temporary-dip timer
//! lives in [`AutonomyRuntimeState`] and is driven by the arbiter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::Serialize;

use pulsegate_shared::StressLevel;

/// One row of the permission table. Immutable, compiled in.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AutonomyProfile {
    pub autonomy_percent: u8,
    /// Automation never drives the level below this.
    pub min_level: StressLevel,
    /// Hard ceiling the predictor may hold indefinitely.
    pub max_level_permanent: StressLevel,
    /// Time-boxed excursion ceiling; `None` means no dips at this tier.
    pub max_level_temporary: Option<StressLevel>,
    /// How long a temporary dip may last.
    pub temporary_dip_ms: u32,
    pub vibe_allowed: bool,
    pub suction_allowed: bool,
    pub edge_zone_allowed: bool,
    /// Per-session edge cap; `None` means unbounded.
    pub max_edges_per_session: Option<u32>,
    pub orgasm_trigger_allowed: bool,
    pub description: &'static str,
}

/// The full table, one entry per 10% step.
pub const AUTONOMY_PROFILES: [AutonomyProfile; 11] = [
    AutonomyProfile {
        autonomy_percent: 0,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Building,
        max_level_temporary: None,
        temporary_dip_ms: 0,
        vibe_allowed: false,
        suction_allowed: false,
        edge_zone_allowed: false,
        max_edges_per_session: Some(0),
        orgasm_trigger_allowed: false,
        description: "manual control only",
    },
    AutonomyProfile {
        autonomy_percent: 10,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Active,
        max_level_temporary: None,
        temporary_dip_ms: 0,
        vibe_allowed: false,
        suction_allowed: false,
        edge_zone_allowed: false,
        max_edges_per_session: Some(0),
        orgasm_trigger_allowed: false,
        description: "gentle assistance, warm-up levels only",
    },
    AutonomyProfile {
        autonomy_percent: 20,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Active,
        max_level_temporary: Some(StressLevel::Elevated),
        temporary_dip_ms: 30_000,
        vibe_allowed: true,
        suction_allowed: false,
        edge_zone_allowed: false,
        max_edges_per_session: Some(0),
        orgasm_trigger_allowed: false,
        description: "short excursions into level 4, vibe permitted",
    },
    AutonomyProfile {
        autonomy_percent: 30,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Elevated,
        max_level_temporary: Some(StressLevel::High),
        temporary_dip_ms: 30_000,
        vibe_allowed: true,
        suction_allowed: false,
        edge_zone_allowed: false,
        max_edges_per_session: Some(0),
        orgasm_trigger_allowed: false,
        description: "reactive zone entry with dips to level 5",
    },
    AutonomyProfile {
        autonomy_percent: 40,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Elevated,
        max_level_temporary: Some(StressLevel::High),
        temporary_dip_ms: 45_000,
        vibe_allowed: true,
        suction_allowed: true,
        edge_zone_allowed: false,
        max_edges_per_session: Some(0),
        orgasm_trigger_allowed: false,
        description: "longer dips, suction unlocked",
    },
    AutonomyProfile {
        autonomy_percent: 50,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::High,
        max_level_temporary: Some(StressLevel::Intense),
        temporary_dip_ms: 45_000,
        vibe_allowed: true,
        suction_allowed: true,
        edge_zone_allowed: true,
        max_edges_per_session: Some(1),
        orgasm_trigger_allowed: false,
        description: "edge zone unlocked, single edge per session",
    },
    AutonomyProfile {
        autonomy_percent: 60,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Intense,
        max_level_temporary: Some(StressLevel::Peak),
        temporary_dip_ms: 60_000,
        vibe_allowed: true,
        suction_allowed: true,
        edge_zone_allowed: true,
        max_edges_per_session: Some(2),
        orgasm_trigger_allowed: false,
        description: "dips to peak, two edges per session",
    },
    AutonomyProfile {
        autonomy_percent: 70,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Peak,
        max_level_temporary: None,
        temporary_dip_ms: 0,
        vibe_allowed: true,
        suction_allowed: true,
        edge_zone_allowed: true,
        max_edges_per_session: Some(3),
        orgasm_trigger_allowed: false,
        description: "full level range, trigger still manual",
    },
    AutonomyProfile {
        autonomy_percent: 80,
        min_level: StressLevel::Baseline,
        max_level_permanent: StressLevel::Peak,
        max_level_temporary: None,
        temporary_dip_ms: 0,
        vibe_allowed: true,
        suction_allowed: true,
        edge_zone_allowed: true,
        max_edges_per_session: Some(5),
        orgasm_trigger_allowed: false,
        description: "full level range, generous edge allowance",
    },
    AutonomyProfile {
        autonomy_percent: 90,
        min_level: StressLevel::Settling,
        max_level_permanent: StressLevel::Peak,
        max_level_temporary: None,
        temporary_dip_ms: 0,
        vibe_allowed: true,
        suction_allowed: true,
        edge_zone_allowed: true,
        max_edges_per_session: None,
        orgasm_trigger_allowed: true,
        description: "near-total delegation, trigger permitted",
    },
    AutonomyProfile {
        autonomy_percent: 100,
        min_level: StressLevel::Settling,
        max_level_permanent: StressLevel::Peak,
        max_level_temporary: None,
        temporary_dip_ms: 0,
        vibe_allowed: true,
        suction_allowed: true,
        edge_zone_allowed: true,
        max_edges_per_session: None,
        orgasm_trigger_allowed: true,
        description: "total delegation",
    },
];

/// Resolves an autonomy percentage to its profile. Total and pure;
/// out-of-range inputs are clamped, never rejected.
pub fn lookup(autonomy_percent: f32) -> &'static AutonomyProfile {
    let clamped = if autonomy_percent.is_finite() {
        autonomy_percent.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let index = ((clamped / 10.0).round() as usize).min(AUTONOMY_PROFILES.len() - 1);
    &AUTONOMY_PROFILES[index]
}

/// Whether automation may take the session to `target`.
///
/// Permanent ceiling always applies; a target above it is only legal
/// while the caller-tracked temporary dip is active and the profile
/// defines a dip ceiling covering it.
pub fn may_reach_level(
    profile: &AutonomyProfile,
    target: StressLevel,
    in_temporary_dip: bool,
) -> bool {
    if target <= profile.max_level_permanent {
        return true;
    }
    match profile.max_level_temporary {
        Some(ceiling) => in_temporary_dip && target <= ceiling,
        None => false,
    }
}

pub fn may_use_vibe(profile: &AutonomyProfile) -> bool {
    profile.vibe_allowed
}

pub fn may_use_suction(profile: &AutonomyProfile) -> bool {
    profile.suction_allowed
}

pub fn may_enter_edge_zone(profile: &AutonomyProfile) -> bool {
    profile.edge_zone_allowed
}

pub fn may_trigger_orgasm(profile: &AutonomyProfile) -> bool {
    profile.orgasm_trigger_allowed
}

pub fn max_edges(profile: &AutonomyProfile) -> Option<u32> {
    profile.max_edges_per_session
}

/// Operator-set autonomy percentage, shared between the tick loop and a
/// settings surface on another execution context. A single scalar swap;
/// no torn reads, no lock held across a tick.
#[derive(Debug, Clone)]
pub struct AutonomyControl(Arc<AtomicU32>);

impl AutonomyControl {
    pub fn new(percent: f32) -> Self {
        let control = Self(Arc::new(AtomicU32::new(0)));
        control.set(percent);
        control
    }

    /// Clamps to [0,100] and publishes atomically.
    pub fn set(&self, percent: f32) {
        let clamped = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.0.store(clamped.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for AutonomyControl {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Mutable per-session state the engine updates across ticks.
#[derive(Debug, Clone, Serialize)]
pub struct AutonomyRuntimeState {
    pub current_level: StressLevel,
    pub in_temporary_dip: bool,
    /// Set when a dip expires; blocks a new dip until the level has
    /// first returned to the permanent ceiling.
    pub dip_spent: bool,
    pub dip_started_ms: u32,
    pub edge_count: u32,
    pub last_edge_ms: Option<u32>,
    pub session_active: bool,
    pub paused: bool,
    pub orgasm_triggered: bool,
}

impl AutonomyRuntimeState {
    pub fn new() -> Self {
        Self {
            current_level: StressLevel::Baseline,
            in_temporary_dip: false,
            dip_spent: false,
            dip_started_ms: 0,
            edge_count: 0,
            last_edge_ms: None,
            session_active: false,
            paused: false,
            orgasm_triggered: false,
        }
    }

    /// Resets everything session-scoped; called at session boundaries.
    pub fn reset(&mut self) {
        *self = Self {
            paused: self.paused,
            ..Self::new()
        };
    }

    /// A spent dip cannot be restarted; the caller must `clear_dip`
    /// (level back at or below the permanent ceiling) first.
    pub fn begin_dip(&mut self, now_ms: u32) {
        if self.dip_spent {
            return;
        }
        self.in_temporary_dip = true;
        self.dip_started_ms = now_ms;
    }

    /// Re-arms the dip allowance. Only legal once the level has
    /// returned to the permanent ceiling.
    pub fn clear_dip(&mut self) {
        self.in_temporary_dip = false;
        self.dip_spent = false;
    }

    /// Expires the dip when its profile-defined window has passed and
    /// reports whether it is still active. An expired dip is spent
    /// until the next `clear_dip`.
    pub fn dip_active(&mut self, now_ms: u32, profile: &AutonomyProfile) -> bool {
        if !self.in_temporary_dip {
            return false;
        }
        if profile.max_level_temporary.is_none()
            || now_ms.saturating_sub(self.dip_started_ms) > profile.temporary_dip_ms
        {
            self.in_temporary_dip = false;
            self.dip_spent = true;
            return false;
        }
        true
    }

    pub fn record_edge(&mut self, now_ms: u32) {
        self.edge_count += 1;
        self.last_edge_ms = Some(now_ms);
    }

    pub fn time_since_edge_sec(&self, now_ms: u32) -> f32 {
        match self.last_edge_ms {
            Some(edge_ms) => now_ms.saturating_sub(edge_ms) as f32 / 1_000.0,
            None => f32::MAX,
        }
    }
}

impl Default for AutonomyRuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_invariants_hold_for_every_entry() {
        let mut previous_ceiling = StressLevel::Baseline;
        for (idx, profile) in AUTONOMY_PROFILES.iter().enumerate() {
            assert_eq!(profile.autonomy_percent as usize, idx * 10);
            assert!(profile.max_level_permanent >= profile.min_level);
            // Permanent ceiling is monotonically non-decreasing.
            assert!(profile.max_level_permanent >= previous_ceiling);
            previous_ceiling = profile.max_level_permanent;

            if let Some(temp) = profile.max_level_temporary {
                assert!(temp > profile.max_level_permanent);
                assert!(profile.temporary_dip_ms > 0);
            }
        }
    }

    #[test]
    fn zero_percent_never_reaches_peak_and_full_does() {
        assert!(lookup(0.0).max_level_permanent < StressLevel::Peak);
        assert!(!may_reach_level(lookup(0.0), StressLevel::Peak, true));
        assert_eq!(lookup(100.0).max_level_permanent, StressLevel::Peak);
        assert!(may_reach_level(lookup(100.0), StressLevel::Peak, false));
    }

    #[test]
    fn lookup_rounds_to_nearest_step() {
        assert_eq!(
            lookup(45.0).autonomy_percent,
            lookup(50.0).autonomy_percent
        );
        assert_eq!(lookup(4.0).autonomy_percent, lookup(0.0).autonomy_percent);
        assert_eq!(lookup(44.9).autonomy_percent, 40);
    }

    #[test]
    fn lookup_is_total_over_and_beyond_the_range() {
        for pct in -50..=150 {
            let profile = lookup(pct as f32);
            assert!(profile.autonomy_percent <= 100);
        }
        assert_eq!(lookup(f32::NAN).autonomy_percent, 0);
        assert_eq!(lookup(-10.0).autonomy_percent, 0);
        assert_eq!(lookup(500.0).autonomy_percent, 100);
    }

    #[test]
    fn monotone_ceiling_across_percent_sweep() {
        let mut previous = StressLevel::Baseline;
        for pct in 0..=100 {
            let ceiling = lookup(pct as f32).max_level_permanent;
            assert!(ceiling >= previous, "ceiling regressed at {pct}%");
            previous = ceiling;
        }
    }

    #[test]
    fn seventy_percent_profile_matches_contract() {
        let profile = lookup(70.0);
        assert_eq!(profile.max_level_permanent, StressLevel::Peak);
        assert_eq!(profile.max_edges_per_session, Some(3));
        assert!(!profile.orgasm_trigger_allowed);
    }

    #[test]
    fn temporary_dip_extends_reach_within_window() {
        let profile = lookup(20.0);
        assert!(!may_reach_level(profile, StressLevel::Elevated, false));
        assert!(may_reach_level(profile, StressLevel::Elevated, true));
        // Above even the dip ceiling stays forbidden.
        assert!(!may_reach_level(profile, StressLevel::High, true));
    }

    #[test]
    fn dip_expires_after_its_window() {
        let profile = lookup(20.0);
        let mut state = AutonomyRuntimeState::new();
        state.begin_dip(1_000);
        assert!(state.dip_active(10_000, profile));
        assert!(!state.dip_active(1_000 + profile.temporary_dip_ms + 1, profile));
        assert!(!state.in_temporary_dip);
    }

    #[test]
    fn spent_dip_cannot_restart_until_cleared() {
        let profile = lookup(20.0);
        let mut state = AutonomyRuntimeState::new();

        state.begin_dip(0);
        assert!(!state.dip_active(profile.temporary_dip_ms + 1, profile));
        assert!(state.dip_spent);

        // A second begin while spent is a no-op.
        state.begin_dip(40_000);
        assert!(!state.in_temporary_dip);
        assert!(!state.dip_active(40_000, profile));

        // Returning to the permanent ceiling re-arms the allowance.
        state.clear_dip();
        state.begin_dip(80_000);
        assert!(state.dip_active(80_000, profile));
    }

    #[test]
    fn control_clamps_and_round_trips() {
        let control = AutonomyControl::new(55.0);
        assert_eq!(control.get(), 55.0);
        control.set(130.0);
        assert_eq!(control.get(), 100.0);
        control.set(-5.0);
        assert_eq!(control.get(), 0.0);

        let other = control.clone();
        other.set(70.0);
        assert_eq!(control.get(), 70.0);
    }

    #[test]
    fn runtime_reset_preserves_pause_flag() {
        let mut state = AutonomyRuntimeState::new();
        state.paused = true;
        state.record_edge(5_000);
        state.session_active = true;
        state.reset();
        assert!(state.paused);
        assert_eq!(state.edge_count, 0);
        assert!(!state.session_active);
        assert_eq!(state.time_since_edge_sec(10_000), f32::MAX);
    }
}
