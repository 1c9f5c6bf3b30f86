//! Simulated Session Demo
//!
//! Drives the decision engine with a synthetic biometric arc (warm-up,
//! build, spike, recovery) and prints every decision the tick loop
//! produces, including the reactive-zone emergency response.
//!
//! Run with:
//! ```
//! cargo run --example session_demo
//! ```

use pulsegate_core::{DecisionEngine, EngineConfig, StorageConfig};
use pulsegate_shared::{BiometricSample, RecommendedAction, StressLevel};

fn main() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Simulated Session Demo - rule-driven decision loop          ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let mut config = EngineConfig::default();
    config.storage = StorageConfig {
        data_dir: std::env::temp_dir().join("pulsegate_session_demo"),
        ..StorageConfig::default()
    };
    // Short timers so the whole arc fits in a few simulated minutes.
    config.levels.timer_minutes = [0.5, 0.5, 0.5, 0.5];
    config.levels.reactive_seconds = [30.0, 20.0, 15.0];

    let mut engine = DecisionEngine::new(config);
    engine.start_session(0);
    engine.set_autonomy_level(30.0);

    println!("Session started, autonomy at 30%\n");

    let mut last_level = StressLevel::Baseline;
    for tick in 1..=360u32 {
        let ts = tick * 1_000;
        let decision = engine.tick(synthetic_sample(tick, ts));

        if decision.current_level != last_level
            || decision.action == RecommendedAction::EmergencyEase
        {
            println!(
                "[{:>4}s] level {:?} -> {:?}  action {:?}  speed {}  vibe {}  suction {}  ({})",
                tick,
                last_level,
                decision.current_level,
                decision.action,
                decision.speed,
                decision.vibe,
                decision.suction,
                decision.reasoning,
            );
            last_level = decision.current_level;
        }
    }

    println!("\nFinal score: {:.2}", engine.last_score());
    engine.end_session(360_000, "demo complete");
    println!("Session summary flushed to the demo data directory.");
}

/// Three-phase arc: calm opening, a steady build toward the reactive
/// zone, a sharp spike at the four-minute mark, then recovery.
fn synthetic_sample(tick: u32, ts: u32) -> BiometricSample {
    let t = tick as f32;
    let (hr, temp, gsr) = if tick < 120 {
        (62.0 + t * 0.05, 36.4, 180.0 + t * 0.5)
    } else if tick < 240 {
        let b = t - 120.0;
        (68.0 + b * 0.4, 36.5 + b * 0.008, 240.0 + b * 3.0)
    } else if tick < 250 {
        // Ten-second spike.
        (175.0, 38.8, 1_300.0)
    } else {
        let r = (t - 250.0).min(60.0);
        (120.0 - r * 0.8, 37.2, 700.0 - r * 6.0)
    };
    BiometricSample::new(hr, temp, gsr, ts)
}
