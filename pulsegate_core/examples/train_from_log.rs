//! Train From Log Demo
//!
//! Seeds a synthetic feedback corpus (as if a human had corrected the
//! engine across several sessions), trains the predictor on it, and
//! shows the trained model influencing a live tick.
//!
//! Run with:
//! ```
//! cargo run --example train_from_log --release
//! ```

use pulsegate_core::{CancelToken, DecisionEngine, EngineConfig, StorageConfig};
use pulsegate_shared::{BiometricSample, StressLevel};

fn main() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Train From Log Demo - on-device SGD over feedback samples   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let mut config = EngineConfig::default();
    config.storage = StorageConfig {
        data_dir: std::env::temp_dir().join("pulsegate_train_demo"),
        ..StorageConfig::default()
    };
    // Fresh corpus each run.
    std::fs::remove_dir_all(&config.storage.data_dir).ok();

    let mut engine = DecisionEngine::new(config);
    engine.start_session(0);

    println!("Collecting synthetic feedback...");
    let mut ts = 0u32;
    for round in 0..48u32 {
        let level = StressLevel::from_index((round % 8) as usize).unwrap();
        let hr = 58.0 + level.index() as f32 * 16.0;
        let temp = 36.3 + level.index() as f32 * 0.35;
        let gsr = 140.0 + level.index() as f32 * 170.0;

        ts += 2_000;
        engine.tick(BiometricSample::new(hr, temp, gsr, ts));
        engine
            .user_override(level, ts + 500)
            .expect("feedback append failed");
    }
    println!("  {} samples logged\n", engine.feedback_session_count());

    println!("Training for 60 epochs...");
    let report = engine
        .train(60, &CancelToken::new())
        .expect("training failed");
    println!("  epochs run:  {}", report.epochs_run);
    println!("  samples:     {}", report.samples);
    println!("  final loss:  {:.4}", report.final_loss);
    println!("  accuracy:    {:.1}%", report.accuracy * 100.0);
    println!("  persisted:   {}\n", report.persisted);

    println!(
        "Model version {} ready.",
        engine.network().metadata.version
    );

    // One live tick with the model in the loop.
    engine.set_autonomy_level(60.0);
    ts += 2_000;
    let decision = engine.tick(BiometricSample::new(130.0, 37.9, 950.0, ts));
    println!(
        "\nLive tick at 60% autonomy: level {:?}, speed {}, ml {} (conf {:.2})",
        decision.current_level, decision.speed, decision.is_ml_prediction, decision.confidence
    );
    println!("  reasoning: {}", decision.reasoning);

    engine.end_session(ts, "demo complete");
}
