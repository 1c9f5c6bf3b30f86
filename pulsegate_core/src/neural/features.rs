//! Sensor context → normalized feature vector
//!
//! Every input is scaled from a fixed physiological range into [0,1]
//! and clamped, so out-of-range raw sensor values never produce
//! out-of-range network inputs.

use ndarray::Array1;

use crate::neural::network::INPUT_SIZE;
use crate::sample::SensorContext;

/// Heart rate range in bpm.
const HR_MIN: f32 = 50.0;
const HR_MAX: f32 = 180.0;
/// Heart-rate trend window, bpm per trend estimate, symmetric around 0.
const HR_TREND_SPAN: f32 = 20.0;
/// Skin temperature range in Celsius.
const TEMP_MIN: f32 = 35.0;
const TEMP_MAX: f32 = 40.0;
/// Temperature delta window across the history, symmetric around 0.
const TEMP_DELTA_SPAN: f32 = 2.0;
/// GSR range in raw ADC units.
const GSR_MIN: f32 = 0.0;
const GSR_MAX: f32 = 1_500.0;
/// GSR trend window, symmetric around 0.
const GSR_TREND_SPAN: f32 = 200.0;
/// Edge counts above this saturate to 1.0.
const EDGE_COUNT_SCALE: f32 = 10.0;
/// Time-since-edge saturates at five minutes.
const EDGE_RECENCY_CAP_SEC: f32 = 300.0;
/// Session time saturates at one hour.
const SESSION_TIME_CAP_SEC: f32 = 3_600.0;

/// Linear scale from [lo, hi] into [0,1], clamped.
fn scale(value: f32, lo: f32, hi: f32) -> f32 {
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}

/// Symmetric scale from [-span, +span] into [0,1], clamped.
fn scale_symmetric(value: f32, span: f32) -> f32 {
    scale(value, -span, span)
}

/// Builds the 12-element input vector for one sensor context.
pub fn feature_vector(ctx: &SensorContext) -> Array1<f32> {
    let mut features = Array1::zeros(INPUT_SIZE);
    features[0] = scale(ctx.heart_rate, HR_MIN, HR_MAX);
    features[1] = scale(ctx.hr_average, HR_MIN, HR_MAX);
    features[2] = scale_symmetric(ctx.hr_trend, HR_TREND_SPAN);
    features[3] = scale(ctx.temperature, TEMP_MIN, TEMP_MAX);
    features[4] = scale_symmetric(ctx.temp_delta, TEMP_DELTA_SPAN);
    features[5] = scale(ctx.gsr, GSR_MIN, GSR_MAX);
    features[6] = scale(ctx.gsr_average, GSR_MIN, GSR_MAX);
    features[7] = scale_symmetric(ctx.gsr_trend, GSR_TREND_SPAN);
    features[8] = (ctx.edge_count as f32 / EDGE_COUNT_SCALE).clamp(0.0, 1.0);
    features[9] = (ctx.time_since_edge_sec / EDGE_RECENCY_CAP_SEC).clamp(0.0, 1.0);
    features[10] = ctx.current_level.index() as f32 / 7.0;
    features[11] = (ctx.session_time_sec / SESSION_TIME_CAP_SEC).clamp(0.0, 1.0);
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsegate_shared::StressLevel;

    fn resting_context() -> SensorContext {
        SensorContext {
            heart_rate: 65.0,
            hr_average: 64.0,
            hr_trend: 0.0,
            temperature: 36.5,
            temp_delta: 0.0,
            gsr: 300.0,
            gsr_average: 310.0,
            gsr_trend: 0.0,
            edge_count: 0,
            time_since_edge_sec: f32::MAX,
            current_level: StressLevel::Baseline,
            session_time_sec: 120.0,
        }
    }

    #[test]
    fn all_features_stay_in_unit_range() {
        let mut ctx = resting_context();
        ctx.heart_rate = 400.0;
        ctx.hr_trend = -999.0;
        ctx.temperature = -10.0;
        ctx.gsr = 1.0e9;
        ctx.edge_count = 1_000;
        ctx.session_time_sec = 1.0e7;

        let features = feature_vector(&ctx);
        assert_eq!(features.len(), INPUT_SIZE);
        assert!(features.iter().all(|&f| (0.0..=1.0).contains(&f)));
    }

    #[test]
    fn known_values_scale_linearly() {
        let mut ctx = resting_context();
        ctx.heart_rate = 115.0; // midpoint of [50, 180]
        ctx.temperature = 37.5; // halfway through [35, 40]
        ctx.gsr = 750.0;
        ctx.current_level = StressLevel::Peak;

        let features = feature_vector(&ctx);
        assert!((features[0] - 0.5).abs() < 1e-6);
        assert!((features[3] - 0.5).abs() < 1e-6);
        assert!((features[5] - 0.5).abs() < 1e-6);
        assert!((features[10] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_trend_maps_to_center() {
        let features = feature_vector(&resting_context());
        assert!((features[2] - 0.5).abs() < 1e-6);
        assert!((features[4] - 0.5).abs() < 1e-6);
        assert!((features[7] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn no_edge_yet_saturates_recency() {
        let features = feature_vector(&resting_context());
        assert_eq!(features[9], 1.0);
    }
}
